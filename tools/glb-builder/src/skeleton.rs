//! Skin construction utilities

use crate::buffer::{AccessorIndex, BufferBuilder};

pub const IDENTITY_MAT4: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
];

/// Joint list and accessor indices for one skin
#[derive(Debug, Clone)]
pub struct SkeletonAccessors {
    pub joints: Vec<u32>,
    pub skeleton_root: Option<u32>,
    pub inverse_bind_matrices: Option<AccessorIndex>,
}

/// Builder for skin data
pub struct SkeletonBuilder {
    joints: Vec<u32>,
    inverse_bind_matrices: Vec<[f32; 16]>,
    skeleton_root: Option<u32>,
    omit_matrices: bool,
}

impl SkeletonBuilder {
    pub fn new() -> Self {
        Self {
            joints: Vec::new(),
            inverse_bind_matrices: Vec::new(),
            skeleton_root: None,
            omit_matrices: false,
        }
    }

    /// Add a joint node with its inverse bind matrix (column-major)
    pub fn joint(mut self, node: u32, inverse_bind_matrix: [f32; 16]) -> Self {
        self.joints.push(node);
        self.inverse_bind_matrices.push(inverse_bind_matrix);
        self
    }

    /// Set the `skeleton` root node
    pub fn skeleton_root(mut self, node: u32) -> Self {
        self.skeleton_root = Some(node);
        self
    }

    /// Leave out `inverseBindMatrices` (loaders use identity)
    pub fn without_inverse_bind_matrices(mut self) -> Self {
        self.omit_matrices = true;
        self
    }

    /// Get joint count
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Build and pack into buffer
    pub fn build(self, buffer: &mut BufferBuilder) -> SkeletonAccessors {
        let inverse_bind_matrices =
            (!self.omit_matrices).then(|| buffer.pack_mat4(&self.inverse_bind_matrices));
        SkeletonAccessors {
            joints: self.joints,
            skeleton_root: self.skeleton_root,
            inverse_bind_matrices,
        }
    }
}

impl Default for SkeletonBuilder {
    fn default() -> Self {
        Self::new()
    }
}
