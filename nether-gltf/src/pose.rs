//! Per-frame animation state, kept apart from the immutable document.

use glam::Mat4;

use crate::document::{Document, Trs};
use crate::error::Result;
use crate::scene::SceneGraph;
use crate::skin;

/// State of one node in a pose.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePose {
    /// Local transform after animation
    pub local: Trs,
    pub world: Mat4,
    /// Morph weights (empty for nodes without a morphed mesh)
    pub weights: Vec<f32>,
    /// True when a channel drove this node
    pub animated: bool,
}

/// Node-indexed pose: local/world transforms, morph weights and joint matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    time: f32,
    nodes: Vec<NodePose>,
    /// Indexed by skin
    joint_matrices: Vec<Vec<Mat4>>,
}

impl Pose {
    /// The document at rest, no animation applied.
    pub fn rest(document: &Document) -> Result<Self> {
        let count = document.nodes().len();
        Self::assemble(document, 0.0, vec![None; count], vec![None; count])
    }

    /// Build a pose from animated overrides.
    ///
    /// `locals[i]` replaces node `i`'s rest transform and `weights[i]` its
    /// default morph weights; `None` keeps the document value.
    pub(crate) fn assemble(
        document: &Document,
        time: f32,
        locals: Vec<Option<Trs>>,
        weights: Vec<Option<Vec<f32>>>,
    ) -> Result<Self> {
        let graph = SceneGraph::with_overrides(document, &locals)?;
        let world = graph.into_world_transforms();

        let nodes = locals
            .into_iter()
            .zip(weights)
            .enumerate()
            .map(|(i, (local, weights))| NodePose {
                animated: local.is_some() || weights.is_some(),
                local: local.unwrap_or_else(|| document.nodes()[i].transform.decomposed()),
                world: world[i],
                weights: weights.unwrap_or_else(|| document.default_weights(i)),
            })
            .collect();

        let joint_matrices = (0..document.skins().len())
            .map(|s| skin::joint_matrices(document, s, &world))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            time,
            nodes,
            joint_matrices,
        })
    }

    /// Time the pose was sampled at, after clamping or wrapping.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn nodes(&self) -> &[NodePose] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&NodePose> {
        self.nodes.get(index)
    }

    pub fn world(&self, node: usize) -> Option<Mat4> {
        self.nodes.get(node).map(|n| n.world)
    }

    pub fn weights(&self, node: usize) -> Option<&[f32]> {
        self.nodes.get(node).map(|n| n.weights.as_slice())
    }

    /// Joint matrices of `skin`, ordered like its joint list.
    pub fn joint_matrices(&self, skin: usize) -> Option<&[Mat4]> {
        self.joint_matrices.get(skin).map(Vec::as_slice)
    }

    /// Joint matrices of `skin` as raw column-major f32 bytes, ready for upload.
    pub fn joint_matrix_bytes(&self, skin: usize) -> Option<&[u8]> {
        self.joint_matrices(skin).map(bytemuck::cast_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadOptions;
    use glam::Vec3;

    #[test]
    fn test_rest_pose() {
        let document = crate::load(
            br#"{
                "asset": {"version": "2.0"},
                "nodes": [
                    {"translation": [0, 1, 0], "children": [1]},
                    {"translation": [2, 0, 0]}
                ],
                "skins": [{"joints": [0, 1]}]
            }"#,
            &LoadOptions::default(),
        )
        .unwrap();
        let pose = Pose::rest(&document).unwrap();
        assert_eq!(pose.time(), 0.0);
        assert!(!pose.node(1).unwrap().animated);
        assert_eq!(
            pose.world(1).unwrap().transform_point3(Vec3::ZERO),
            Vec3::new(2.0, 1.0, 0.0)
        );
        // No mesh node uses the skin, so joints stay in world space
        let joints = pose.joint_matrices(0).unwrap();
        assert_eq!(joints[1], pose.world(1).unwrap());
        assert!(pose.joint_matrices(1).is_none());
        assert_eq!(pose.joint_matrix_bytes(0).unwrap().len(), 2 * 64);
    }
}
