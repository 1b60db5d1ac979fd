//! High-level mesh construction

use serde_json::{Map, Value, json};

use crate::buffer::{AccessorIndex, BufferBuilder};

/// Accessor indices for a mesh
#[derive(Debug, Clone)]
pub struct MeshAccessors {
    pub positions: AccessorIndex,
    pub normals: Option<AccessorIndex>,
    pub tangents: Option<AccessorIndex>,
    pub uvs: Option<AccessorIndex>,
    pub colors: Option<AccessorIndex>,
    pub joints: Option<AccessorIndex>,
    pub weights: Option<AccessorIndex>,
    pub indices: Option<AccessorIndex>,
    /// POSITION deltas, one accessor per morph target
    pub targets: Vec<AccessorIndex>,
    pub default_weights: Option<Vec<f32>>,
}

impl MeshAccessors {
    /// JSON primitive referencing these accessors
    pub fn primitive_json(&self) -> Value {
        let mut attributes = Map::new();
        attributes.insert("POSITION".into(), self.positions.as_json());
        let optional = [
            ("NORMAL", self.normals),
            ("TANGENT", self.tangents),
            ("TEXCOORD_0", self.uvs),
            ("COLOR_0", self.colors),
            ("JOINTS_0", self.joints),
            ("WEIGHTS_0", self.weights),
        ];
        for (name, accessor) in optional {
            if let Some(accessor) = accessor {
                attributes.insert(name.into(), accessor.as_json());
            }
        }

        let mut primitive = json!({"attributes": attributes, "mode": 4});
        if let Some(indices) = self.indices {
            primitive["indices"] = indices.as_json();
        }
        if !self.targets.is_empty() {
            primitive["targets"] = self
                .targets
                .iter()
                .map(|t| json!({"POSITION": t.0}))
                .collect();
        }
        primitive
    }
}

/// One-primitive mesh: vertex streams, optional indices and morph targets
#[derive(Debug, Clone, Default)]
pub struct MeshBuilder {
    positions: Vec<[f32; 3]>,
    normals: Option<Vec<[f32; 3]>>,
    tangents: Option<Vec<[f32; 4]>>,
    uvs: Option<Vec<[f32; 2]>>,
    colors: Option<Vec<[f32; 4]>>,
    joints: Option<Vec<[u8; 4]>>,
    weights: Option<Vec<[f32; 4]>>,
    indices: Option<Vec<u16>>,
    targets: Vec<Vec<[f32; 3]>>,
    default_weights: Option<Vec<f32>>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// POSITION, packed with min/max bounds
    pub fn positions(mut self, positions: &[[f32; 3]]) -> Self {
        self.positions = positions.to_vec();
        self
    }

    pub fn normals(mut self, normals: &[[f32; 3]]) -> Self {
        self.normals = Some(normals.to_vec());
        self
    }

    /// TANGENT; w carries handedness
    pub fn tangents(mut self, tangents: &[[f32; 4]]) -> Self {
        self.tangents = Some(tangents.to_vec());
        self
    }

    /// TEXCOORD_0
    pub fn uvs(mut self, uvs: &[[f32; 2]]) -> Self {
        self.uvs = Some(uvs.to_vec());
        self
    }

    /// COLOR_0 as RGBA floats
    pub fn colors(mut self, colors: &[[f32; 4]]) -> Self {
        self.colors = Some(colors.to_vec());
        self
    }

    /// JOINTS_0 as unsigned bytes
    pub fn joints(mut self, joints: &[[u8; 4]]) -> Self {
        self.joints = Some(joints.to_vec());
        self
    }

    pub fn weights(mut self, weights: &[[f32; 4]]) -> Self {
        self.weights = Some(weights.to_vec());
        self
    }

    /// 16-bit triangle indices
    pub fn indices(mut self, indices: &[u16]) -> Self {
        self.indices = Some(indices.to_vec());
        self
    }

    /// Add a morph target with per-vertex position deltas
    pub fn morph_target(mut self, deltas: &[[f32; 3]]) -> Self {
        self.targets.push(deltas.to_vec());
        self
    }

    /// Default morph weights stored on the mesh
    pub fn default_weights(mut self, weights: &[f32]) -> Self {
        self.default_weights = Some(weights.to_vec());
        self
    }

    /// Pack every stream into `buffer`
    pub fn build(self, buffer: &mut BufferBuilder) -> MeshAccessors {
        let positions = buffer.pack_positions(&self.positions);
        let normals = self.normals.as_ref().map(|n| buffer.pack_vec3(n));
        let tangents = self.tangents.as_ref().map(|t| buffer.pack_vec4(t));
        let uvs = self.uvs.as_ref().map(|uv| buffer.pack_vec2(uv));
        let colors = self.colors.as_ref().map(|c| buffer.pack_vec4(c));
        let joints = self.joints.as_ref().map(|j| buffer.pack_joints(j));
        let weights = self.weights.as_ref().map(|w| buffer.pack_vec4(w));
        let indices = self.indices.as_ref().map(|i| buffer.pack_indices_u16(i));
        let targets = self.targets.iter().map(|t| buffer.pack_vec3(t)).collect();

        MeshAccessors {
            positions,
            normals,
            tangents,
            uvs,
            colors,
            joints,
            weights,
            indices,
            targets,
            default_weights: self.default_weights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_builder_basic() {
        let mut buffer = BufferBuilder::new();
        let mesh = MeshBuilder::new()
            .positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]])
            .normals(&[[0.0, 0.0, 1.0]; 3])
            .indices(&[0, 1, 2])
            .build(&mut buffer);

        assert_eq!(mesh.positions, AccessorIndex(0));
        assert_eq!(mesh.normals, Some(AccessorIndex(1)));
        assert_eq!(mesh.indices, Some(AccessorIndex(2)));
        assert!(mesh.uvs.is_none());
        let primitive = mesh.primitive_json();
        assert_eq!(primitive["attributes"]["NORMAL"], json!(1));
        assert!(primitive.get("targets").is_none());
    }

    #[test]
    fn test_mesh_builder_morph_targets() {
        let mut buffer = BufferBuilder::new();
        let mesh = MeshBuilder::new()
            .positions(&[[0.0, 0.0, 0.0]])
            .morph_target(&[[1.0, 0.0, 0.0]])
            .morph_target(&[[0.0, 1.0, 0.0]])
            .default_weights(&[0.0, 0.5])
            .build(&mut buffer);

        assert_eq!(mesh.targets, vec![AccessorIndex(1), AccessorIndex(2)]);
        assert_eq!(mesh.primitive_json()["targets"][1]["POSITION"], json!(2));
    }
}
