//! Low-level buffer packing with automatic alignment and accessor creation

use serde_json::{Map, Value, json};

use crate::utils::{align_buffer, compute_bounds};

pub const BYTE: u32 = 5120;
pub const UNSIGNED_BYTE: u32 = 5121;
pub const SHORT: u32 = 5122;
pub const UNSIGNED_SHORT: u32 = 5123;
pub const UNSIGNED_INT: u32 = 5125;
pub const FLOAT: u32 = 5126;

const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// Accessor index returned by buffer operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessorIndex(pub u32);

impl AccessorIndex {
    pub fn as_json(&self) -> Value {
        json!(self.0)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Element description for raw packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawLayout<'a> {
    pub component_type: u32,
    /// "SCALAR", "VEC3", "MAT4", ...
    pub type_: &'a str,
    pub normalized: bool,
    pub count: usize,
}

/// Sparse override to attach to an accessor.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseData<'a> {
    pub indices: &'a [u32],
    /// Component type of the index array (UNSIGNED_BYTE/SHORT/INT)
    pub index_component_type: u32,
    /// Encoded replacement values, one element per index
    pub values: &'a [u8],
}

/// Builder for binary buffer with automatic alignment
pub struct BufferBuilder {
    buffer: Vec<u8>,
    views: Vec<Value>,
    accessors: Vec<Value>,
}

impl BufferBuilder {
    /// Create a new empty buffer builder
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            views: Vec::new(),
            accessors: Vec::new(),
        }
    }

    /// Get the current accessor count
    pub fn accessor_count(&self) -> u32 {
        self.accessors.len() as u32
    }

    /// Get next accessor index (without creating it)
    pub fn next_accessor_index(&self) -> AccessorIndex {
        AccessorIndex(self.accessor_count())
    }

    /// Get the binary buffer data
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer views
    pub fn views(&self) -> &[Value] {
        &self.views
    }

    /// Get the accessors
    pub fn accessors(&self) -> &[Value] {
        &self.accessors
    }

    /// Mutable access to an accessor, for tests that corrupt metadata
    pub fn accessor_mut(&mut self, index: AccessorIndex) -> &mut Value {
        &mut self.accessors[index.index()]
    }

    /// Append raw bytes as a new buffer view; returns the view index
    pub fn pack_view(&mut self, bytes: &[u8], byte_stride: Option<usize>, target: Option<u32>) -> u32 {
        let offset = self.buffer.len();
        self.buffer.extend_from_slice(bytes);
        align_buffer(&mut self.buffer);

        let mut view = Map::new();
        view.insert("buffer".into(), json!(0));
        view.insert("byteOffset".into(), json!(offset));
        view.insert("byteLength".into(), json!(bytes.len()));
        if let Some(stride) = byte_stride {
            view.insert("byteStride".into(), json!(stride));
        }
        if let Some(target) = target {
            view.insert("target".into(), json!(target));
        }
        self.views.push(Value::Object(view));
        self.views.len() as u32 - 1
    }

    /// Push an accessor object as-is
    pub fn push_accessor(&mut self, accessor: Value) -> AccessorIndex {
        self.accessors.push(accessor);
        AccessorIndex(self.accessors.len() as u32 - 1)
    }

    /// Pack already-encoded elements with any component/structural type
    pub fn pack_raw(&mut self, layout: RawLayout<'_>, bytes: &[u8], byte_stride: Option<usize>) -> AccessorIndex {
        let view = self.pack_view(bytes, byte_stride, None);
        self.push_accessor(json!({
            "bufferView": view,
            "byteOffset": 0,
            "componentType": layout.component_type,
            "normalized": layout.normalized,
            "count": layout.count,
            "type": layout.type_,
        }))
    }

    /// Accessor with sparse overrides, over a dense base (`base = None` means zeros)
    pub fn pack_sparse(&mut self, layout: RawLayout<'_>, base: Option<&[u8]>, sparse: SparseData<'_>) -> AccessorIndex {
        let mut index_bytes = Vec::new();
        for &i in sparse.indices {
            match sparse.index_component_type {
                UNSIGNED_BYTE => index_bytes.push(i as u8),
                UNSIGNED_SHORT => index_bytes.extend_from_slice(&(i as u16).to_le_bytes()),
                _ => index_bytes.extend_from_slice(&i.to_le_bytes()),
            }
        }
        let indices_view = self.pack_view(&index_bytes, None, None);
        let values_view = self.pack_view(sparse.values, None, None);

        let mut accessor = json!({
            "byteOffset": 0,
            "componentType": layout.component_type,
            "normalized": layout.normalized,
            "count": layout.count,
            "type": layout.type_,
            "sparse": {
                "count": sparse.indices.len(),
                "indices": {"bufferView": indices_view, "componentType": sparse.index_component_type},
                "values": {"bufferView": values_view}
            }
        });
        if let Some(base) = base {
            let view = self.pack_view(base, None, None);
            accessor["bufferView"] = json!(view);
        }
        self.push_accessor(accessor)
    }

    fn pack_f32(&mut self, data: &[f32], type_: &str, count: usize, target: Option<u32>) -> AccessorIndex {
        let view = self.pack_view(bytemuck::cast_slice(data), None, target);
        self.push_accessor(json!({
            "bufferView": view,
            "byteOffset": 0,
            "componentType": FLOAT,
            "count": count,
            "type": type_,
        }))
    }

    /// Pack Vec3 positions with bounds calculation
    pub fn pack_positions(&mut self, positions: &[[f32; 3]]) -> AccessorIndex {
        let index = self.pack_f32(bytemuck::cast_slice(positions), "VEC3", positions.len(), Some(ARRAY_BUFFER));
        let (min, max) = compute_bounds(positions);
        let accessor = self.accessor_mut(index);
        accessor["min"] = json!(min);
        accessor["max"] = json!(max);
        index
    }

    /// Pack Vec3 data (normals, translations, scales, morph deltas)
    pub fn pack_vec3(&mut self, data: &[[f32; 3]]) -> AccessorIndex {
        self.pack_f32(bytemuck::cast_slice(data), "VEC3", data.len(), None)
    }

    /// Pack Vec2 data (UVs, etc.)
    pub fn pack_vec2(&mut self, data: &[[f32; 2]]) -> AccessorIndex {
        self.pack_f32(bytemuck::cast_slice(data), "VEC2", data.len(), None)
    }

    /// Pack Vec4 data (colors, rotations, weights, tangents)
    pub fn pack_vec4(&mut self, data: &[[f32; 4]]) -> AccessorIndex {
        self.pack_f32(bytemuck::cast_slice(data), "VEC4", data.len(), None)
    }

    /// Pack Mat4 data (inverse bind matrices, etc.), column-major
    pub fn pack_mat4(&mut self, matrices: &[[f32; 16]]) -> AccessorIndex {
        self.pack_f32(bytemuck::cast_slice(matrices), "MAT4", matrices.len(), None)
    }

    /// Pack scalar f32 data
    pub fn pack_scalars(&mut self, scalars: &[f32]) -> AccessorIndex {
        self.pack_f32(scalars, "SCALAR", scalars.len(), None)
    }

    /// Pack scalar f32 data with min/max (animation times, etc.)
    pub fn pack_scalars_with_bounds(&mut self, scalars: &[f32]) -> AccessorIndex {
        let index = self.pack_scalars(scalars);
        let min = scalars.iter().copied().fold(f32::MAX, f32::min);
        let max = scalars.iter().copied().fold(f32::MIN, f32::max);
        let accessor = self.accessor_mut(index);
        accessor["min"] = json!([min]);
        accessor["max"] = json!([max]);
        index
    }

    /// Pack joint indices (Vec4<u8>)
    pub fn pack_joints(&mut self, joints: &[[u8; 4]]) -> AccessorIndex {
        let view = self.pack_view(bytemuck::cast_slice(joints), None, Some(ARRAY_BUFFER));
        self.push_accessor(json!({
            "bufferView": view,
            "componentType": UNSIGNED_BYTE,
            "count": joints.len(),
            "type": "VEC4",
        }))
    }

    /// Pack u16 indices
    pub fn pack_indices_u16(&mut self, indices: &[u16]) -> AccessorIndex {
        let view = self.pack_view(bytemuck::cast_slice(indices), None, Some(ELEMENT_ARRAY_BUFFER));
        self.push_accessor(json!({
            "bufferView": view,
            "componentType": UNSIGNED_SHORT,
            "count": indices.len(),
            "type": "SCALAR",
        }))
    }

    /// Pack u32 indices
    pub fn pack_indices_u32(&mut self, indices: &[u32]) -> AccessorIndex {
        let view = self.pack_view(bytemuck::cast_slice(indices), None, Some(ELEMENT_ARRAY_BUFFER));
        self.push_accessor(json!({
            "bufferView": view,
            "componentType": UNSIGNED_INT,
            "count": indices.len(),
            "type": "SCALAR",
        }))
    }
}

impl Default for BufferBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_positions_bounds() {
        let mut buffer = BufferBuilder::new();
        let idx = buffer.pack_positions(&[[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]]);
        assert_eq!(idx, AccessorIndex(0));
        let accessor = &buffer.accessors()[0];
        assert_eq!(accessor["max"], json!([1.0, 2.0, 3.0]));
        assert_eq!(buffer.data().len(), 24);
    }

    #[test]
    fn test_views_are_aligned() {
        let mut buffer = BufferBuilder::new();
        buffer.pack_joints(&[[0, 1, 2, 3]]);
        buffer.pack_indices_u16(&[0, 1, 2]);
        buffer.pack_vec3(&[[1.0, 1.0, 1.0]]);
        assert_eq!(buffer.views()[1]["byteOffset"], json!(4));
        assert_eq!(buffer.views()[2]["byteOffset"], json!(12));
    }

    #[test]
    fn test_pack_sparse_without_base() {
        let mut buffer = BufferBuilder::new();
        let layout = RawLayout {
            component_type: FLOAT,
            type_: "SCALAR",
            normalized: false,
            count: 4,
        };
        let values = bytemuck::cast_slice::<f32, u8>(&[7.0]).to_vec();
        let idx = buffer.pack_sparse(
            layout,
            None,
            SparseData {
                indices: &[2],
                index_component_type: UNSIGNED_BYTE,
                values: &values,
            },
        );
        let accessor = &buffer.accessors()[idx.index()];
        assert!(accessor.get("bufferView").is_none());
        assert_eq!(accessor["sparse"]["count"], json!(1));
    }
}
