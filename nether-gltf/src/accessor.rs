//! Accessor resolution: typed numeric tuples out of raw buffer bytes.
//!
//! Elements are decoded into `f64` components, which hold every glTF
//! component type exactly (including `u32` and `f32`), so decoding is
//! bit-exact and encoding with the same metadata restores the source bytes.
//! The one exception is a signaling `f32` NaN, which may come back quieted.
//! Typed readers on [`AccessorReader`] narrow to `f32`/glam types.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::document::{Accessor, Document};
use crate::error::{GltfError, Result};

/// One decoded accessor element (up to 16 components for MAT4).
pub type Element = SmallVec<[f64; 16]>;

/// Sparse overrides for one accessor: element index to replacement value.
pub type SparseOverrides = HashMap<usize, Element>;

/// Component type of an accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    /// Parse the GL enum used in glTF JSON.
    pub fn from_gl(value: u32) -> Option<Self> {
        match value {
            5120 => Some(Self::I8),
            5121 => Some(Self::U8),
            5122 => Some(Self::I16),
            5123 => Some(Self::U16),
            5125 => Some(Self::U32),
            5126 => Some(Self::F32),
            _ => None,
        }
    }

    pub fn gl_enum(self) -> u32 {
        match self {
            Self::I8 => 5120,
            Self::U8 => 5121,
            Self::I16 => 5122,
            Self::U16 => 5123,
            Self::U32 => 5125,
            Self::F32 => 5126,
        }
    }

    /// Size in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }

    /// Whether `normalized: true` is meaningful for this type.
    pub fn can_normalize(self) -> bool {
        matches!(self, Self::I8 | Self::U8 | Self::I16 | Self::U16)
    }

    fn normalization_max(self) -> f64 {
        match self {
            Self::I8 => i8::MAX as f64,
            Self::U8 => u8::MAX as f64,
            Self::I16 => i16::MAX as f64,
            Self::U16 => u16::MAX as f64,
            Self::U32 => u32::MAX as f64,
            Self::F32 => 1.0,
        }
    }

    fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16)
    }

    fn decode(self, bytes: &[u8], normalized: bool) -> f64 {
        let raw = match self {
            Self::I8 => bytes[0] as i8 as f64,
            Self::U8 => bytes[0] as f64,
            Self::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            Self::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            Self::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
            Self::F32 => {
                return f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64;
            }
        };
        if !normalized {
            return raw;
        }
        let scaled = raw / self.normalization_max();
        if self.is_signed() { scaled.max(-1.0) } else { scaled }
    }

    fn encode(self, value: f64, normalized: bool, out: &mut Vec<u8>) {
        let value = if normalized && self != Self::F32 {
            (value * self.normalization_max()).round()
        } else {
            value
        };
        match self {
            Self::I8 => out.push((value.round() as i8) as u8),
            Self::U8 => out.push(value.round() as u8),
            Self::I16 => out.extend_from_slice(&(value.round() as i16).to_le_bytes()),
            Self::U16 => out.extend_from_slice(&(value.round() as u16).to_le_bytes()),
            Self::U32 => out.extend_from_slice(&(value.round() as u32).to_le_bytes()),
            Self::F32 => out.extend_from_slice(&(value as f32).to_le_bytes()),
        }
    }
}

/// Structural type of an accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl AccessorType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "SCALAR" => Some(Self::Scalar),
            "VEC2" => Some(Self::Vec2),
            "VEC3" => Some(Self::Vec3),
            "VEC4" => Some(Self::Vec4),
            "MAT2" => Some(Self::Mat2),
            "MAT3" => Some(Self::Mat3),
            "MAT4" => Some(Self::Mat4),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Vec2 => "VEC2",
            Self::Vec3 => "VEC3",
            Self::Vec4 => "VEC4",
            Self::Mat2 => "MAT2",
            Self::Mat3 => "MAT3",
            Self::Mat4 => "MAT4",
        }
    }

    /// Number of components per element.
    pub fn components(self) -> usize {
        let (columns, rows) = self.shape();
        columns * rows
    }

    /// (columns, rows); vectors are a single column.
    pub fn shape(self) -> (usize, usize) {
        match self {
            Self::Scalar => (1, 1),
            Self::Vec2 => (1, 2),
            Self::Vec3 => (1, 3),
            Self::Vec4 => (1, 4),
            Self::Mat2 => (2, 2),
            Self::Mat3 => (3, 3),
            Self::Mat4 => (4, 4),
        }
    }

    pub fn is_matrix(self) -> bool {
        matches!(self, Self::Mat2 | Self::Mat3 | Self::Mat4)
    }
}

/// Byte layout of one element.
///
/// Matrix columns start on 4-byte boundaries, so MAT2/MAT3 with 1-byte
/// components and MAT3 with 2-byte components carry column padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementLayout {
    pub component_type: ComponentType,
    pub accessor_type: AccessorType,
}

impl ElementLayout {
    pub fn new(component_type: ComponentType, accessor_type: AccessorType) -> Self {
        Self {
            component_type,
            accessor_type,
        }
    }

    /// Bytes from the start of one column to the next.
    pub fn column_stride(&self) -> usize {
        let (_, rows) = self.accessor_type.shape();
        let packed = rows * self.component_type.size();
        if self.accessor_type.is_matrix() {
            packed.next_multiple_of(4)
        } else {
            packed
        }
    }

    /// Size of one element in bytes, including column padding.
    pub fn size(&self) -> usize {
        let (columns, _) = self.accessor_type.shape();
        columns * self.column_stride()
    }

    /// Decode one element from `bytes` (at least [`Self::size`] long).
    pub fn decode(&self, bytes: &[u8], normalized: bool) -> Element {
        let (columns, rows) = self.accessor_type.shape();
        let component_size = self.component_type.size();
        let column_stride = self.column_stride();
        let mut element = Element::with_capacity(columns * rows);
        for column in 0..columns {
            for row in 0..rows {
                let at = column * column_stride + row * component_size;
                element.push(self.component_type.decode(&bytes[at..], normalized));
            }
        }
        element
    }

    /// Append the encoded element to `out`, zero-filling column padding.
    pub fn encode(&self, values: &[f64], normalized: bool, out: &mut Vec<u8>) {
        let (columns, rows) = self.accessor_type.shape();
        let column_stride = self.column_stride();
        for column in 0..columns {
            let start = out.len();
            for row in 0..rows {
                let value = values.get(column * rows + row).copied().unwrap_or(0.0);
                self.component_type.encode(value, normalized, out);
            }
            out.resize(start + column_stride, 0);
        }
    }
}

/// Encode elements tightly packed (stride = element size).
pub fn encode_elements(layout: ElementLayout, normalized: bool, elements: &[Element]) -> Vec<u8> {
    let mut out = Vec::with_capacity(elements.len() * layout.size());
    for element in elements {
        layout.encode(element, normalized, &mut out);
    }
    out
}

/// Reads elements of one accessor from a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct AccessorReader<'a> {
    index: usize,
    accessor: &'a Accessor,
    /// Bytes of the buffer view starting at the accessor's byte offset, and the stride
    dense: Option<(&'a [u8], usize)>,
    sparse: Option<&'a SparseOverrides>,
}

impl<'a> AccessorReader<'a> {
    pub(crate) fn new(document: &'a Document, index: usize) -> Result<Self> {
        let accessor = document.accessor(index)?;
        let layout = accessor.layout();
        let dense = match accessor.buffer_view {
            Some(view_index) => {
                let view = document.buffer_view(view_index)?;
                let bytes = document.view_bytes(view_index)?;
                let bytes = bytes.get(accessor.byte_offset..).ok_or_else(|| {
                    GltfError::validation(
                        format!("accessor[{}].byteOffset", index),
                        "is past the end of its buffer view",
                    )
                })?;
                Some((bytes, view.byte_stride.unwrap_or(layout.size())))
            }
            None => None,
        };
        Ok(Self {
            index,
            accessor,
            dense,
            sparse: document.sparse_overrides(index),
        })
    }

    pub fn accessor(&self) -> &'a Accessor {
        self.accessor
    }

    pub fn len(&self) -> usize {
        self.accessor.count
    }

    pub fn is_empty(&self) -> bool {
        self.accessor.count == 0
    }

    /// Decode element `i`, applying sparse overrides.
    pub fn element(&self, i: usize) -> Result<Element> {
        if i >= self.accessor.count {
            return Err(GltfError::IndexOutOfRange {
                kind: "accessor element",
                index: i,
                count: self.accessor.count,
            });
        }
        if let Some(value) = self.sparse.and_then(|overrides| overrides.get(&i)) {
            return Ok(value.clone());
        }
        self.dense_element(i)
    }

    fn dense_element(&self, i: usize) -> Result<Element> {
        let layout = self.accessor.layout();
        let Some((bytes, stride)) = self.dense else {
            return Ok(Element::from_elem(0.0, layout.accessor_type.components()));
        };
        let start = i * stride;
        let bytes = bytes.get(start..start + layout.size()).ok_or_else(|| {
            GltfError::validation(
                format!("accessor[{}]", self.index),
                format!("element {} lies outside its buffer view", i),
            )
        })?;
        Ok(layout.decode(bytes, self.accessor.normalized))
    }

    /// Decode every element in order.
    pub fn elements(&self) -> Result<Vec<Element>> {
        (0..self.accessor.count).map(|i| self.element(i)).collect()
    }

    /// Every component of every element, flattened, as f32.
    pub fn read_flat_f32(&self) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(self.capacity(self.accessor.accessor_type.components())?);
        for i in 0..self.accessor.count {
            out.extend(self.element(i)?.iter().map(|&c| c as f32));
        }
        Ok(out)
    }

    pub fn read_f32(&self) -> Result<Vec<f32>> {
        self.expect_type(AccessorType::Scalar)?;
        self.read_flat_f32()
    }

    pub fn read_vec2(&self) -> Result<Vec<Vec2>> {
        self.expect_type(AccessorType::Vec2)?;
        self.map_elements(|e| Vec2::new(e[0] as f32, e[1] as f32))
    }

    pub fn read_vec3(&self) -> Result<Vec<Vec3>> {
        self.expect_type(AccessorType::Vec3)?;
        self.map_elements(|e| Vec3::new(e[0] as f32, e[1] as f32, e[2] as f32))
    }

    /// VEC4 elements; VEC3 elements get w = 1 (vertex colors).
    pub fn read_vec4(&self) -> Result<Vec<Vec4>> {
        match self.accessor.accessor_type {
            AccessorType::Vec3 => {
                self.map_elements(|e| Vec4::new(e[0] as f32, e[1] as f32, e[2] as f32, 1.0))
            }
            _ => {
                self.expect_type(AccessorType::Vec4)?;
                self.map_elements(|e| Vec4::new(e[0] as f32, e[1] as f32, e[2] as f32, e[3] as f32))
            }
        }
    }

    /// Quaternions stored as [x, y, z, w].
    pub fn read_quat(&self) -> Result<Vec<Quat>> {
        self.expect_type(AccessorType::Vec4)?;
        self.map_elements(|e| Quat::from_xyzw(e[0] as f32, e[1] as f32, e[2] as f32, e[3] as f32))
    }

    /// Column-major 4x4 matrices.
    pub fn read_mat4(&self) -> Result<Vec<Mat4>> {
        self.expect_type(AccessorType::Mat4)?;
        self.map_elements(|e| {
            let mut cols = [0.0f32; 16];
            for (dst, src) in cols.iter_mut().zip(e.iter()) {
                *dst = *src as f32;
            }
            Mat4::from_cols_array(&cols)
        })
    }

    /// Unsigned integer scalars (indices).
    pub fn read_u32(&self) -> Result<Vec<u32>> {
        self.expect_type(AccessorType::Scalar)?;
        self.expect_unnormalized_int()?;
        self.map_elements(|e| e[0] as u32)
    }

    /// Unsigned integer VEC4s (joint indices).
    pub fn read_uvec4(&self) -> Result<Vec<[u32; 4]>> {
        self.expect_type(AccessorType::Vec4)?;
        self.expect_unnormalized_int()?;
        self.map_elements(|e| [e[0] as u32, e[1] as u32, e[2] as u32, e[3] as u32])
    }

    fn map_elements<T>(&self, f: impl Fn(&Element) -> T) -> Result<Vec<T>> {
        let mut out = Vec::with_capacity(self.capacity(1)?);
        for i in 0..self.accessor.count {
            out.push(f(&self.element(i)?));
        }
        Ok(out)
    }

    /// `count × per_element`, rejected when it cannot be addressed.
    fn capacity(&self, per_element: usize) -> Result<usize> {
        self.accessor
            .count
            .checked_mul(per_element)
            .filter(|&n| n <= isize::MAX as usize / std::mem::size_of::<f64>())
            .ok_or_else(|| {
                GltfError::validation(
                    format!("accessor[{}].count", self.index),
                    format!("{} elements cannot be decoded", self.accessor.count),
                )
            })
    }

    fn expect_type(&self, expected: AccessorType) -> Result<()> {
        if self.accessor.accessor_type != expected {
            return Err(GltfError::validation(
                format!("accessor[{}]", self.index),
                format!(
                    "is {}, expected {}",
                    self.accessor.accessor_type.name(),
                    expected.name()
                ),
            ));
        }
        Ok(())
    }

    fn expect_unnormalized_int(&self) -> Result<()> {
        let ct = self.accessor.component_type;
        if self.accessor.normalized || !matches!(ct, ComponentType::U8 | ComponentType::U16 | ComponentType::U32) {
            return Err(GltfError::validation(
                format!("accessor[{}]", self.index),
                format!("is {:?} (normalized: {}), expected an unsigned integer type", ct, self.accessor.normalized),
            ));
        }
        Ok(())
    }
}
