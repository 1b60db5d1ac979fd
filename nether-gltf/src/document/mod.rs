//! Typed, validated glTF document.
//!
//! The [`Document`] is an arena: every entity lives in a `Vec` and refers to
//! others by index. All indices are checked when the document is built, so
//! code holding a `Document` can index its vectors without re-validating.
//! Reverse lookups (parent of a node, nodes using a skin or mesh) are built
//! once at load time.

mod build;

use glam::{Mat4, Quat, Vec3};
use std::collections::BTreeMap;

use crate::accessor::{AccessorReader, AccessorType, ComponentType, ElementLayout, SparseOverrides};
use crate::error::{GltfError, Result};
use crate::extensions::{Extensions, TextureTransform};

pub(crate) use build::build_document;

/// Translation, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trs {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Trs {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// T × R × S
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Trs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Node local transform: an explicit matrix or TRS, never both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    Matrix(Mat4),
    Decomposed(Trs),
}

impl Transform {
    /// Local matrix. Matrices are used verbatim.
    pub fn matrix(&self) -> Mat4 {
        match self {
            Self::Matrix(m) => *m,
            Self::Decomposed(trs) => trs.to_matrix(),
        }
    }

    /// TRS form, decomposing a matrix when needed.
    pub fn decomposed(&self) -> Trs {
        match self {
            Self::Matrix(m) => {
                let (scale, rotation, translation) = m.to_scale_rotation_translation();
                Trs {
                    translation,
                    rotation,
                    scale,
                }
            }
            Self::Decomposed(trs) => *trs,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::Decomposed(Trs::IDENTITY)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetInfo {
    pub version: String,
    pub generator: Option<String>,
    pub copyright: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub name: Option<String>,
    pub nodes: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub name: Option<String>,
    pub transform: Transform,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    pub camera: Option<usize>,
    /// Default morph weights, overriding the mesh's
    pub weights: Option<Vec<f32>>,
    pub extensions: Extensions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    pub name: Option<String>,
    pub uri: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    ArrayBuffer,
    ElementArrayBuffer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BufferView {
    pub name: Option<String>,
    pub buffer: usize,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<BufferTarget>,
}

/// Where the sparse index/value arrays of an accessor live.
#[derive(Debug, Clone, PartialEq)]
pub struct Sparse {
    pub count: usize,
    pub indices_view: usize,
    pub indices_offset: usize,
    pub indices_type: ComponentType,
    pub values_view: usize,
    pub values_offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Accessor {
    pub name: Option<String>,
    /// `None` means all elements start out as zero
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub accessor_type: AccessorType,
    pub normalized: bool,
    pub count: usize,
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
    pub sparse: Option<Sparse>,
}

impl Accessor {
    pub fn layout(&self) -> ElementLayout {
        ElementLayout::new(self.component_type, self.accessor_type)
    }
}

/// Vertex attribute semantic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Semantic {
    Positions,
    Normals,
    Tangents,
    TexCoords(u32),
    Colors(u32),
    Joints(u32),
    Weights(u32),
    /// Application-specific (`_FOO`) or unknown semantics
    Custom(String),
}

impl Semantic {
    pub fn parse(name: &str) -> Self {
        let indexed = |prefix: &str| {
            name.strip_prefix(prefix)
                .and_then(|n| n.parse::<u32>().ok())
        };
        match name {
            "POSITION" => Self::Positions,
            "NORMAL" => Self::Normals,
            "TANGENT" => Self::Tangents,
            _ => {
                if let Some(n) = indexed("TEXCOORD_") {
                    Self::TexCoords(n)
                } else if let Some(n) = indexed("COLOR_") {
                    Self::Colors(n)
                } else if let Some(n) = indexed("JOINTS_") {
                    Self::Joints(n)
                } else if let Some(n) = indexed("WEIGHTS_") {
                    Self::Weights(n)
                } else {
                    Self::Custom(name.to_string())
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl Mode {
    pub fn from_gl(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::Points,
            1 => Self::Lines,
            2 => Self::LineLoop,
            3 => Self::LineStrip,
            4 => Self::Triangles,
            5 => Self::TriangleStrip,
            6 => Self::TriangleFan,
            _ => return None,
        })
    }
}

/// Per-vertex deltas for one morph target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MorphTarget {
    pub positions: Option<usize>,
    pub normals: Option<usize>,
    pub tangents: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub attributes: BTreeMap<Semantic, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    pub mode: Mode,
    pub targets: Vec<MorphTarget>,
}

impl Primitive {
    pub fn get(&self, semantic: &Semantic) -> Option<usize> {
        self.attributes.get(semantic).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: Option<String>,
    pub primitives: Vec<Primitive>,
    /// Default morph weights (zeros when the asset gives none)
    pub weights: Vec<f32>,
    pub extensions: Extensions,
}

impl Mesh {
    /// Morph target count, shared by all primitives.
    pub fn target_count(&self) -> usize {
        self.primitives.first().map_or(0, |p| p.targets.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    pub name: Option<String>,
    pub joints: Vec<usize>,
    /// One MAT4 per joint; identity when `None`
    pub inverse_bind_matrices: Option<usize>,
    pub skeleton: Option<usize>,
}

/// Animated node property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Translation,
    Rotation,
    Scale,
    Weights,
}

impl Property {
    pub fn parse(path: &str) -> Option<Self> {
        match path {
            "translation" => Some(Self::Translation),
            "rotation" => Some(Self::Rotation),
            "scale" => Some(Self::Scale),
            "weights" => Some(Self::Weights),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    CubicSpline,
}

impl Interpolation {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "LINEAR" => Some(Self::Linear),
            "STEP" => Some(Self::Step),
            "CUBICSPLINE" => Some(Self::CubicSpline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub sampler: usize,
    pub node: usize,
    pub property: Property,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationSampler {
    /// Keyframe times (SCALAR f32, seconds)
    pub input: usize,
    /// Keyframe values
    pub output: usize,
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub name: Option<String>,
    pub channels: Vec<Channel>,
    pub samplers: Vec<AnimationSampler>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureRef {
    pub index: usize,
    pub tex_coord: u32,
    pub transform: Option<TextureTransform>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: Option<String>,
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<TextureRef>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureRef>,
    pub normal_texture: Option<TextureRef>,
    pub normal_scale: f32,
    pub occlusion_texture: Option<TextureRef>,
    pub occlusion_strength: f32,
    pub emissive_texture: Option<TextureRef>,
    pub emissive_factor: [f32; 3],
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    pub extensions: Extensions,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: None,
            base_color_factor: [1.0; 4],
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            normal_texture: None,
            normal_scale: 1.0,
            occlusion_texture: None,
            occlusion_strength: 1.0,
            emissive_texture: None,
            emissive_factor: [0.0; 3],
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
            extensions: Extensions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub name: Option<String>,
    pub sampler: Option<usize>,
    pub source: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureSampler {
    pub mag_filter: Option<u32>,
    pub min_filter: Option<u32>,
    pub wrap_s: Option<u32>,
    pub wrap_t: Option<u32>,
}

/// Image reference. Pixels are never decoded here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Uri(String),
    View {
        buffer_view: usize,
        mime_type: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub name: Option<String>,
    pub source: ImageSource,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        aspect_ratio: Option<f32>,
        yfov: f32,
        znear: f32,
        zfar: Option<f32>,
    },
    Orthographic {
        xmag: f32,
        ymag: f32,
        znear: f32,
        zfar: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: Option<String>,
    pub projection: Projection,
}

/// Immutable, validated glTF document.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) asset: AssetInfo,
    pub(crate) default_scene: Option<usize>,
    pub(crate) scenes: Vec<Scene>,
    pub(crate) nodes: Vec<Node>,
    pub(crate) meshes: Vec<Mesh>,
    pub(crate) accessors: Vec<Accessor>,
    pub(crate) buffer_views: Vec<BufferView>,
    pub(crate) buffers: Vec<Buffer>,
    pub(crate) skins: Vec<Skin>,
    pub(crate) animations: Vec<Animation>,
    pub(crate) materials: Vec<Material>,
    pub(crate) textures: Vec<Texture>,
    pub(crate) texture_samplers: Vec<TextureSampler>,
    pub(crate) images: Vec<Image>,
    pub(crate) cameras: Vec<Camera>,
    pub(crate) extensions: Extensions,
    pub(crate) extensions_used: Vec<String>,
    pub(crate) extensions_required: Vec<String>,
    // Built once at load time
    pub(crate) sparse_overrides: Vec<Option<SparseOverrides>>,
    pub(crate) parents: Vec<Option<usize>>,
    pub(crate) skin_users: Vec<Vec<usize>>,
    pub(crate) mesh_users: Vec<Vec<usize>>,
}

macro_rules! entity_getters {
    ($($many:ident, $one:ident, $ty:ty, $kind:literal;)*) => {
        $(
            pub fn $many(&self) -> &[$ty] {
                &self.$many
            }

            pub fn $one(&self, index: usize) -> Result<&$ty> {
                self.$many.get(index).ok_or(GltfError::IndexOutOfRange {
                    kind: $kind,
                    index,
                    count: self.$many.len(),
                })
            }
        )*
    };
}

impl Document {
    entity_getters! {
        scenes, scene, Scene, "scene";
        nodes, node, Node, "node";
        meshes, mesh, Mesh, "mesh";
        accessors, accessor, Accessor, "accessor";
        buffer_views, buffer_view, BufferView, "buffer view";
        buffers, buffer, Buffer, "buffer";
        skins, skin, Skin, "skin";
        animations, animation, Animation, "animation";
        materials, material, Material, "material";
        textures, texture, Texture, "texture";
        texture_samplers, texture_sampler, TextureSampler, "texture sampler";
        images, image, Image, "image";
        cameras, camera, Camera, "camera";
    }

    pub fn asset(&self) -> &AssetInfo {
        &self.asset
    }

    /// The scene to show by default, if the asset names one.
    pub fn default_scene(&self) -> Option<&Scene> {
        self.default_scene.and_then(|i| self.scenes.get(i))
    }

    /// Root-level extensions.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_used(&self) -> &[String] {
        &self.extensions_used
    }

    pub fn extensions_required(&self) -> &[String] {
        &self.extensions_required
    }

    /// True when the asset declares `name` in `extensionsUsed` or carries it at the root.
    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions_used.iter().any(|e| e == name) || self.extensions.has(name)
    }

    /// Parent of `node`, `None` for roots.
    pub fn parent(&self, node: usize) -> Option<usize> {
        self.parents.get(node).copied().flatten()
    }

    /// Nodes without a parent, in index order.
    pub fn root_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.parents
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.is_none().then_some(i))
    }

    /// Nodes whose `skin` is `skin`, in index order.
    pub fn skin_users(&self, skin: usize) -> &[usize] {
        self.skin_users.get(skin).map_or(&[], Vec::as_slice)
    }

    /// Nodes instancing `mesh`, in index order.
    pub fn mesh_users(&self, mesh: usize) -> &[usize] {
        self.mesh_users.get(mesh).map_or(&[], Vec::as_slice)
    }

    /// Reader for accessor `index`.
    pub fn reader(&self, index: usize) -> Result<AccessorReader<'_>> {
        AccessorReader::new(self, index)
    }

    /// Bytes covered by a buffer view.
    pub fn view_bytes(&self, index: usize) -> Result<&[u8]> {
        let view = self.buffer_view(index)?;
        let buffer = self.buffer(view.buffer)?;
        buffer
            .data
            .get(view.byte_offset..view.byte_offset + view.byte_length)
            .ok_or_else(|| {
                GltfError::validation(format!("bufferView[{}]", index), "exceeds its buffer")
            })
    }

    pub(crate) fn sparse_overrides(&self, accessor: usize) -> Option<&SparseOverrides> {
        self.sparse_overrides.get(accessor).and_then(Option::as_ref)
    }

    /// Default morph weights for a node: its own, else its mesh's.
    pub fn default_weights(&self, node: usize) -> Vec<f32> {
        let Some(node) = self.nodes.get(node) else {
            return Vec::new();
        };
        if let Some(weights) = &node.weights {
            return weights.clone();
        }
        node.mesh
            .and_then(|m| self.meshes.get(m))
            .map(|m| m.weights.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_parse() {
        assert_eq!(Semantic::parse("POSITION"), Semantic::Positions);
        assert_eq!(Semantic::parse("TEXCOORD_1"), Semantic::TexCoords(1));
        assert_eq!(Semantic::parse("JOINTS_0"), Semantic::Joints(0));
        assert_eq!(Semantic::parse("_BATCHID"), Semantic::Custom("_BATCHID".into()));
        assert_eq!(Semantic::parse("TEXCOORD_x"), Semantic::Custom("TEXCOORD_x".into()));
    }

    #[test]
    fn test_trs_matrix_order() {
        let trs = Trs {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(2.0),
        };
        // Scale applies before translation
        let p = trs.to_matrix().transform_point3(Vec3::ONE);
        assert_eq!(p, Vec3::new(3.0, 4.0, 5.0));
    }

    #[test]
    fn test_matrix_transform_decomposes() {
        let m = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let trs = Transform::Matrix(m).decomposed();
        assert_eq!(trs.translation, Vec3::new(0.0, 5.0, 0.0));
        assert_eq!(trs.scale, Vec3::ONE);
    }

    #[test]
    fn test_property_and_interpolation_parse() {
        assert_eq!(Property::parse("weights"), Some(Property::Weights));
        assert_eq!(Property::parse("pointer"), None);
        assert_eq!(Interpolation::parse("CUBICSPLINE"), Some(Interpolation::CubicSpline));
        assert_eq!(Interpolation::default(), Interpolation::Linear);
    }
}
