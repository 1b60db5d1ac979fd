//! Mesh extraction: vertex streams of a primitive, optionally baked into world space.

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::document::{Document, Mode, Primitive, Semantic};
use crate::error::{GltfError, Result};
use crate::morph;
use crate::pose::Pose;

/// Vertex data of one primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveData {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    /// xyz = direction, w = handedness (±1)
    pub tangents: Option<Vec<Vec4>>,
    pub tex_coords: Option<Vec<Vec2>>,
    /// RGBA; RGB sources get alpha 1
    pub colors: Option<Vec<Vec4>>,
    pub joints: Option<Vec<[u32; 4]>>,
    pub weights: Option<Vec<Vec4>>,
    /// Index buffer, or `0..vertex_count` for non-indexed primitives
    pub indices: Vec<u32>,
    pub mode: Mode,
    pub material: Option<usize>,
}

impl PrimitiveData {
    /// Read primitive `primitive` of mesh `mesh`.
    pub fn read(document: &Document, mesh: usize, primitive: usize) -> Result<Self> {
        let prim = primitive_of(document, mesh, primitive)?;

        let positions = match prim.get(&Semantic::Positions) {
            Some(accessor) => document.reader(accessor)?.read_vec3()?,
            None => {
                return Err(GltfError::validation(
                    format!("mesh[{}].primitive[{}]", mesh, primitive),
                    "has no POSITION attribute",
                ));
            }
        };

        let normals = prim
            .get(&Semantic::Normals)
            .map(|a| document.reader(a)?.read_vec3())
            .transpose()?;
        let tangents = prim
            .get(&Semantic::Tangents)
            .map(|a| document.reader(a)?.read_vec4())
            .transpose()?;
        let tex_coords = prim
            .get(&Semantic::TexCoords(0))
            .map(|a| document.reader(a)?.read_vec2())
            .transpose()?;
        let colors = prim
            .get(&Semantic::Colors(0))
            .map(|a| document.reader(a)?.read_vec4())
            .transpose()?;
        let joints = prim
            .get(&Semantic::Joints(0))
            .map(|a| document.reader(a)?.read_uvec4())
            .transpose()?;
        let weights = prim
            .get(&Semantic::Weights(0))
            .map(|a| document.reader(a)?.read_vec4())
            .transpose()?;

        let indices = match prim.indices {
            Some(accessor) => document.reader(accessor)?.read_u32()?,
            None => (0..positions.len() as u32).collect(),
        };
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(GltfError::validation(
                format!("mesh[{}].primitive[{}].indices", mesh, primitive),
                format!("index {} out of range for {} vertices", bad, positions.len()),
            ));
        }

        Ok(Self {
            positions,
            normals,
            tangents,
            tex_coords,
            colors,
            joints,
            weights,
            indices,
            mode: prim.mode,
            material: prim.material,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Transform positions, normals and tangents by `world` in place.
    ///
    /// Normals use the inverse transpose so non-uniform scale keeps them
    /// perpendicular to the surface. Mirroring transforms flip tangent handedness.
    pub fn bake_transform(&mut self, world: Mat4) {
        for p in &mut self.positions {
            *p = world.transform_point3(*p);
        }
        let linear = Mat3::from_mat4(world);
        if let Some(normals) = &mut self.normals {
            let normal_matrix = linear.inverse().transpose();
            for n in normals.iter_mut() {
                *n = (normal_matrix * *n).normalize_or_zero();
            }
        }
        if let Some(tangents) = &mut self.tangents {
            let flip = if linear.determinant() < 0.0 { -1.0 } else { 1.0 };
            for t in tangents.iter_mut() {
                let xyz = (linear * t.truncate()).normalize_or_zero();
                *t = xyz.extend(t.w * flip);
            }
        }
    }

    /// Replace positions, normals and tangent directions with their values
    /// blended by morph `weights`.
    ///
    /// Normals and tangents are only touched when some target displaces them;
    /// blended directions are renormalized and tangent handedness is kept.
    pub fn apply_morph(&mut self, document: &Document, mesh: usize, primitive: usize, weights: &[f32]) -> Result<()> {
        let prim = primitive_of(document, mesh, primitive)?;
        self.positions = morph::morph_attribute(document, prim, &Semantic::Positions, weights)?;

        if self.normals.is_some() && prim.targets.iter().any(|t| t.normals.is_some()) {
            let normals = morph::morph_attribute(document, prim, &Semantic::Normals, weights)?;
            self.normals = Some(normals.into_iter().map(Vec3::normalize_or_zero).collect());
        }
        if let Some(tangents) = &mut self.tangents {
            if prim.targets.iter().any(|t| t.tangents.is_some()) {
                let directions = morph::morph_attribute(document, prim, &Semantic::Tangents, weights)?;
                for (t, xyz) in tangents.iter_mut().zip(directions) {
                    *t = xyz.normalize_or_zero().extend(t.w);
                }
            }
        }
        Ok(())
    }

    /// Axis-aligned bounds of the positions, `None` when empty.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p))),
        )
    }
}

/// Base positions of a primitive blended with morph `weights`.
pub fn morph_positions(document: &Document, mesh: usize, primitive: usize, weights: &[f32]) -> Result<Vec<Vec3>> {
    let prim = primitive_of(document, mesh, primitive)?;
    morph::morph_attribute(document, prim, &Semantic::Positions, weights)
}

fn primitive_of(document: &Document, mesh: usize, primitive: usize) -> Result<&Primitive> {
    document.mesh(mesh)?.primitives.get(primitive).ok_or_else(|| {
        GltfError::validation(format!("mesh[{}]", mesh), format!("has no primitive {}", primitive))
    })
}

/// One mesh primitive placed in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshInstance {
    pub node: usize,
    pub mesh: usize,
    pub primitive: usize,
    pub data: PrimitiveData,
}

/// Every mesh primitive of a pose, morphed with the pose's weights and
/// baked into world space.
///
/// Morphing covers positions, normals and tangents (see
/// [`PrimitiveData::apply_morph`]). Skinned nodes are left in mesh space; their joint matrices are in the pose.
pub fn bake_pose(document: &Document, pose: &Pose) -> Result<Vec<MeshInstance>> {
    let mut instances = Vec::new();
    for (node_index, node) in document.nodes().iter().enumerate() {
        let Some(mesh) = node.mesh else {
            continue;
        };
        let node_pose = pose.node(node_index).ok_or(GltfError::IndexOutOfRange {
            kind: "pose node",
            index: node_index,
            count: pose.nodes().len(),
        })?;

        for primitive in 0..document.mesh(mesh)?.primitives.len() {
            let mut data = PrimitiveData::read(document, mesh, primitive)?;
            if node_pose.weights.iter().any(|&w| w != 0.0) {
                data.apply_morph(document, mesh, primitive, &node_pose.weights)?;
            }
            if node.skin.is_none() {
                data.bake_transform(node_pose.world);
            }
            instances.push(MeshInstance {
                node: node_index,
                mesh,
                primitive,
                data,
            });
        }
    }
    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> PrimitiveData {
        PrimitiveData {
            positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            normals: Some(vec![Vec3::Z; 3]),
            tangents: Some(vec![Vec4::new(1.0, 0.0, 0.0, 1.0); 3]),
            tex_coords: None,
            colors: None,
            joints: None,
            weights: None,
            indices: vec![0, 1, 2],
            mode: Mode::Triangles,
            material: None,
        }
    }

    #[test]
    fn test_bake_translation() {
        let mut data = triangle();
        data.bake_transform(Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0)));
        assert_eq!(data.positions[1], Vec3::new(1.0, 0.0, 5.0));
        // Directions ignore translation
        assert_eq!(data.normals.as_ref().unwrap()[0], Vec3::Z);
    }

    #[test]
    fn test_bake_non_uniform_scale_keeps_normals_unit() {
        let mut data = triangle();
        data.normals = Some(vec![Vec3::new(1.0, 1.0, 0.0).normalize(); 3]);
        data.bake_transform(Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0)));
        let n = data.normals.unwrap()[0];
        assert!((n.length() - 1.0).abs() < 1e-6);
        // Inverse transpose tilts the normal toward the unscaled axis
        assert!(n.y > n.x);
    }

    #[test]
    fn test_mirror_flips_handedness() {
        let mut data = triangle();
        data.bake_transform(Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0)));
        assert_eq!(data.tangents.unwrap()[0], Vec4::new(-1.0, 0.0, 0.0, -1.0));
    }

    #[test]
    fn test_bounds() {
        let data = triangle();
        assert_eq!(data.bounds(), Some((Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0))));
    }
}
