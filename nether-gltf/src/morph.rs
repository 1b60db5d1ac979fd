//! Morph target blending.

use glam::Vec3;

use crate::document::{Document, MorphTarget, Primitive, Semantic};
use crate::error::{GltfError, Result};

/// `base + Σ weights[i] × targets[i]`, per element.
///
/// Weights beyond the number of targets (and targets beyond the number of
/// weights) are ignored.
pub fn blend(base: &[Vec3], targets: &[Vec<Vec3>], weights: &[f32]) -> Result<Vec<Vec3>> {
    let mut out = base.to_vec();
    for (t, (deltas, &weight)) in targets.iter().zip(weights).enumerate() {
        if deltas.len() != base.len() {
            return Err(GltfError::validation(
                format!("morph target {}", t),
                format!("has {} deltas for {} vertices", deltas.len(), base.len()),
            ));
        }
        if weight == 0.0 {
            continue;
        }
        for (v, d) in out.iter_mut().zip(deltas) {
            *v += *d * weight;
        }
    }
    Ok(out)
}

/// Blend one VEC3 attribute of a primitive (positions, normals or tangent xyz).
///
/// Targets that do not carry the attribute contribute nothing.
pub fn morph_attribute(
    document: &Document,
    primitive: &Primitive,
    semantic: &Semantic,
    weights: &[f32],
) -> Result<Vec<Vec3>> {
    let base_accessor = primitive.get(semantic).ok_or_else(|| {
        GltfError::validation("primitive", format!("has no {:?} attribute", semantic))
    })?;
    let base = match semantic {
        // TANGENT is VEC4; w (handedness) is not morphed
        Semantic::Tangents => document
            .reader(base_accessor)?
            .read_vec4()?
            .into_iter()
            .map(|t| t.truncate())
            .collect(),
        _ => document.reader(base_accessor)?.read_vec3()?,
    };

    let select = |target: &MorphTarget| match semantic {
        Semantic::Positions => target.positions,
        Semantic::Normals => target.normals,
        Semantic::Tangents => target.tangents,
        _ => None,
    };
    let mut targets = Vec::with_capacity(primitive.targets.len());
    for target in &primitive.targets {
        match select(target) {
            Some(accessor) => targets.push(document.reader(accessor)?.read_vec3()?),
            None => targets.push(vec![Vec3::ZERO; base.len()]),
        }
    }
    blend(&base, &targets, weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_weighted_sum() {
        let base = vec![Vec3::ZERO, Vec3::ONE];
        let targets = vec![
            vec![Vec3::X, Vec3::X],
            vec![Vec3::Y, Vec3::ZERO],
        ];
        let out = blend(&base, &targets, &[0.5, 1.0]).unwrap();
        assert_eq!(out[0], Vec3::new(0.5, 1.0, 0.0));
        assert_eq!(out[1], Vec3::new(1.5, 1.0, 1.0));
    }

    #[test]
    fn test_zero_weights_keep_base() {
        let base = vec![Vec3::new(1.0, 2.0, 3.0)];
        let out = blend(&base, &[vec![Vec3::ONE]], &[0.0]).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn test_mismatched_target_length() {
        let err = blend(&[Vec3::ZERO], &[vec![]], &[1.0]).unwrap_err();
        assert!(err.to_string().contains("morph target 0"));
    }
}
