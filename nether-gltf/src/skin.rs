//! Skinning: inverse bind matrices and joint matrices.

use glam::Mat4;

use crate::document::Document;
use crate::error::{GltfError, Result};

/// Inverse bind matrices of a skin, one per joint (identity when the skin has none).
pub fn inverse_bind_matrices(document: &Document, skin: usize) -> Result<Vec<Mat4>> {
    let skin_data = document.skin(skin)?;
    match skin_data.inverse_bind_matrices {
        Some(accessor) => {
            let mut matrices = document.reader(accessor)?.read_mat4()?;
            matrices.truncate(skin_data.joints.len());
            Ok(matrices)
        }
        None => Ok(vec![Mat4::IDENTITY; skin_data.joints.len()]),
    }
}

/// Node whose mesh is deformed by `skin`: the first node using it.
pub fn skinned_mesh_node(document: &Document, skin: usize) -> Option<usize> {
    document.skin_users(skin).first().copied()
}

/// Joint matrices for `skin` given world transforms of every node.
///
/// A vertex is transformed by its joint's inverse bind matrix, then the
/// joint's world transform, then the inverse world transform of the skinned
/// mesh node, so skinned vertices come out in mesh space.
pub fn joint_matrices(document: &Document, skin: usize, world: &[Mat4]) -> Result<Vec<Mat4>> {
    let joints = &document.skin(skin)?.joints;
    let ibms = inverse_bind_matrices(document, skin)?;
    let mesh_world = match skinned_mesh_node(document, skin) {
        Some(node) => world_of(world, node)?,
        None => Mat4::IDENTITY,
    };
    let to_mesh = mesh_world.inverse();

    joints
        .iter()
        .zip(&ibms)
        .map(|(&joint, ibm)| Ok(to_mesh * world_of(world, joint)? * *ibm))
        .collect()
}

fn world_of(world: &[Mat4], node: usize) -> Result<Mat4> {
    world.get(node).copied().ok_or(GltfError::IndexOutOfRange {
        kind: "node",
        index: node,
        count: world.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadOptions;

    #[test]
    fn test_identity_joint_without_ibm() {
        let document = crate::load(
            br#"{
                "asset": {"version": "2.0"},
                "nodes": [{}],
                "skins": [{"joints": [0]}]
            }"#,
            &LoadOptions::default(),
        )
        .unwrap();
        let matrices = joint_matrices(&document, 0, &[Mat4::IDENTITY]).unwrap();
        assert_eq!(matrices, vec![Mat4::IDENTITY]);
        assert_eq!(skinned_mesh_node(&document, 0), None);
    }

    #[test]
    fn test_world_too_short() {
        let document = crate::load(
            br#"{
                "asset": {"version": "2.0"},
                "nodes": [{}, {}],
                "skins": [{"joints": [1]}]
            }"#,
            &LoadOptions::default(),
        )
        .unwrap();
        assert!(joint_matrices(&document, 0, &[Mat4::IDENTITY]).is_err());
        assert!(joint_matrices(&document, 5, &[]).is_err());
    }
}
