//! Programmatic glTF generation for integration tests.
//!
//! Generates small but complete assets:
//! - Skinned rig: one mesh node, 2-joint chain, translation animation
//! - Morph quad: 2 morph targets with a weights animation
//! - JSON-only documents for validation failures

#![allow(dead_code)]

use glb_builder::json::{Value, json};
use glb_builder::{
    AnimationBuilder, BufferBuilder, GltfBuilder, IDENTITY_MAT4, MeshBuilder, SkeletonBuilder,
};
use nether_gltf::{Document, LoadOptions};

pub const GENERATOR: &str = "nether-gltf tests";

/// Column-major translation matrix
pub fn translation_mat4(x: f32, y: f32, z: f32) -> [f32; 16] {
    let mut m = IDENTITY_MAT4;
    m[12] = x;
    m[13] = y;
    m[14] = z;
    m
}

pub fn triangle() -> [[f32; 3]; 3] {
    [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
}

/// Buffer and builder for the skinned rig.
///
/// Nodes:
/// - 0 "Body": mesh 0, skin 0, translated by `mesh_offset`
/// - 1 "Root": joint 0, parent of 2
/// - 2 "Tip": joint 1 at [0, 1, 0]
///
/// Animation 0 "Slide" moves Root from [0, 0, 0] to [2, 0, 0] over 1s.
pub fn skinned_rig_parts(mesh_offset: [f32; 3]) -> (BufferBuilder, GltfBuilder) {
    let mut buffer = BufferBuilder::new();
    let mesh = MeshBuilder::new()
        .positions(&triangle())
        .normals(&[[0.0, 0.0, 1.0]; 3])
        .joints(&[[0, 0, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0]])
        .weights(&[[1.0, 0.0, 0.0, 0.0]; 3])
        .indices(&[0, 1, 2])
        .build(&mut buffer);
    let skeleton = SkeletonBuilder::new()
        .joint(1, IDENTITY_MAT4)
        .joint(2, translation_mat4(0.0, -1.0, 0.0))
        .skeleton_root(1)
        .build(&mut buffer);
    let animation = AnimationBuilder::new()
        .translations(1, &[0.0, 1.0], &[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0]])
        .build(&mut buffer);

    let builder = GltfBuilder::new()
        .add_mesh_from_accessors("Body", &mesh)
        .add_skin("Rig", &skeleton)
        .add_animation("Slide", &animation)
        .add_nodes(vec![
            json!({"name": "Body", "mesh": 0, "skin": 0, "translation": mesh_offset}),
            json!({"name": "Root", "children": [2]}),
            json!({"name": "Tip", "translation": [0.0, 1.0, 0.0]}),
        ])
        .add_scene("Scene", &[0, 1]);
    (buffer, builder)
}

pub fn skinned_rig_glb() -> Vec<u8> {
    let (buffer, builder) = skinned_rig_parts([0.0, 0.0, 0.0]);
    builder.build_glb(&buffer, GENERATOR).expect("assemble skinned rig")
}

/// Single mesh node at [0, 0, 2] with two POSITION morph targets:
/// target 0 moves every vertex by +Y, target 1 by +X.
///
/// Animation 0 "Blend" takes the weights from [0, 0] to [1, 0.5] over 1s.
pub fn morph_quad_glb() -> Vec<u8> {
    let mut buffer = BufferBuilder::new();
    let mesh = MeshBuilder::new()
        .positions(&triangle())
        .indices(&[0, 1, 2])
        .morph_target(&[[0.0, 1.0, 0.0]; 3])
        .morph_target(&[[1.0, 0.0, 0.0]; 3])
        .default_weights(&[0.0, 0.0])
        .build(&mut buffer);
    let animation = AnimationBuilder::new()
        .weights(0, &[0.0, 1.0], &[0.0, 0.0, 1.0, 0.5])
        .build(&mut buffer);

    GltfBuilder::new()
        .add_mesh_from_accessors("Face", &mesh)
        .add_animation("Blend", &animation)
        .add_node(json!({"name": "Face", "mesh": 0, "translation": [0.0, 0.0, 2.0]}))
        .add_scene("Scene", &[0])
        .build_glb(&buffer, GENERATOR)
        .expect("assemble morph quad")
}

/// One animated node and a single track built by `track`.
pub fn single_track_glb(track: impl FnOnce(AnimationBuilder) -> AnimationBuilder) -> Vec<u8> {
    let mut buffer = BufferBuilder::new();
    let animation = track(AnimationBuilder::new()).build(&mut buffer);
    GltfBuilder::new()
        .add_animation("Track", &animation)
        .add_node(json!({"name": "Animated"}))
        .add_scene("Scene", &[0])
        .build_glb(&buffer, GENERATOR)
        .expect("assemble single track")
}

/// Load with default options, panicking with the error on failure.
pub fn load(bytes: &[u8]) -> Document {
    match nether_gltf::load(bytes, &LoadOptions::default()) {
        Ok(document) => document,
        Err(e) => panic!("load failed: {}", e),
    }
}

/// Serialize a JSON document for `nether_gltf::load`.
pub fn json_bytes(root: &Value) -> Vec<u8> {
    glb_builder::json::to_vec(root).expect("serialize JSON")
}

/// Bare document holding only `nodes`.
pub fn nodes_document(nodes: Value) -> Value {
    json!({
        "asset": {"version": "2.0"},
        "nodes": nodes,
    })
}
