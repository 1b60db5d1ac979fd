//! GLB/glTF generation utilities for nether-gltf tests
//!
//! This library provides builder-pattern APIs for constructing glTF assets:
//! - BufferBuilder: Pack binary data with automatic alignment, raw and sparse accessors
//! - MeshBuilder: Mesh attributes and morph targets
//! - SkeletonBuilder: Skin joints and inverse bind matrices
//! - AnimationBuilder: Keyframe tracks with any interpolation
//! - GltfBuilder: Top-level document, output as GLB or embedded glTF
//!
//! # Example
//!
//! ```no_run
//! use glb_builder::*;
//!
//! let mut buffer = BufferBuilder::new();
//! let mesh = MeshBuilder::new()
//!     .positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]])
//!     .normals(&[[0.0, 0.0, 1.0]; 3])
//!     .indices(&[0, 1, 2])
//!     .build(&mut buffer);
//!
//! let glb_bytes = GltfBuilder::new()
//!     .add_mesh_from_accessors("Triangle", &mesh)
//!     .add_node(json::json!({"mesh": 0}))
//!     .add_scene("Scene", &[0])
//!     .build_glb(&buffer, "glb-builder")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod animation;
pub mod buffer;
pub mod document;
pub mod mesh;
pub mod skeleton;
pub mod utils;

pub use animation::{AnimationAccessors, AnimationBuilder, TrackAccessors};
pub use buffer::{AccessorIndex, BufferBuilder, RawLayout, SparseData};
pub use document::{BufferStorage, GltfBuilder};
pub use mesh::{MeshAccessors, MeshBuilder};
pub use skeleton::{IDENTITY_MAT4, SkeletonAccessors, SkeletonBuilder};
pub use utils::{align_buffer, assemble_glb, assemble_glb_chunks, compute_bounds, data_uri};

// Re-export serde_json for building raw JSON objects
pub use serde_json as json;
