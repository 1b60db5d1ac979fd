//! glTF 2.0 loading, scene graph and animation evaluation
//!
//! Loading is a pipeline of pure stages:
//! - `container`: `.gltf` / `.glb` bytes to JSON plus buffer blobs
//! - `document`: validated, immutable, index-addressed model
//! - `accessor`: typed element decoding (and encoding) over buffers
//! - `scene`: local and world transforms
//! - `animation`, `skin`, `morph`, `pose`: keyframe sampling, joint matrices
//!   and morph blending into a per-frame [`Pose`]
//! - `playback`: play/pause/seek clock over a clip
//! - `mesh`: vertex streams, world-space baking
//!
//! # Example
//!
//! ```no_run
//! use nether_gltf::{LoadOptions, evaluate, load_path};
//!
//! let document = load_path("character.glb", &LoadOptions::default())?;
//! let pose = evaluate(&document, 0, 0.5, true)?;
//! for (skin, _) in document.skins().iter().enumerate() {
//!     let joints = pose.joint_matrices(skin).unwrap_or_default();
//!     println!("skin {} has {} joint matrices", skin, joints.len());
//! }
//! # Ok::<(), nether_gltf::GltfError>(())
//! ```

pub mod accessor;
pub mod animation;
pub mod config;
pub mod container;
pub mod document;
pub mod error;
pub mod extensions;
pub mod mesh;
pub mod morph;
pub mod playback;
pub mod pose;
pub mod scene;
pub mod schema;
pub mod skin;

use std::path::Path;

pub use accessor::{AccessorReader, AccessorType, ComponentType, Element, ElementLayout};
pub use animation::{AnimationClip, Evaluator, MAX_BAKED_FRAMES, Phase, bake_animation, evaluate};
pub use config::LoadOptions;
pub use document::Document;
pub use error::{GltfError, Result};
pub use extensions::{Extension, Extensions};
pub use mesh::{MeshInstance, PrimitiveData, bake_pose, morph_positions};
pub use playback::{Playback, PlaybackState};
pub use pose::{NodePose, Pose};
pub use scene::SceneGraph;

/// Load a document from `.gltf` or `.glb` bytes.
///
/// External buffers resolve against `options.base_dir`; without one only
/// embedded (GLB or data uri) buffers can be loaded.
pub fn load(data: &[u8], options: &LoadOptions) -> Result<Document> {
    if data.len() as u64 > options.max_file_bytes {
        return Err(GltfError::LimitExceeded {
            what: "input".into(),
            size: data.len() as u64,
            limit: options.max_file_bytes,
        });
    }
    let raw = container::read(data, options)?;
    finish(raw, options)
}

/// Load a document from disk. External buffers resolve next to the file.
pub fn load_path(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Document> {
    let path = path.as_ref();
    let raw = container::read_path(path, options)?;
    let document = finish(raw, options)?;
    tracing::debug!("Loaded {:?}", path);
    Ok(document)
}

fn finish(raw: container::RawAsset, options: &LoadOptions) -> Result<Document> {
    let document = document::build_document(raw, options)?;
    tracing::info!(
        "Loaded glTF {}: {} nodes, {} meshes, {} skins, {} animations, {} accessors",
        document.asset().version,
        document.nodes().len(),
        document.meshes().len(),
        document.skins().len(),
        document.animations().len(),
        document.accessors().len()
    );
    Ok(document)
}
