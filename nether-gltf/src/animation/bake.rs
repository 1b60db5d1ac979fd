//! Fixed-rate sampling of a whole animation.

use rayon::prelude::*;

use super::AnimationClip;
use crate::document::Document;
use crate::error::{GltfError, Result};
use crate::pose::Pose;

/// Upper bound on the frames one bake may produce.
pub const MAX_BAKED_FRAMES: u64 = 1 << 20;

/// Sample `animation` at `frame_rate` frames per second.
///
/// Produces `ceil(duration × frame_rate)` poses (at least one), frame `i` at
/// `i / frame_rate` seconds. Frames are evaluated in parallel against the
/// shared read-only document. More than [`MAX_BAKED_FRAMES`] frames is a
/// `LimitExceeded` error.
pub fn bake_animation(
    document: &Document,
    animation: usize,
    frame_rate: f32,
    looping: bool,
) -> Result<Vec<Pose>> {
    if !frame_rate.is_finite() || frame_rate <= 0.0 {
        return Err(GltfError::validation(
            "frame_rate",
            format!("is {}, expected a positive value", frame_rate),
        ));
    }

    let clip = AnimationClip::new(document, animation)?;
    let frames = f64::from((clip.duration() * frame_rate).ceil());
    if !frames.is_finite() || frames > MAX_BAKED_FRAMES as f64 {
        return Err(GltfError::LimitExceeded {
            what: format!("baked frames of animation {}", animation),
            size: if frames.is_finite() { frames as u64 } else { u64::MAX },
            limit: MAX_BAKED_FRAMES,
        });
    }
    let frame_count = (frames as usize).max(1);

    tracing::debug!(
        "Baking animation '{}': {} frames at {} fps ({:.2}s)",
        clip.name().unwrap_or("unnamed"),
        frame_count,
        frame_rate,
        clip.duration()
    );

    (0..frame_count)
        .into_par_iter()
        .map(|frame| clip.pose_at(document, frame as f32 / frame_rate, looping))
        .collect()
}
