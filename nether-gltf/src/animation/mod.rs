//! Animation evaluation.
//!
//! An [`AnimationClip`] decodes the keyframes of one document animation once.
//! Evaluating it at a time produces a [`Pose`]: sampled channel values
//! override the rest TRS of their nodes, world transforms are propagated
//! through the scene graph, and joint matrices are computed for every skin.
//!
//! [`Evaluator`] walks the phases Idle → Sampling → Applied for each call,
//! and [`evaluate`] is the one-shot form.

mod bake;
mod sampler;

pub use bake::{MAX_BAKED_FRAMES, bake_animation};
pub use sampler::{Keyframes, Sample};

use glam::{Quat, Vec3};

use crate::document::{Document, Property, Trs};
use crate::error::{GltfError, Result};
use crate::pose::Pose;

/// One decoded channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipChannel {
    pub node: usize,
    pub property: Property,
    pub keyframes: Keyframes,
}

/// Value of a channel at one time.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValue {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
    Weights(Vec<f32>),
}

/// Decoded, ready-to-sample animation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    index: usize,
    name: Option<String>,
    channels: Vec<ClipChannel>,
    duration: f32,
}

impl AnimationClip {
    /// Decode animation `index` of `document`.
    pub fn new(document: &Document, index: usize) -> Result<Self> {
        let animation = document.animation(index)?;
        let mut channels = Vec::with_capacity(animation.channels.len());
        for channel in &animation.channels {
            let sampler = &animation.samplers[channel.sampler];
            let width = match channel.property {
                Property::Translation | Property::Scale => 3,
                Property::Rotation => 4,
                Property::Weights => document
                    .node(channel.node)?
                    .mesh
                    .map_or(0, |m| document.meshes()[m].target_count()),
            };
            channels.push(ClipChannel {
                node: channel.node,
                property: channel.property,
                keyframes: Keyframes::from_sampler(document, sampler, width)?,
            });
        }
        let duration = channels
            .iter()
            .map(|c| c.keyframes.end_time())
            .fold(0.0, f32::max);

        tracing::debug!(
            "Decoded animation {} '{}': {} channels, {:.3}s",
            index,
            animation.name.as_deref().unwrap_or("unnamed"),
            channels.len(),
            duration
        );

        Ok(Self {
            index,
            name: animation.name.clone(),
            channels,
            duration,
        })
    }

    /// Clip from already decoded channels (procedural animation).
    pub fn from_channels(name: Option<String>, channels: Vec<ClipChannel>) -> Self {
        let duration = channels
            .iter()
            .map(|c| c.keyframes.end_time())
            .fold(0.0, f32::max);
        Self {
            index: usize::MAX,
            name,
            channels,
            duration,
        }
    }

    /// Animation index in the source document (`usize::MAX` for procedural clips).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn channels(&self) -> &[ClipChannel] {
        &self.channels
    }

    /// Latest keyframe time over all channels.
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Map a caller time onto the clip: clamped to `[0, duration]`, or
    /// wrapped (Euclidean) when `looping`.
    pub fn local_time(&self, time: f32, looping: bool) -> Result<f32> {
        if !time.is_finite() {
            return Err(GltfError::validation("time", format!("is {}, expected a finite value", time)));
        }
        if self.duration <= 0.0 {
            return Ok(0.0);
        }
        Ok(if looping {
            time.rem_euclid(self.duration)
        } else {
            time.clamp(0.0, self.duration)
        })
    }

    /// Sample every channel at clip-local time `t`.
    pub fn sample(&self, t: f32) -> Vec<(usize, ChannelValue)> {
        self.channels
            .iter()
            .map(|channel| {
                let keys = &channel.keyframes;
                let value = match channel.property {
                    Property::Translation => ChannelValue::Translation(Vec3::from_slice(&keys.sample(t))),
                    Property::Scale => ChannelValue::Scale(Vec3::from_slice(&keys.sample(t))),
                    Property::Rotation => ChannelValue::Rotation(keys.sample_rotation(t)),
                    Property::Weights => ChannelValue::Weights(keys.sample(t).to_vec()),
                };
                (channel.node, value)
            })
            .collect()
    }

    /// Full pose at `time`.
    pub fn pose_at(&self, document: &Document, time: f32, looping: bool) -> Result<Pose> {
        let t = self.local_time(time, looping)?;
        let values = self.sample(t);
        apply(document, t, values)
    }
}

/// Write sampled values over the rest pose and resolve the hierarchy.
fn apply(document: &Document, t: f32, values: Vec<(usize, ChannelValue)>) -> Result<Pose> {
    let count = document.nodes().len();
    let mut locals: Vec<Option<Trs>> = vec![None; count];
    let mut weights: Vec<Option<Vec<f32>>> = vec![None; count];

    for (node, value) in values {
        let rest = || document.nodes()[node].transform.decomposed();
        match value {
            ChannelValue::Translation(v) => locals[node].get_or_insert_with(rest).translation = v,
            ChannelValue::Rotation(q) => locals[node].get_or_insert_with(rest).rotation = q,
            ChannelValue::Scale(v) => locals[node].get_or_insert_with(rest).scale = v,
            ChannelValue::Weights(w) => weights[node] = Some(w),
        }
    }

    Pose::assemble(document, t, locals, weights)
}

/// Evaluation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No evaluation in progress; the last pose (if any) is stale or unset
    Idle,
    /// Channels are being sampled
    Sampling,
    /// Samples written to the pose and the hierarchy resolved
    Applied,
}

/// Repeatedly evaluates one animation of a document.
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    document: &'a Document,
    clip: AnimationClip,
    phase: Phase,
    pose: Option<Pose>,
}

impl<'a> Evaluator<'a> {
    pub fn new(document: &'a Document, animation: usize) -> Result<Self> {
        Ok(Self {
            document,
            clip: AnimationClip::new(document, animation)?,
            phase: Phase::Idle,
            pose: None,
        })
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Last applied pose.
    pub fn pose(&self) -> Option<&Pose> {
        self.pose.as_ref()
    }

    /// Evaluate at `time`. On error the evaluator returns to Idle and the
    /// previous pose is dropped.
    pub fn evaluate(&mut self, time: f32, looping: bool) -> Result<&Pose> {
        self.pose = None;
        self.set_phase(Phase::Sampling);
        let sampled = self
            .clip
            .local_time(time, looping)
            .map(|t| (t, self.clip.sample(t)));
        let (t, values) = match sampled {
            Ok(sampled) => sampled,
            Err(e) => {
                self.set_phase(Phase::Idle);
                return Err(e);
            }
        };

        match apply(self.document, t, values) {
            Ok(pose) => {
                self.set_phase(Phase::Applied);
                Ok(self.pose.insert(pose))
            }
            Err(e) => {
                self.set_phase(Phase::Idle);
                Err(e)
            }
        }
    }

    /// Drop the current pose and return to Idle.
    pub fn reset(&mut self) {
        self.pose = None;
        self.set_phase(Phase::Idle);
    }

    fn set_phase(&mut self, phase: Phase) {
        tracing::trace!("animation {}: {:?} -> {:?}", self.clip.index(), self.phase, phase);
        self.phase = phase;
    }
}

/// Evaluate animation `animation` of `document` at `time` seconds.
///
/// Time is clamped to `[0, duration]`, or wrapped when `looping`.
pub fn evaluate(document: &Document, animation: usize, time: f32, looping: bool) -> Result<Pose> {
    AnimationClip::new(document, animation)?.pose_at(document, time, looping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_time() {
        let clip = AnimationClip {
            index: 0,
            name: None,
            channels: Vec::new(),
            duration: 2.0,
        };
        assert_eq!(clip.local_time(3.0, false).unwrap(), 2.0);
        assert_eq!(clip.local_time(-1.0, false).unwrap(), 0.0);
        assert_eq!(clip.local_time(3.0, true).unwrap(), 1.0);
        assert_eq!(clip.local_time(-0.5, true).unwrap(), 1.5);
        assert!(clip.local_time(f32::NAN, false).is_err());
    }

    #[test]
    fn test_zero_duration() {
        let clip = AnimationClip {
            index: 0,
            name: None,
            channels: Vec::new(),
            duration: 0.0,
        };
        assert_eq!(clip.local_time(5.0, true).unwrap(), 0.0);
    }
}
