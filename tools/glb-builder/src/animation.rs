//! Animation track construction

use serde_json::{Value, json};

use crate::buffer::{AccessorIndex, BufferBuilder};

/// One channel's keyframes before packing
#[derive(Debug, Clone)]
struct Track {
    node: u32,
    path: &'static str,
    interpolation: &'static str,
    times: Vec<f32>,
    /// Flat values; 3 per key for VEC3, 4 for rotations, N for weights
    values: Vec<f32>,
    type_: &'static str,
}

/// Accessor indices for one packed track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackAccessors {
    pub node: u32,
    pub path: &'static str,
    pub interpolation: &'static str,
    pub input: AccessorIndex,
    pub output: AccessorIndex,
}

/// Accessor indices for animation data
#[derive(Debug, Clone)]
pub struct AnimationAccessors {
    pub tracks: Vec<TrackAccessors>,
}

impl AnimationAccessors {
    /// JSON animation with one sampler per track
    pub fn animation_json(&self, name: &str) -> Value {
        let samplers: Vec<Value> = self
            .tracks
            .iter()
            .map(|t| {
                json!({
                    "input": t.input.0,
                    "output": t.output.0,
                    "interpolation": t.interpolation,
                })
            })
            .collect();
        let channels: Vec<Value> = self
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| json!({"sampler": i, "target": {"node": t.node, "path": t.path}}))
            .collect();
        json!({"name": name, "samplers": samplers, "channels": channels})
    }
}

/// Builder for animation tracks
pub struct AnimationBuilder {
    tracks: Vec<Track>,
}

impl AnimationBuilder {
    pub fn new() -> Self {
        Self { tracks: Vec::new() }
    }

    /// Translation track for a node
    pub fn translations(mut self, node: u32, times: &[f32], values: &[[f32; 3]]) -> Self {
        self.push(node, "translation", "VEC3", times, values.as_flattened());
        self
    }

    /// Rotation track for a node, quaternions as [x, y, z, w]
    pub fn rotations(mut self, node: u32, times: &[f32], values: &[[f32; 4]]) -> Self {
        self.push(node, "rotation", "VEC4", times, values.as_flattened());
        self
    }

    /// Scale track for a node
    pub fn scales(mut self, node: u32, times: &[f32], values: &[[f32; 3]]) -> Self {
        self.push(node, "scale", "VEC3", times, values.as_flattened());
        self
    }

    /// Morph weight track; `values` holds target-count weights per key
    pub fn weights(mut self, node: u32, times: &[f32], values: &[f32]) -> Self {
        self.push(node, "weights", "SCALAR", times, values);
        self
    }

    /// Set interpolation of the most recently added track
    /// ("LINEAR", "STEP" or "CUBICSPLINE"). CUBICSPLINE values must hold
    /// in-tangent, value, out-tangent per key.
    pub fn interpolation(mut self, interpolation: &'static str) -> Self {
        if let Some(track) = self.tracks.last_mut() {
            track.interpolation = interpolation;
        }
        self
    }

    /// Get track count
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn push(&mut self, node: u32, path: &'static str, type_: &'static str, times: &[f32], values: &[f32]) {
        self.tracks.push(Track {
            node,
            path,
            interpolation: "LINEAR",
            times: times.to_vec(),
            values: values.to_vec(),
            type_,
        });
    }

    /// Build and pack into buffer
    pub fn build(self, buffer: &mut BufferBuilder) -> AnimationAccessors {
        let tracks = self
            .tracks
            .into_iter()
            .map(|track| {
                let input = buffer.pack_scalars_with_bounds(&track.times);
                let output = match track.type_ {
                    "VEC3" => buffer.pack_vec3(bytemuck::cast_slice(&track.values)),
                    "VEC4" => buffer.pack_vec4(bytemuck::cast_slice(&track.values)),
                    _ => buffer.pack_scalars(&track.values),
                };
                TrackAccessors {
                    node: track.node,
                    path: track.path,
                    interpolation: track.interpolation,
                    input,
                    output,
                }
            })
            .collect();
        AnimationAccessors { tracks }
    }
}

impl Default for AnimationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_animation_builder() {
        let mut buffer = BufferBuilder::new();
        let anim = AnimationBuilder::new()
            .translations(0, &[0.0, 1.0], &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]])
            .rotations(1, &[0.0, 1.0], &[[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]])
            .interpolation("STEP")
            .build(&mut buffer);

        assert_eq!(anim.tracks.len(), 2);
        assert_eq!(anim.tracks[0].input, AccessorIndex(0));
        assert_eq!(anim.tracks[0].output, AccessorIndex(1));
        assert_eq!(anim.tracks[1].interpolation, "STEP");

        let json = anim.animation_json("Walk");
        assert_eq!(json["channels"][1]["target"]["path"], "rotation");
        assert_eq!(json["samplers"][1]["interpolation"], "STEP");
    }
}
