//! Keyframe sampling: LINEAR, STEP and CUBICSPLINE.

use glam::Quat;
use smallvec::SmallVec;

use crate::document::{AnimationSampler, Document, Interpolation};
use crate::error::{GltfError, Result};

/// One sampled value (VEC3, quaternion, or a row of morph weights).
pub type Sample = SmallVec<[f32; 4]>;

/// Decoded keyframes of one animation sampler.
///
/// `values` is flat with `width` floats per keyframe value. CUBICSPLINE
/// samplers store three values per keyframe: in-tangent, value, out-tangent.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframes {
    times: Vec<f32>,
    values: Vec<f32>,
    width: usize,
    interpolation: Interpolation,
}

/// Bracketing keyframes for a time.
enum Bracket {
    /// Exactly on, before, or after the keyframe range
    At(usize),
    /// Strictly between `k` and `k + 1`; `s` in (0, 1), `dt` the interval
    Between { k: usize, s: f32, dt: f32 },
}

impl Keyframes {
    pub fn new(times: Vec<f32>, values: Vec<f32>, width: usize, interpolation: Interpolation) -> Result<Self> {
        let per_key = if interpolation == Interpolation::CubicSpline { 3 } else { 1 };
        if times.is_empty() || width == 0 || values.len() != times.len() * per_key * width {
            return Err(GltfError::validation(
                "keyframes",
                format!(
                    "{} values for {} times of width {} ({:?})",
                    values.len(),
                    times.len(),
                    width,
                    interpolation
                ),
            ));
        }
        Ok(Self {
            times,
            values,
            width,
            interpolation,
        })
    }

    /// Decode a document sampler. `width` is floats per value.
    pub fn from_sampler(document: &Document, sampler: &AnimationSampler, width: usize) -> Result<Self> {
        let times = document.reader(sampler.input)?.read_f32()?;
        let values = document.reader(sampler.output)?.read_flat_f32()?;
        Self::new(times, values, width, sampler.interpolation)
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Time of the last keyframe.
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    fn value(&self, k: usize) -> &[f32] {
        let slot = match self.interpolation {
            Interpolation::CubicSpline => k * 3 + 1,
            _ => k,
        };
        &self.values[slot * self.width..(slot + 1) * self.width]
    }

    fn in_tangent(&self, k: usize) -> &[f32] {
        let slot = k * 3;
        &self.values[slot * self.width..(slot + 1) * self.width]
    }

    fn out_tangent(&self, k: usize) -> &[f32] {
        let slot = k * 3 + 2;
        &self.values[slot * self.width..(slot + 1) * self.width]
    }

    fn bracket(&self, t: f32) -> Bracket {
        let last = self.times.len() - 1;
        if t <= self.times[0] {
            return Bracket::At(0);
        }
        if t >= self.times[last] {
            return Bracket::At(last);
        }
        // First keyframe strictly after t; t0 <= t < t1
        let next = self.times.partition_point(|&x| x <= t);
        let k = next - 1;
        let (t0, t1) = (self.times[k], self.times[next]);
        if t == t0 {
            return Bracket::At(k);
        }
        let dt = t1 - t0;
        Bracket::Between {
            k,
            s: (t - t0) / dt,
            dt,
        }
    }

    /// Sample component-wise at time `t` (clamped to the keyframe range).
    pub fn sample(&self, t: f32) -> Sample {
        match self.bracket(t) {
            Bracket::At(k) => Sample::from_slice(self.value(k)),
            Bracket::Between { k, s, dt } => match self.interpolation {
                Interpolation::Step => Sample::from_slice(self.value(k)),
                Interpolation::Linear => self
                    .value(k)
                    .iter()
                    .zip(self.value(k + 1))
                    .map(|(a, b)| a + (b - a) * s)
                    .collect(),
                Interpolation::CubicSpline => self.hermite(k, s, dt),
            },
        }
    }

    /// Sample a rotation: shortest-path slerp for LINEAR, renormalized
    /// Hermite for CUBICSPLINE.
    pub fn sample_rotation(&self, t: f32) -> Quat {
        match self.bracket(t) {
            Bracket::At(k) => quat(self.value(k)),
            Bracket::Between { k, s, dt } => match self.interpolation {
                Interpolation::Step => quat(self.value(k)),
                Interpolation::Linear => {
                    let a = quat(self.value(k));
                    let b = quat(self.value(k + 1));
                    a.normalize().slerp(b.normalize(), s)
                }
                Interpolation::CubicSpline => quat(&self.hermite(k, s, dt)).normalize(),
            },
        }
    }

    /// Cubic Hermite between keyframes `k` and `k + 1`, tangents scaled by `dt`.
    fn hermite(&self, k: usize, s: f32, dt: f32) -> Sample {
        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        let v0 = self.value(k);
        let b0 = self.out_tangent(k);
        let v1 = self.value(k + 1);
        let a1 = self.in_tangent(k + 1);
        (0..self.width)
            .map(|i| h00 * v0[i] + h10 * dt * b0[i] + h01 * v1[i] + h11 * dt * a1[i])
            .collect()
    }
}

fn quat(v: &[f32]) -> Quat {
    Quat::from_xyzw(v[0], v[1], v[2], v[3])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(times: &[f32], values: &[f32], width: usize) -> Keyframes {
        Keyframes::new(times.to_vec(), values.to_vec(), width, Interpolation::Linear).unwrap()
    }

    #[test]
    fn test_linear_midpoint() {
        let keys = linear(&[0.0, 1.0], &[0.0, 0.0, 0.0, 2.0, 4.0, 6.0], 3);
        assert_eq!(keys.sample(0.5).as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_exact_keyframe_is_exact() {
        let keys = linear(&[0.0, 0.1, 0.7], &[0.3, 1.0 / 3.0, 0.9], 1);
        assert_eq!(keys.sample(0.1)[0], 1.0 / 3.0);
        assert_eq!(keys.sample(0.7)[0], 0.9);
    }

    #[test]
    fn test_clamps_outside_range() {
        let keys = linear(&[1.0, 2.0], &[10.0, 20.0], 1);
        assert_eq!(keys.sample(0.0)[0], 10.0);
        assert_eq!(keys.sample(5.0)[0], 20.0);
    }

    #[test]
    fn test_step_holds_previous() {
        let keys = Keyframes::new(vec![0.0, 1.0], vec![1.0, 2.0], 1, Interpolation::Step).unwrap();
        assert_eq!(keys.sample(0.99)[0], 1.0);
        assert_eq!(keys.sample(1.0)[0], 2.0);
    }

    #[test]
    fn test_cubic_with_zero_tangents_is_smoothstep() {
        // [in, value, out] per keyframe
        let values = vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let keys = Keyframes::new(vec![0.0, 2.0], values, 1, Interpolation::CubicSpline).unwrap();
        assert_eq!(keys.sample(1.0)[0], 0.5);
        assert!((keys.sample(0.5)[0] - 0.15625).abs() < 1e-6);
    }

    #[test]
    fn test_cubic_tangents_scale_with_interval() {
        // Straight line with slope 1: v(t) = t, tangents 1
        let values = vec![1.0, 0.0, 1.0, 1.0, 2.0, 1.0];
        let keys = Keyframes::new(vec![0.0, 2.0], values, 1, Interpolation::CubicSpline).unwrap();
        assert!((keys.sample(0.5)[0] - 0.5).abs() < 1e-6);
        assert!((keys.sample(1.5)[0] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_slerp_shortest_path() {
        let a = Quat::IDENTITY;
        // -identity is the same rotation; slerp must not spin around
        let b = Quat::from_xyzw(0.0, 0.0, 0.0, -1.0);
        let values = [a.to_array(), b.to_array()].concat();
        let keys = linear(&[0.0, 1.0], &values, 4);
        let q = keys.sample_rotation(0.5);
        assert!(q.angle_between(Quat::IDENTITY) < 1e-3);
    }

    #[test]
    fn test_rotation_cubic_normalized() {
        let q = Quat::from_rotation_z(1.0).to_array();
        let zero = [0.0; 4];
        let values = [zero, Quat::IDENTITY.to_array(), zero, zero, q, zero].concat();
        let keys = Keyframes::new(vec![0.0, 1.0], values, 4, Interpolation::CubicSpline).unwrap();
        assert!((keys.sample_rotation(0.3).length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_value_count_checked() {
        assert!(Keyframes::new(vec![0.0, 1.0], vec![0.0; 3], 1, Interpolation::CubicSpline).is_err());
        assert!(Keyframes::new(vec![], vec![], 1, Interpolation::Linear).is_err());
    }
}
