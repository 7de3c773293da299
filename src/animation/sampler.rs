//! Keyframe samplers: timestamp search and value interpolation

use glam::{Quat, Vec3};

/// Keyframe interpolation mode, mirroring the glTF sampler modes.
///
/// Only `Linear` and `Step` are evaluated; `CubicSpline` data is rejected at
/// import time because its output layout (in-tangent, value, out-tangent)
/// is never loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    CubicSpline,
}

/// Keyframe values for one sampler, typed by the channel path that uses it.
#[derive(Clone, Debug, PartialEq)]
pub enum SamplerOutput {
    /// Translation or scale keys.
    Vec3(Vec<Vec3>),
    /// Rotation keys, unit quaternions.
    Quat(Vec<Quat>),
}

impl SamplerOutput {
    pub fn len(&self) -> usize {
        match self {
            SamplerOutput::Vec3(values) => values.len(),
            SamplerOutput::Quat(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single animation curve: keyframe timestamps plus typed values.
///
/// Timestamps are seconds, non-decreasing, with one value per timestamp.
/// Those invariants are enforced when the sampler is added to a clip, so
/// evaluation never has to re-validate them.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationSampler {
    pub interpolation: Interpolation,
    pub timestamps: Vec<f32>,
    pub output: SamplerOutput,
}

impl AnimationSampler {
    pub fn new(interpolation: Interpolation, timestamps: Vec<f32>, output: SamplerOutput) -> Self {
        Self {
            interpolation,
            timestamps,
            output,
        }
    }

    /// Number of usable keyframes.
    pub fn key_count(&self) -> usize {
        self.timestamps.len().min(self.output.len())
    }

    /// Time of the first keyframe, if any.
    pub fn start_time(&self) -> Option<f32> {
        self.timestamps.first().copied()
    }

    /// Time of the last keyframe, if any.
    pub fn end_time(&self) -> Option<f32> {
        self.timestamps.last().copied()
    }

    /// Sample a translation/scale curve at `time`. Returns `None` when the
    /// sampler holds no vec3 keys.
    pub fn sample_vec3(&self, time: f32) -> Option<Vec3> {
        let SamplerOutput::Vec3(values) = &self.output else {
            return None;
        };
        let (prev, next, frac) = self.segment(time)?;
        Some(values[prev].lerp(values[next], frac))
    }

    /// Sample a rotation curve at `time`. Returns `None` when the sampler
    /// holds no quaternion keys. Interpolates along the shortest arc and
    /// always returns a unit quaternion.
    pub fn sample_rotation(&self, time: f32) -> Option<Quat> {
        let SamplerOutput::Quat(values) = &self.output else {
            return None;
        };
        let (prev, next, frac) = self.segment(time)?;

        let a = values[prev];
        let mut b = values[next];
        // Force the shortest interpolation arc.
        if a.dot(b) < 0.0 {
            b = -b;
        }
        Some(a.slerp(b, frac).normalize())
    }

    /// Locate the keyframe pair bracketing `time` and the interpolation
    /// fraction between them.
    ///
    /// Queries before the first key or after the last clamp to the boundary
    /// value; zero-length key spans produce fraction 0 instead of dividing
    /// by zero. Returns `None` only for an empty sampler.
    fn segment(&self, time: f32) -> Option<(usize, usize, f32)> {
        let count = self.key_count();
        if count == 0 {
            return None;
        }

        let times = &self.timestamps[..count];
        // Upper bound: first timestamp strictly greater than `time`.
        let upper = times.partition_point(|&ts| ts <= time);
        let prev = upper.saturating_sub(1);
        let next = (prev + 1).min(count - 1);

        let span = times[next] - times[prev];
        let frac = if span > 0.0 {
            ((time - times[prev]) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let frac = match self.interpolation {
            Interpolation::Step => 0.0,
            _ => frac,
        };

        Some((prev, next, frac))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec3_sampler(interpolation: Interpolation, keys: &[(f32, Vec3)]) -> AnimationSampler {
        AnimationSampler::new(
            interpolation,
            keys.iter().map(|(t, _)| *t).collect(),
            SamplerOutput::Vec3(keys.iter().map(|(_, v)| *v).collect()),
        )
    }

    #[test]
    fn test_sample_midpoint() {
        let sampler = vec3_sampler(
            Interpolation::Linear,
            &[(0.0, Vec3::ZERO), (2.0, Vec3::new(10.0, 0.0, 0.0))],
        );

        let value = sampler.sample_vec3(1.0).unwrap();
        assert!((value - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn test_sample_boundary_clamps() {
        let sampler = vec3_sampler(
            Interpolation::Linear,
            &[(1.0, Vec3::new(1.0, 0.0, 0.0)), (3.0, Vec3::new(5.0, 0.0, 0.0))],
        );

        // Exactly on the keys.
        assert!((sampler.sample_vec3(1.0).unwrap() - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
        assert!((sampler.sample_vec3(3.0).unwrap() - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-5);

        // Before the first key and after the last.
        assert!((sampler.sample_vec3(-10.0).unwrap() - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
        assert!((sampler.sample_vec3(99.0).unwrap() - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_single_keyframe() {
        let sampler = vec3_sampler(Interpolation::Linear, &[(0.5, Vec3::new(2.0, 3.0, 4.0))]);

        for t in [-1.0, 0.0, 0.5, 100.0] {
            let value = sampler.sample_vec3(t).unwrap();
            assert!((value - Vec3::new(2.0, 3.0, 4.0)).length() < 1e-6);
        }
    }

    #[test]
    fn test_duplicate_timestamps_no_division_by_zero() {
        let sampler = vec3_sampler(
            Interpolation::Linear,
            &[
                (1.0, Vec3::ZERO),
                (1.0, Vec3::new(8.0, 0.0, 0.0)),
                (2.0, Vec3::new(8.0, 0.0, 0.0)),
            ],
        );

        // Query inside the duplicate span holds the earlier value.
        let value = sampler.sample_vec3(1.0).unwrap();
        assert!(value.is_finite());
    }

    #[test]
    fn test_step_holds_previous_key() {
        let sampler = vec3_sampler(
            Interpolation::Step,
            &[(0.0, Vec3::ZERO), (1.0, Vec3::new(10.0, 0.0, 0.0))],
        );

        let value = sampler.sample_vec3(0.9).unwrap();
        assert!((value - Vec3::ZERO).length() < 1e-6);

        let value = sampler.sample_vec3(1.0).unwrap();
        assert!((value - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_empty_sampler_returns_none() {
        let sampler = AnimationSampler::new(Interpolation::Linear, Vec::new(), SamplerOutput::Vec3(Vec::new()));
        assert!(sampler.sample_vec3(0.0).is_none());
    }

    #[test]
    fn test_wrong_output_type_returns_none() {
        let sampler = vec3_sampler(Interpolation::Linear, &[(0.0, Vec3::ZERO)]);
        assert!(sampler.sample_rotation(0.0).is_none());
    }

    #[test]
    fn test_rotation_unit_norm_between_keys() {
        let sampler = AnimationSampler::new(
            Interpolation::Linear,
            vec![0.0, 1.0],
            SamplerOutput::Quat(vec![
                Quat::from_rotation_x(0.2),
                Quat::from_rotation_y(2.5),
            ]),
        );

        for i in 0..=20 {
            let q = sampler.sample_rotation(i as f32 / 20.0).unwrap();
            assert!((q.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_rotation_shortest_arc() {
        // Keys at +10 and +350 degrees about Z; the midpoint along the
        // shortest arc is the identity rotation, not a half-turn.
        let sampler = AnimationSampler::new(
            Interpolation::Linear,
            vec![0.0, 1.0],
            SamplerOutput::Quat(vec![
                Quat::from_rotation_z(10f32.to_radians()),
                Quat::from_rotation_z(350f32.to_radians()),
            ]),
        );

        let q = sampler.sample_rotation(0.5).unwrap();
        let rotated = q * Vec3::X;
        assert!((rotated - Vec3::X).length() < 1e-3);
    }
}
