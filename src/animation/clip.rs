//! Animation clips: channels binding keyframe samplers to joints

use log::warn;
use thiserror::Error;

use super::pose::JointPose;
use super::sampler::{AnimationSampler, SamplerOutput};

/// Which TRS component a channel drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelPath {
    Translation,
    Rotation,
    Scale,
}

/// Binds one sampler to one joint property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationChannel {
    pub path: ChannelPath,
    /// Index of the targeted joint in the owning skeleton's joint list.
    pub joint_index: usize,
    /// Index of the keyframe sampler in the owning clip.
    pub sampler_index: usize,
}

/// Structural errors raised while building a clip.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClipError {
    #[error("sampler has no keyframes")]
    EmptySampler,

    #[error("sampler has {timestamps} timestamps but {values} values")]
    KeyCountMismatch { timestamps: usize, values: usize },

    #[error("sampler timestamps are not in non-decreasing order")]
    UnsortedTimestamps,

    #[error("channel references sampler {sampler_index} but the clip has {sampler_count} samplers")]
    SamplerOutOfBounds {
        sampler_index: usize,
        sampler_count: usize,
    },

    #[error("channel path {path:?} does not match the sampler's value type")]
    PathTypeMismatch { path: ChannelPath },

    #[error("joint index {0} does not exist")]
    UnknownJoint(usize),
}

/// A single animation clip.
///
/// Samplers own the keyframe data; channels map samplers onto joint TRS
/// properties. Both are immutable once the clip is handed to a skeleton.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    samplers: Vec<AnimationSampler>,
    channels: Vec<AnimationChannel>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            samplers: Vec::new(),
            channels: Vec::new(),
        }
    }

    /// Add a sampler after validating its keyframe invariants.
    /// Returns the sampler's index for wiring channels.
    pub fn add_sampler(&mut self, sampler: AnimationSampler) -> Result<usize, ClipError> {
        if sampler.timestamps.is_empty() || sampler.output.is_empty() {
            return Err(ClipError::EmptySampler);
        }
        if sampler.timestamps.len() != sampler.output.len() {
            return Err(ClipError::KeyCountMismatch {
                timestamps: sampler.timestamps.len(),
                values: sampler.output.len(),
            });
        }
        if sampler.timestamps.windows(2).any(|w| w[1] < w[0]) {
            return Err(ClipError::UnsortedTimestamps);
        }

        let index = self.samplers.len();
        self.samplers.push(sampler);
        Ok(index)
    }

    /// Add a channel. The referenced sampler must exist and carry values of
    /// the type the channel path consumes (vec3 for translation/scale,
    /// quaternion for rotation). Joint validity is checked by the skeleton
    /// when the clip is registered.
    pub fn add_channel(&mut self, channel: AnimationChannel) -> Result<(), ClipError> {
        let Some(sampler) = self.samplers.get(channel.sampler_index) else {
            return Err(ClipError::SamplerOutOfBounds {
                sampler_index: channel.sampler_index,
                sampler_count: self.samplers.len(),
            });
        };

        let matches = matches!(
            (channel.path, &sampler.output),
            (ChannelPath::Translation | ChannelPath::Scale, SamplerOutput::Vec3(_))
                | (ChannelPath::Rotation, SamplerOutput::Quat(_))
        );
        if !matches {
            return Err(ClipError::PathTypeMismatch { path: channel.path });
        }

        self.channels.push(channel);
        Ok(())
    }

    pub fn samplers(&self) -> &[AnimationSampler] {
        &self.samplers
    }

    pub fn channels(&self) -> &[AnimationChannel] {
        &self.channels
    }

    /// Drop channels targeting joints outside `joint_count`. Called when the
    /// clip is registered with a skeleton so evaluation never sees a stale
    /// joint reference.
    pub(crate) fn retain_valid_joints(&mut self, joint_count: usize) {
        self.channels.retain(|channel| {
            if channel.joint_index < joint_count {
                true
            } else {
                warn!(
                    "clip '{}': dropping channel for joint {} ({} joints in skeleton)",
                    self.name, channel.joint_index, joint_count
                );
                false
            }
        });
    }

    /// Earliest keyframe time across all samplers, 0.0 for an empty clip.
    pub fn start_time(&self) -> f32 {
        let earliest = self
            .samplers
            .iter()
            .filter_map(AnimationSampler::start_time)
            .fold(f32::INFINITY, f32::min);
        if earliest.is_finite() { earliest } else { 0.0 }
    }

    /// Latest keyframe time across all samplers, 0.0 for an empty clip.
    pub fn end_time(&self) -> f32 {
        self.samplers
            .iter()
            .filter_map(AnimationSampler::end_time)
            .fold(0.0_f32, f32::max)
    }

    /// Playable length in seconds.
    pub fn duration(&self) -> f32 {
        (self.end_time() - self.start_time()).max(0.0)
    }

    /// Evaluate this clip's local pose for one joint at `time`.
    ///
    /// Starts from the joint's bind pose and overwrites each TRS component
    /// for which a channel targets this joint. Channels for other joints are
    /// skipped; channel counts are small enough that the full scan is fine.
    pub fn sample_joint_pose(&self, joint_index: usize, bind_pose: &JointPose, time: f32) -> JointPose {
        let mut pose = *bind_pose;

        for channel in &self.channels {
            if channel.joint_index != joint_index {
                continue;
            }
            let Some(sampler) = self.samplers.get(channel.sampler_index) else {
                continue;
            };

            match channel.path {
                ChannelPath::Translation => {
                    if let Some(value) = sampler.sample_vec3(time) {
                        pose.translation = value;
                    }
                }
                ChannelPath::Rotation => {
                    if let Some(value) = sampler.sample_rotation(time) {
                        pose.rotation = value;
                    }
                }
                ChannelPath::Scale => {
                    if let Some(value) = sampler.sample_vec3(time) {
                        pose.scale = value;
                    }
                }
            }
        }

        pose
    }
}
