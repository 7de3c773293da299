//! Skeletal animation: joint hierarchies, clip sampling, blending, skinning

pub mod authoring;
pub mod clip;
pub mod gpu;
pub mod pose;
pub mod sampler;
pub mod skeleton;

pub use authoring::swing_clip;
pub use clip::{AnimationChannel, AnimationClip, ChannelPath, ClipError};
pub use gpu::{GpuJointMatrix, SkinningPalette};
pub use pose::JointPose;
pub use sampler::{AnimationSampler, Interpolation, SamplerOutput};
pub use skeleton::{Joint, MAX_JOINTS, Playback, PlaybackError, Skeleton, SkeletonError};
