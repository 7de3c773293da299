//! Procedural clip baking for rigs that ship without authored animations

use glam::{Quat, Vec3};

use super::clip::{AnimationChannel, AnimationClip, ChannelPath, ClipError};
use super::sampler::{AnimationSampler, Interpolation, SamplerOutput};
use super::skeleton::Skeleton;

/// Bake a two-key clip that swings one joint from its bind rotation to
/// `angle` radians about `axis` and relies on playback wrapping to loop.
///
/// The joint's bind translation is pinned with a constant channel so the
/// swing never drifts the joint off its socket.
pub fn swing_clip(
    skeleton: &Skeleton,
    joint_index: usize,
    axis: Vec3,
    angle: f32,
    duration: f32,
) -> Result<AnimationClip, ClipError> {
    let joint = skeleton
        .joint(joint_index)
        .ok_or(ClipError::UnknownJoint(joint_index))?;
    let bind = *joint.bind_pose();
    let duration = duration.max(1e-3);

    let rot0 = bind.rotation;
    let rot1 = bind.rotation * Quat::from_axis_angle(axis.normalize_or_zero(), angle);

    let mut clip = AnimationClip::new(format!("swing:{}", joint.name));

    let rotation_sampler = clip.add_sampler(AnimationSampler::new(
        Interpolation::Linear,
        vec![0.0, duration],
        SamplerOutput::Quat(vec![rot0, rot1]),
    ))?;
    clip.add_channel(AnimationChannel {
        path: ChannelPath::Rotation,
        joint_index,
        sampler_index: rotation_sampler,
    })?;

    let translation_sampler = clip.add_sampler(AnimationSampler::new(
        Interpolation::Linear,
        vec![0.0, duration],
        SamplerOutput::Vec3(vec![bind.translation, bind.translation]),
    ))?;
    clip.add_channel(AnimationChannel {
        path: ChannelPath::Translation,
        joint_index,
        sampler_index: translation_sampler,
    })?;

    Ok(clip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    fn two_joint_rig() -> Skeleton {
        let mut skeleton = Skeleton::new();
        let root = skeleton
            .add_joint(None, "root", Mat4::from_translation(Vec3::Y))
            .unwrap();
        skeleton
            .add_joint(Some(root), "arm", Mat4::from_translation(Vec3::X))
            .unwrap();
        skeleton
    }

    #[test]
    fn test_swing_starts_at_bind_pose() {
        let skeleton = two_joint_rig();
        let clip = swing_clip(&skeleton, 1, Vec3::Z, 1.0, 2.0).unwrap();

        let bind = *skeleton.joint(1).unwrap().bind_pose();
        let pose = clip.sample_joint_pose(1, &bind, 0.0);

        assert!((pose.translation - bind.translation).length() < 1e-5);
        assert!(pose.rotation.dot(bind.rotation).abs() > 1.0 - 1e-5);
    }

    #[test]
    fn test_swing_reaches_target_angle() {
        let skeleton = two_joint_rig();
        let angle = std::f32::consts::FRAC_PI_2;
        let clip = swing_clip(&skeleton, 1, Vec3::Z, angle, 2.0).unwrap();

        let bind = *skeleton.joint(1).unwrap().bind_pose();
        let pose = clip.sample_joint_pose(1, &bind, 2.0);

        let expected = bind.rotation * Quat::from_rotation_z(angle);
        assert!(pose.rotation.dot(expected).abs() > 1.0 - 1e-4);
    }

    #[test]
    fn test_swing_duration_sets_time_range() {
        let skeleton = two_joint_rig();
        let clip = swing_clip(&skeleton, 0, Vec3::X, 0.5, 3.0).unwrap();
        assert!((clip.start_time() - 0.0).abs() < 1e-6);
        assert!((clip.end_time() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_swing_rejects_unknown_joint() {
        let skeleton = two_joint_rig();
        let result = swing_clip(&skeleton, 9, Vec3::Z, 1.0, 2.0);
        assert_eq!(result.unwrap_err(), ClipError::UnknownJoint(9));
    }
}
