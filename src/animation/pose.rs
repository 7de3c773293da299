//! Decomposed local joint transforms

use glam::{Mat4, Quat, Vec3};

/// A joint's local transform as separate translation, rotation and scale.
///
/// Keeping the components separate lets channels overwrite one property
/// without disturbing the others, and lets two poses blend component-wise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JointPose {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl JointPose {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Decompose an affine matrix into TRS components.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Recompose into a matrix (scale applied first, then rotation, then translation).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Blend two poses: lerp translation and scale, slerp rotation.
    ///
    /// `alpha` = 0 returns `a`, `alpha` = 1 returns `b`. Out-of-range values
    /// are clamped.
    pub fn blend(a: &Self, b: &Self, alpha: f32) -> Self {
        let alpha = alpha.clamp(0.0, 1.0);
        Self {
            translation: a.translation.lerp(b.translation, alpha),
            rotation: a.rotation.slerp(b.rotation, alpha),
            scale: a.scale.lerp(b.scale, alpha),
        }
    }
}

impl Default for JointPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_round_trip() {
        let pose = JointPose::IDENTITY;
        assert_eq!(pose.to_matrix(), Mat4::IDENTITY);

        let back = JointPose::from_matrix(&Mat4::IDENTITY);
        assert_eq!(back, JointPose::IDENTITY);
    }

    #[test]
    fn test_matrix_round_trip() {
        let pose = JointPose::new(
            Vec3::new(1.0, -2.0, 3.0),
            Quat::from_rotation_y(0.5),
            Vec3::new(2.0, 2.0, 2.0),
        );

        let back = JointPose::from_matrix(&pose.to_matrix());
        assert!((back.translation - pose.translation).length() < 1e-4);
        assert!((back.scale - pose.scale).length() < 1e-4);
        assert!(back.rotation.dot(pose.rotation).abs() > 1.0 - 1e-4);
    }

    #[test]
    fn test_blend_endpoints() {
        let a = JointPose::new(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        let b = JointPose::new(Vec3::new(10.0, 0.0, 0.0), Quat::from_rotation_z(1.0), Vec3::splat(3.0));

        assert_eq!(JointPose::blend(&a, &b, 0.0), a);
        let at_b = JointPose::blend(&a, &b, 1.0);
        assert!((at_b.translation - b.translation).length() < 1e-5);
        assert!((at_b.scale - b.scale).length() < 1e-5);
    }

    #[test]
    fn test_blend_midpoint() {
        let a = JointPose::new(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        let b = JointPose::new(Vec3::new(4.0, 0.0, 0.0), Quat::IDENTITY, Vec3::splat(3.0));

        let mid = JointPose::blend(&a, &b, 0.5);
        assert!((mid.translation - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);
        assert!((mid.scale - Vec3::splat(2.0)).length() < 1e-5);
    }

    #[test]
    fn test_blend_alpha_clamped() {
        let a = JointPose::new(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE);
        let b = JointPose::new(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY, Vec3::ONE);

        let below = JointPose::blend(&a, &b, -2.0);
        let above = JointPose::blend(&a, &b, 5.0);
        assert!((below.translation - a.translation).length() < 1e-6);
        assert!((above.translation - b.translation).length() < 1e-6);
    }

    #[test]
    fn test_blend_rotation_shortest_arc() {
        // 10 degrees vs 350 degrees about Z: the short way between them
        // crosses 0, so the midpoint should be the identity rotation.
        let a = JointPose::new(Vec3::ZERO, Quat::from_rotation_z(10f32.to_radians()), Vec3::ONE);
        let b = JointPose::new(Vec3::ZERO, Quat::from_rotation_z(350f32.to_radians()), Vec3::ONE);

        let mid = JointPose::blend(&a, &b, 0.5);
        let rotated = mid.rotation * Vec3::X;
        assert!((rotated - Vec3::X).length() < 1e-3);
    }

    #[test]
    fn test_blend_rotation_unit_norm() {
        let a = JointPose::new(Vec3::ZERO, Quat::from_rotation_x(0.3), Vec3::ONE);
        let b = JointPose::new(Vec3::ZERO, Quat::from_rotation_y(2.1), Vec3::ONE);

        for i in 0..=10 {
            let alpha = i as f32 / 10.0;
            let blended = JointPose::blend(&a, &b, alpha);
            assert!((blended.rotation.length() - 1.0).abs() < 1e-4);
        }
    }
}
