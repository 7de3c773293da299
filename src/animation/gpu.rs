//! GPU-ready skinning matrix palette

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use super::skeleton::{MAX_JOINTS, Skeleton};

/// One column-major 4x4 joint matrix as it lands in the shader constant
/// buffer. Column-major matches both glam's memory layout and HLSL's default
/// packing, so no transpose happens on upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuJointMatrix {
    pub columns: [[f32; 4]; 4],
}

impl GpuJointMatrix {
    pub fn identity() -> Self {
        Self::from_mat4(&Mat4::IDENTITY)
    }

    pub fn from_mat4(matrix: &Mat4) -> Self {
        Self {
            columns: matrix.to_cols_array_2d(),
        }
    }
}

/// Fixed-size skinning matrix array, sized to `MAX_JOINTS` so the host can
/// bind one constant buffer layout for every rig.
///
/// Slots past the skeleton's joint count stay identity.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct SkinningPalette {
    pub joints: [GpuJointMatrix; MAX_JOINTS],
}

impl SkinningPalette {
    pub fn new() -> Self {
        Self {
            joints: [GpuJointMatrix::identity(); MAX_JOINTS],
        }
    }

    /// Copy the skeleton's current skinning matrices into the palette.
    /// Joints beyond `MAX_JOINTS` are ignored; the skeleton enforces the cap
    /// at build time, so truncation here only guards foreign data.
    pub fn write(&mut self, skeleton: &Skeleton) {
        for (slot, matrix) in self
            .joints
            .iter_mut()
            .zip(skeleton.skinning_matrices().iter())
        {
            *slot = GpuJointMatrix::from_mat4(matrix);
        }
        for slot in self.joints.iter_mut().skip(skeleton.joint_count()) {
            *slot = GpuJointMatrix::identity();
        }
    }

    /// Raw bytes for buffer upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for SkinningPalette {
    fn default() -> Self {
        Self::new()
    }
}
