//! glTF rig import: skin, joints, inverse bind matrices, and animation clips
//!
//! Loading is all-or-nothing: a structurally broken file returns an error
//! instead of a half-built skeleton. Channels the runtime cannot evaluate
//! (morph targets, cubic-spline samplers) are skipped with a log line rather
//! than failing the whole import.

use std::collections::HashMap;
use std::path::Path;

use ::gltf::animation::util::ReadOutputs;
use ::gltf::animation::{Interpolation as GltfInterpolation, Property};
use ::gltf::buffer;
use ::gltf::Document;
use glam::{Mat4, Quat, Vec3};
use log::{debug, info, warn};
use thiserror::Error;

use crate::animation::clip::{AnimationChannel, AnimationClip, ChannelPath, ClipError};
use crate::animation::pose::JointPose;
use crate::animation::sampler::{AnimationSampler, Interpolation, SamplerOutput};
use crate::animation::skeleton::{Joint, MAX_JOINTS, Skeleton, SkeletonError};

#[derive(Debug, Error)]
pub enum GltfError {
    #[error("failed to read glTF document: {0}")]
    Import(#[from] ::gltf::Error),

    #[error("document contains no skin")]
    MissingSkin,

    #[error("skin has {0} joints, more than the supported {MAX_JOINTS}")]
    TooManyJoints(usize),

    #[error("accessor data missing or truncated: {0}")]
    MissingAccessorData(&'static str),

    #[error(transparent)]
    Skeleton(#[from] SkeletonError),

    #[error(transparent)]
    Clip(#[from] ClipError),
}

/// Load a skeleton and its clips from a `.gltf`/`.glb` file on disk.
pub fn load_skeleton(path: impl AsRef<Path>) -> Result<Skeleton, GltfError> {
    let path = path.as_ref();
    let (document, buffers, _images) = ::gltf::import(path)?;
    let skeleton = skeleton_from_gltf(&document, &buffers)?;
    info!(
        "loaded rig from {}: {} joints, {} clips",
        path.display(),
        skeleton.joint_count(),
        skeleton.animation_count()
    );
    Ok(skeleton)
}

/// Load a skeleton from in-memory glTF bytes (JSON or binary). External
/// buffer references are not resolved; embedded and GLB-packed buffers are.
pub fn load_skeleton_from_slice(bytes: &[u8]) -> Result<Skeleton, GltfError> {
    let (document, buffers, _images) = ::gltf::import_slice(bytes)?;
    skeleton_from_gltf(&document, &buffers)
}

/// Build a skeleton from an already-parsed document. Uses the first skin;
/// joint order follows the skin's joint list so skinning indices in the mesh
/// stay valid.
pub fn skeleton_from_gltf(
    document: &Document,
    buffers: &[buffer::Data],
) -> Result<Skeleton, GltfError> {
    let skin = document.skins().next().ok_or(GltfError::MissingSkin)?;

    let joint_nodes: Vec<_> = skin.joints().collect();
    if joint_nodes.len() > MAX_JOINTS {
        return Err(GltfError::TooManyJoints(joint_nodes.len()));
    }

    let node_to_joint: HashMap<usize, usize> = joint_nodes
        .iter()
        .enumerate()
        .map(|(joint_index, node)| (node.index(), joint_index))
        .collect();

    let inverse_binds = read_inverse_bind_matrices(&skin, buffers, joint_nodes.len())?;

    let mut joints = Vec::with_capacity(joint_nodes.len());
    for (node, inverse_bind) in joint_nodes.iter().zip(inverse_binds) {
        let (translation, rotation, scale) = node.transform().decomposed();
        let bind_pose = JointPose::new(
            Vec3::from(translation),
            Quat::from_array(rotation),
            Vec3::from(scale),
        );
        let name = node
            .name()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("joint_{}", node.index()));

        let mut joint = Joint::from_bind_pose(name, bind_pose, inverse_bind);
        // Children outside the skin (mesh attachments and the like) are not
        // part of the hierarchy we evaluate.
        joint.children = node
            .children()
            .filter_map(|child| node_to_joint.get(&child.index()).copied())
            .collect();
        joints.push(joint);
    }

    let mut skeleton = Skeleton::from_joints(joints)?;

    for animation in document.animations() {
        let clip = import_clip(&animation, buffers, &node_to_joint)?;
        skeleton.add_animation(clip);
    }

    Ok(skeleton)
}

fn read_inverse_bind_matrices(
    skin: &::gltf::Skin,
    buffers: &[buffer::Data],
    joint_count: usize,
) -> Result<Vec<Mat4>, GltfError> {
    let reader = skin.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    match reader.read_inverse_bind_matrices() {
        Some(iter) => {
            let matrices: Vec<Mat4> = iter.map(|m| Mat4::from_cols_array_2d(&m)).collect();
            if matrices.len() < joint_count {
                return Err(GltfError::MissingAccessorData("inverseBindMatrices"));
            }
            Ok(matrices)
        }
        // The accessor is optional; absence means every matrix is identity.
        None => Ok(vec![Mat4::IDENTITY; joint_count]),
    }
}

fn import_clip(
    animation: &::gltf::Animation,
    buffers: &[buffer::Data],
    node_to_joint: &HashMap<usize, usize>,
) -> Result<AnimationClip, GltfError> {
    let name = animation
        .name()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("clip_{}", animation.index()));
    let mut clip = AnimationClip::new(name);

    for channel in animation.channels() {
        let target_node = channel.target().node().index();
        let Some(&joint_index) = node_to_joint.get(&target_node) else {
            debug!(
                "clip '{}': channel targets node {} outside the skin, skipping",
                clip.name, target_node
            );
            continue;
        };

        let path = match channel.target().property() {
            Property::Translation => ChannelPath::Translation,
            Property::Rotation => ChannelPath::Rotation,
            Property::Scale => ChannelPath::Scale,
            Property::MorphTargetWeights => {
                warn!("clip '{}': morph target channel skipped", clip.name);
                continue;
            }
        };

        let interpolation = match channel.sampler().interpolation() {
            GltfInterpolation::Linear => Interpolation::Linear,
            GltfInterpolation::Step => Interpolation::Step,
            GltfInterpolation::CubicSpline => {
                warn!(
                    "clip '{}': cubic-spline channel for joint {} skipped",
                    clip.name, joint_index
                );
                continue;
            }
        };

        let reader =
            channel.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let timestamps: Vec<f32> = reader
            .read_inputs()
            .ok_or(GltfError::MissingAccessorData("animation input"))?
            .collect();
        let output = match reader
            .read_outputs()
            .ok_or(GltfError::MissingAccessorData("animation output"))?
        {
            ReadOutputs::Translations(iter) | ReadOutputs::Scales(iter) => {
                SamplerOutput::Vec3(iter.map(Vec3::from).collect())
            }
            ReadOutputs::Rotations(rotations) => SamplerOutput::Quat(
                rotations
                    .into_f32()
                    .map(|q| Quat::from_array(q).normalize())
                    .collect(),
            ),
            ReadOutputs::MorphTargetWeights(_) => {
                warn!("clip '{}': morph target weights skipped", clip.name);
                continue;
            }
        };

        let sampler_index = clip.add_sampler(AnimationSampler::new(interpolation, timestamps, output))?;
        clip.add_channel(AnimationChannel {
            path,
            joint_index,
            sampler_index,
        })?;
    }

    Ok(clip)
}
