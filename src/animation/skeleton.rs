//! Joint hierarchy, playback state machine, and per-frame pose evaluation

use glam::Mat4;
use log::warn;
use thiserror::Error;

use super::clip::AnimationClip;
use super::pose::JointPose;

/// Maximum joints per skeleton, sized for the GPU skinning matrix array.
pub const MAX_JOINTS: usize = 100;

/// Blended durations shorter than this fall back to 1.0 to avoid dividing
/// the frame delta by zero.
const DURATION_EPSILON: f32 = 1e-5;

/// A single joint in the hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub struct Joint {
    /// Debug label.
    pub name: String,
    /// Transform relative to the parent at bind time.
    pub local_bind_transform: Mat4,
    /// Model space to joint space at bind time.
    pub inverse_bind_matrix: Mat4,
    /// Child joint indices into the skeleton's joint list.
    pub children: Vec<usize>,
    /// Model-space transform for the current frame, written by `update`.
    pub final_transform: Mat4,
    /// Cached decomposition of the bind transform so per-frame evaluation
    /// never re-decomposes matrices.
    bind_pose: JointPose,
}

impl Joint {
    pub fn new(name: impl Into<String>, local_bind_transform: Mat4, inverse_bind_matrix: Mat4) -> Self {
        Self {
            name: name.into(),
            local_bind_transform,
            inverse_bind_matrix,
            children: Vec::new(),
            final_transform: Mat4::IDENTITY,
            bind_pose: JointPose::from_matrix(&local_bind_transform),
        }
    }

    /// Build a joint from an already-decomposed bind pose, avoiding a
    /// decompose/recompose round trip for loaders that have TRS on hand.
    pub fn from_bind_pose(name: impl Into<String>, bind_pose: JointPose, inverse_bind_matrix: Mat4) -> Self {
        Self {
            name: name.into(),
            local_bind_transform: bind_pose.to_matrix(),
            inverse_bind_matrix,
            children: Vec::new(),
            final_transform: Mat4::IDENTITY,
            bind_pose,
        }
    }

    pub fn bind_pose(&self) -> &JointPose {
        &self.bind_pose
    }
}

/// Current playback state. `update` advances the active state's clock but
/// never transitions between states.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Playback {
    /// No clip set; every joint holds its bind transform.
    Bind,
    /// A single clip advancing in its own time domain, wrapping from the
    /// clip's end back to its start.
    Clip { index: usize, time: f32 },
    /// Two clips driven by a shared normalized phase and blended by alpha
    /// (0 = fully `a`, 1 = fully `b`).
    Blend {
        a: usize,
        b: usize,
        alpha: f32,
        phase: f32,
    },
}

/// Rejected playback requests. State is left untouched on error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("animation index {index} out of range ({count} clips loaded)")]
    ClipOutOfBounds { index: usize, count: usize },

    #[error("no blend is active")]
    NotBlending,
}

/// Structural errors raised while building a skeleton.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SkeletonError {
    #[error("maximum joint count {MAX_JOINTS} exceeded")]
    TooManyJoints,

    #[error("parent joint index {0} does not exist")]
    InvalidParent(usize),

    #[error("child index {child} of joint {parent} is out of range")]
    InvalidChild { parent: usize, child: usize },

    #[error("joint {0} has more than one parent")]
    MultipleParents(usize),

    #[error("joint hierarchy contains a cycle")]
    CyclicHierarchy,
}

/// Joint arena plus the animation clips loaded for it.
///
/// Joints are owned by index in a flat list; parent/child links are indices
/// into that list, never pointers, so the hierarchy is trivially clonable
/// and serializable. Evaluation mutates only `final_transform`, the skinning
/// matrix array, and the playback clock.
#[derive(Clone, Debug, PartialEq)]
pub struct Skeleton {
    joints: Vec<Joint>,
    root_joint_indices: Vec<usize>,
    skinning_matrices: Vec<Mat4>,
    animations: Vec<AnimationClip>,
    playback: Playback,
    root_transform: Mat4,
}

impl Skeleton {
    pub fn new() -> Self {
        Self {
            joints: Vec::new(),
            root_joint_indices: Vec::new(),
            skinning_matrices: Vec::new(),
            animations: Vec::new(),
            playback: Playback::Bind,
            root_transform: Mat4::IDENTITY,
        }
    }

    /// Build a skeleton from joints whose `children` lists are already
    /// wired. Validates that the graph is a forest: every child index in
    /// range, at most one parent per joint, no cycles. Root indices are
    /// derived from the joints nothing points at.
    pub fn from_joints(joints: Vec<Joint>) -> Result<Self, SkeletonError> {
        if joints.len() > MAX_JOINTS {
            return Err(SkeletonError::TooManyJoints);
        }

        let mut parent_count = vec![0usize; joints.len()];
        for (parent, joint) in joints.iter().enumerate() {
            for &child in &joint.children {
                if child >= joints.len() {
                    return Err(SkeletonError::InvalidChild { parent, child });
                }
                parent_count[child] += 1;
                if parent_count[child] > 1 {
                    return Err(SkeletonError::MultipleParents(child));
                }
            }
        }

        let root_joint_indices: Vec<usize> = (0..joints.len())
            .filter(|&i| parent_count[i] == 0)
            .collect();

        // With single parents established, a cycle is exactly the case where
        // some joint is unreachable from any root.
        let mut visited = vec![false; joints.len()];
        let mut stack: Vec<usize> = root_joint_indices.clone();
        while let Some(index) = stack.pop() {
            if visited[index] {
                continue;
            }
            visited[index] = true;
            stack.extend_from_slice(&joints[index].children);
        }
        if visited.iter().any(|&seen| !seen) {
            return Err(SkeletonError::CyclicHierarchy);
        }

        let skinning_matrices = vec![Mat4::IDENTITY; joints.len()];
        Ok(Self {
            joints,
            root_joint_indices,
            skinning_matrices,
            animations: Vec::new(),
            playback: Playback::Bind,
            root_transform: Mat4::IDENTITY,
        })
    }

    /// Append a joint, deriving its inverse bind matrix from the accumulated
    /// world-space bind pose. `parent` of `None` makes it a root.
    pub fn add_joint(
        &mut self,
        parent: Option<usize>,
        name: impl Into<String>,
        local_bind_transform: Mat4,
    ) -> Result<usize, SkeletonError> {
        let world_bind = match parent {
            Some(parent_index) => {
                self.world_bind_pose(parent_index)
                    .ok_or(SkeletonError::InvalidParent(parent_index))?
                    * local_bind_transform
            }
            None => local_bind_transform,
        };
        self.add_joint_with_inverse(parent, name, local_bind_transform, world_bind.inverse())
    }

    /// Append a joint with an explicit inverse bind matrix.
    pub fn add_joint_with_inverse(
        &mut self,
        parent: Option<usize>,
        name: impl Into<String>,
        local_bind_transform: Mat4,
        inverse_bind_matrix: Mat4,
    ) -> Result<usize, SkeletonError> {
        if self.joints.len() >= MAX_JOINTS {
            return Err(SkeletonError::TooManyJoints);
        }
        if let Some(parent_index) = parent {
            if parent_index >= self.joints.len() {
                return Err(SkeletonError::InvalidParent(parent_index));
            }
        }

        let index = self.joints.len();
        self.joints
            .push(Joint::new(name, local_bind_transform, inverse_bind_matrix));
        self.skinning_matrices.push(Mat4::IDENTITY);

        match parent {
            Some(parent_index) => self.joints[parent_index].children.push(index),
            None => self.root_joint_indices.push(index),
        }
        Ok(index)
    }

    /// Register a clip with this skeleton. Channels targeting joints the
    /// skeleton does not have are dropped here, never during evaluation.
    /// Returns the clip's index for `play_animation` / `set_blend`.
    pub fn add_animation(&mut self, mut clip: AnimationClip) -> usize {
        clip.retain_valid_joints(self.joints.len());
        let index = self.animations.len();
        self.animations.push(clip);
        index
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    pub fn root_joint_indices(&self) -> &[usize] {
        &self.root_joint_indices
    }

    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    pub fn animation(&self, index: usize) -> Option<&AnimationClip> {
        self.animations.get(index)
    }

    /// The clip currently playing in single-clip state, if any.
    pub fn current_animation(&self) -> Option<&AnimationClip> {
        match self.playback {
            Playback::Clip { index, .. } => self.animations.get(index),
            _ => None,
        }
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    /// Skinning matrices for the most recent `update`, parallel to `joints`.
    pub fn skinning_matrices(&self) -> &[Mat4] {
        &self.skinning_matrices
    }

    /// Model-level transform of the whole rig, for the host's world matrix.
    /// Not applied during joint propagation.
    pub fn root_transform(&self) -> Mat4 {
        self.root_transform
    }

    pub fn set_root_transform(&mut self, transform: Mat4) {
        self.root_transform = transform;
    }

    /// Switch to single-clip playback from the clip's start time.
    /// Out-of-range indices are rejected and leave the state unchanged.
    pub fn play_animation(&mut self, index: usize) -> Result<(), PlaybackError> {
        let Some(clip) = self.animations.get(index) else {
            return Err(PlaybackError::ClipOutOfBounds {
                index,
                count: self.animations.len(),
            });
        };
        self.playback = Playback::Clip {
            index,
            time: clip.start_time(),
        };
        Ok(())
    }

    /// Switch to two-clip blended playback. Alpha is clamped to [0, 1] and
    /// the shared phase restarts at 0. Both indices must be valid.
    pub fn set_blend(&mut self, a: usize, b: usize, alpha: f32) -> Result<(), PlaybackError> {
        for index in [a, b] {
            if index >= self.animations.len() {
                return Err(PlaybackError::ClipOutOfBounds {
                    index,
                    count: self.animations.len(),
                });
            }
        }
        self.playback = Playback::Blend {
            a,
            b,
            alpha: alpha.clamp(0.0, 1.0),
            phase: 0.0,
        };
        Ok(())
    }

    /// Adjust the mix of an active blend without restarting the phase.
    pub fn set_blend_alpha(&mut self, alpha: f32) -> Result<(), PlaybackError> {
        match &mut self.playback {
            Playback::Blend { alpha: current, .. } => {
                *current = alpha.clamp(0.0, 1.0);
                Ok(())
            }
            _ => Err(PlaybackError::NotBlending),
        }
    }

    /// Return to the bind pose.
    pub fn stop(&mut self) {
        self.playback = Playback::Bind;
    }

    /// Advance playback by `delta_time` seconds and re-evaluate every
    /// joint's model-space transform and skinning matrix.
    ///
    /// Total for every input: malformed hierarchies are skipped with a
    /// warning, degenerate durations substitute safe defaults, and an
    /// oversized delta simply advances the clock proportionally.
    pub fn update(&mut self, delta_time: f32) {
        self.advance_clock(delta_time);

        // Pre-order traversal, parents strictly before children. The visited
        // guard keeps a malformed hierarchy from looping forever.
        let mut visited = vec![false; self.joints.len()];
        let mut stack: Vec<(usize, Mat4)> = self
            .root_joint_indices
            .iter()
            .map(|&root| (root, Mat4::IDENTITY))
            .collect();

        while let Some((index, parent_transform)) = stack.pop() {
            if index >= self.joints.len() {
                warn!("skipping out-of-range joint index {index} during traversal");
                continue;
            }
            if visited[index] {
                warn!("joint {index} reached twice during traversal; skipping");
                continue;
            }
            visited[index] = true;

            let local = self.local_pose_matrix(index);
            let world = parent_transform * local;
            self.joints[index].final_transform = world;

            for &child in &self.joints[index].children {
                stack.push((child, world));
            }
        }

        for (index, joint) in self.joints.iter().enumerate() {
            self.skinning_matrices[index] = joint.final_transform * joint.inverse_bind_matrix;
        }
    }

    /// Accumulated model-space bind transform of one joint, found by
    /// walking down from the roots.
    fn world_bind_pose(&self, target: usize) -> Option<Mat4> {
        if target >= self.joints.len() {
            return None;
        }
        let mut visited = vec![false; self.joints.len()];
        let mut stack: Vec<(usize, Mat4)> = self
            .root_joint_indices
            .iter()
            .map(|&root| (root, Mat4::IDENTITY))
            .collect();
        while let Some((index, parent_transform)) = stack.pop() {
            if index >= self.joints.len() || visited[index] {
                continue;
            }
            visited[index] = true;
            let world = parent_transform * self.joints[index].local_bind_transform;
            if index == target {
                return Some(world);
            }
            for &child in &self.joints[index].children {
                stack.push((child, world));
            }
        }
        None
    }

    fn advance_clock(&mut self, delta_time: f32) {
        match &mut self.playback {
            Playback::Bind => {}
            Playback::Clip { index, time } => {
                if let Some(clip) = self.animations.get(*index) {
                    *time += delta_time;
                    if *time >= clip.end_time() {
                        *time = clip.start_time();
                    }
                }
            }
            Playback::Blend { a, b, alpha, phase } => {
                let (Some(clip_a), Some(clip_b)) =
                    (self.animations.get(*a), self.animations.get(*b))
                else {
                    return;
                };
                // Blending the two durations keeps clips of different
                // lengths in sync across the whole cycle.
                let duration = clip_a.duration() + (clip_b.duration() - clip_a.duration()) * *alpha;
                let duration = if duration < DURATION_EPSILON { 1.0 } else { duration };
                *phase = (*phase + delta_time / duration).rem_euclid(1.0);
            }
        }
    }

    /// Local pose for one joint under the current playback state.
    fn local_pose_matrix(&self, joint_index: usize) -> Mat4 {
        let joint = &self.joints[joint_index];
        match self.playback {
            // Bind transform returned as-is: no decompose/recompose drift.
            Playback::Bind => joint.local_bind_transform,
            Playback::Clip { index, time } => match self.animations.get(index) {
                Some(clip) => clip
                    .sample_joint_pose(joint_index, joint.bind_pose(), time)
                    .to_matrix(),
                None => joint.local_bind_transform,
            },
            Playback::Blend { a, b, alpha, phase } => {
                match (self.animations.get(a), self.animations.get(b)) {
                    (Some(clip_a), Some(clip_b)) => {
                        // Each clip maps the shared phase into its own time
                        // domain before sampling.
                        let time_a = clip_a.start_time() + phase * clip_a.duration();
                        let time_b = clip_b.start_time() + phase * clip_b.duration();
                        let pose_a = clip_a.sample_joint_pose(joint_index, joint.bind_pose(), time_a);
                        let pose_b = clip_b.sample_joint_pose(joint_index, joint.bind_pose(), time_b);
                        JointPose::blend(&pose_a, &pose_b, alpha).to_matrix()
                    }
                    (Some(clip), None) | (None, Some(clip)) => {
                        let time = clip.start_time() + phase * clip.duration();
                        clip.sample_joint_pose(joint_index, joint.bind_pose(), time)
                            .to_matrix()
                    }
                    (None, None) => joint.local_bind_transform,
                }
            }
        }
    }
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::new()
    }
}
