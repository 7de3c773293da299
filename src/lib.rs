//! Foxrig - skeletal animation playback and skinning for glTF rigs

pub mod animation;
pub mod assets;
