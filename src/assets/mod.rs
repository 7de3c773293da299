//! Asset import

pub mod gltf;

pub use gltf::{GltfError, load_skeleton, load_skeleton_from_slice, skeleton_from_gltf};
