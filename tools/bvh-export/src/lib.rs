//! bvh-export library
//!
//! Loads rig description files and bakes their animation clips to BVH, for
//! use by the `bvh-export` binary and by tools that batch exports.

pub mod bake;
pub mod manifest;
pub mod selection;

pub use bake::{BakedClip, ExportOptions, bake, bake_file, check};
pub use manifest::{LoadedRig, RigManifest, load_rig};
pub use selection::{MotionInfo, list_motions, select_root, select_state};
