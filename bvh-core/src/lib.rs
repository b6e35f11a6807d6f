//! bvh-core - humanoid rig to BVH motion export
//!
//! Extracts the skeleton of a humanoid rig from a scene graph, bakes an
//! animation clip frame by frame through an [`AnimationEvaluator`], and
//! writes the result as BVH text. The scene is left exactly as it was found.
//!
//! The pipeline, in order:
//! - [`classify`] decides which scene nodes are joints or end sites
//! - [`hierarchy`] builds the exported bone tree and its bind pose
//! - [`guard`] saves and restores the live scene around the bake
//! - [`sampler`] turns each posed frame into channel values
//! - [`writer`] formats HIERARCHY and MOTION text
//!
//! [`export::export`] drives all of it.

pub mod classify;
pub mod convert;
pub mod error;
pub mod evaluator;
pub mod export;
pub mod guard;
pub mod hierarchy;
pub mod humanoid;
pub mod keyframe;
pub mod sampler;
pub mod scene;
pub mod writer;

pub use convert::CoordinateConverter;
pub use error::ExportError;
pub use evaluator::{AnimationEvaluator, ClipInfo, CullingMode, PlaybackSettings, UpdateMode};
pub use export::{ExportConfig, ExportSummary, build_skeleton, export, resolve_root};
pub use hierarchy::{Bone, BoneId, BoneKind, Skeleton};
pub use humanoid::{HumanBone, HumanoidMap, SkeletonSource};
pub use keyframe::{KeyframeAnimator, KeyframeClip, NodeTrack};
pub use scene::{NodeId, Scene};
