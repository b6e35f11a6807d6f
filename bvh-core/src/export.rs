//! Export orchestration
//!
//! Validates the selection, builds the skeleton from the rest pose, writes
//! the HIERARCHY block, then bakes one motion row per frame while the scene
//! and playback state are held by a [`TransformGuard`].

use std::io::Write;

use crate::classify::MOTION_ROOT_NAME;
use crate::convert::CoordinateConverter;
use crate::error::ExportError;
use crate::evaluator::{AnimationEvaluator, PlaybackSettings};
use crate::guard::TransformGuard;
use crate::hierarchy::{HierarchyBuilder, Skeleton};
use crate::humanoid::SkeletonSource;
use crate::sampler::PoseSampler;
use crate::scene::{NodeId, Scene};
use crate::writer::BvhWriter;

/// Per-invocation export settings
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Clip to bake
    pub clip: String,
    /// Export root; `None` looks up the target's `Armature` child
    pub root: Option<NodeId>,
    /// Export the root's global displacement instead of its bind-relative pose
    pub root_motion: bool,
    /// Mirror into BVH's right-handed convention
    pub right_handed: bool,
}

impl ExportConfig {
    pub fn new(clip: impl Into<String>) -> Self {
        Self {
            clip: clip.into(),
            root: None,
            root_motion: false,
            right_handed: true,
        }
    }
}

/// What an export produced
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub frame_count: usize,
    pub frame_time: f64,
    pub joint_count: usize,
    pub end_site_count: usize,
    pub channel_count: usize,
}

/// Pick the export root under `target`
pub fn resolve_root(scene: &Scene, target: NodeId, root: Option<NodeId>) -> Result<NodeId, ExportError> {
    match root {
        Some(root) => {
            if scene.is_descendant_of(root, target) {
                Ok(root)
            } else {
                Err(ExportError::RootNotDescendant {
                    root: scene.name(root).to_string(),
                    target: scene.name(target).to_string(),
                })
            }
        }
        None => scene
            .find_child(target, MOTION_ROOT_NAME)
            .ok_or(ExportError::MissingDefaultRoot),
    }
}

/// Build the skeleton an export with `config` would write, without sampling
pub fn build_skeleton<S: SkeletonSource + ?Sized>(
    scene: &Scene,
    target: NodeId,
    skeleton: &S,
    config: &ExportConfig,
) -> Result<Skeleton, ExportError> {
    if !skeleton.is_humanoid() {
        return Err(ExportError::NotHumanoid);
    }
    let root = resolve_root(scene, target, config.root)?;
    HierarchyBuilder::new(scene, skeleton, target, config.root_motion).build(root)
}

/// Bake `config.clip` into BVH text on `out`.
///
/// Every selection and hierarchy error is reported before anything is
/// written. A failure while sampling frames leaves HIERARCHY and part of
/// MOTION in `out`, so callers that must not publish partial text should
/// write into a buffer first. The scene's local transforms and the
/// evaluator's playback settings are restored before returning, on success
/// and on failure.
pub fn export<S, E, W>(
    scene: &mut Scene,
    target: NodeId,
    skeleton: &S,
    evaluator: &mut E,
    config: &ExportConfig,
    out: W,
) -> Result<ExportSummary, ExportError>
where
    S: SkeletonSource + ?Sized,
    E: AnimationEvaluator + ?Sized,
    W: Write,
{
    if !skeleton.is_humanoid() {
        return Err(ExportError::NotHumanoid);
    }
    let clip = evaluator
        .clip_info(&config.clip)
        .ok_or_else(|| ExportError::ClipNotFound(config.clip.clone()))?;
    if !clip.frame_rate.is_finite() || clip.frame_rate <= 0.0 {
        return Err(ExportError::InvalidFrameRate(clip.frame_rate));
    }

    let bones = build_skeleton(scene, target, skeleton, config)?;
    let converter = CoordinateConverter::new(config.right_handed);
    let sampler = PoseSampler::new(&bones, scene, config.root_motion, converter);

    let frame_count = clip.frame_count();
    let frame_time = clip.frame_time();
    if frame_count == 0 {
        tracing::warn!("Clip '{}' is shorter than one frame; MOTION will be empty", config.clip);
    }

    tracing::info!(
        "Baking '{}': {} frames at {} fps, root '{}'",
        config.clip,
        frame_count,
        clip.frame_rate,
        bones.bone(bones.root()).name
    );

    let mut writer = BvhWriter::new(out, converter);
    writer.write_hierarchy(&bones)?;
    writer.write_motion_header(frame_count, frame_time)?;

    let mut guard = TransformGuard::enter(scene, evaluator, target);
    guard.parts().1.set_playback(PlaybackSettings::BAKING);
    for i in 0..frame_count {
        let time = i as f64 * frame_time;
        let (scene, evaluator) = guard.parts();
        evaluator.advance_to(scene, &config.clip, time)?;
        writer.write_frame(&sampler.sample(scene))?;
        tracing::trace!("Frame {}/{} at {:.4}s", i + 1, frame_count, time);
    }
    guard.release()?;
    writer.flush()?;

    Ok(ExportSummary {
        frame_count: writer.rows_written(),
        frame_time,
        joint_count: bones.joint_count(),
        end_site_count: bones.end_site_count(),
        channel_count: bones.channel_count(),
    })
}
