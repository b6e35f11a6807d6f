//! Rig file to BVH file
//!
//! Merges command line options with the rig's `[export]` defaults, runs the
//! export into memory, and only then touches the output path.

use anyhow::{Context, Result};
use bvh_core::{BoneKind, ExportConfig, ExportError, ExportSummary, Skeleton};
use std::path::{Path, PathBuf};

use crate::manifest::{LoadedRig, load_rig};
use crate::selection::{select_root, select_state};

/// Command line overrides. Unset fields fall back to the rig's `[export]` table.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub clip: Option<String>,
    pub root: Option<String>,
    pub root_motion: bool,
    pub left_handed: bool,
}

/// Result of baking one clip
#[derive(Debug)]
pub struct BakedClip {
    pub clip: String,
    pub bvh: Vec<u8>,
    pub summary: ExportSummary,
}

fn resolve_config(rig: &LoadedRig, options: &ExportOptions) -> Result<ExportConfig> {
    let clip = options.clip.as_deref().or(rig.defaults.clip.as_deref());
    let state = select_state(rig, clip)?;
    let root = select_root(rig, options.root.as_deref().or(rig.defaults.root.as_deref()))?;
    tracing::debug!("Selected state '{}' playing '{}'", state.name, state.motion);

    Ok(ExportConfig {
        clip: state.motion.clone(),
        root,
        root_motion: options.root_motion || rig.defaults.root_motion,
        right_handed: rig.defaults.right_handed && !options.left_handed,
    })
}

/// Bake the selected clip into an in-memory BVH document
pub fn bake(rig: &mut LoadedRig, options: &ExportOptions) -> Result<BakedClip> {
    let config = resolve_config(rig, options)?;

    let animator = rig.animator.as_mut().ok_or(ExportError::NoAnimator)?;

    let mut bvh = Vec::new();
    let summary = bvh_core::export(
        &mut rig.scene,
        rig.target,
        &rig.humanoid,
        animator,
        &config,
        &mut bvh,
    )
    .with_context(|| format!("Failed to export clip '{}'", config.clip))?;

    Ok(BakedClip {
        clip: config.clip,
        bvh,
        summary,
    })
}

/// Bake a rig file and write the result.
///
/// The default output is `<clip>.bvh` next to the rig file. Nothing is
/// written unless the whole export succeeds.
pub fn bake_file(rig_path: &Path, output: Option<&Path>, options: &ExportOptions) -> Result<PathBuf> {
    let mut rig = load_rig(rig_path)?;
    let baked = bake(&mut rig, options)?;

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => rig_path.with_file_name(format!("{}.bvh", baked.clip)),
    };
    std::fs::write(&output, &baked.bvh)
        .with_context(|| format!("Failed to write BVH file: {}", output.display()))?;

    tracing::info!(
        "Exported '{}': {} frames, {} joints, {} end sites -> {:?}",
        baked.clip,
        baked.summary.frame_count,
        baked.summary.joint_count,
        baked.summary.end_site_count,
        output
    );
    Ok(output)
}

/// Build the exported hierarchy without sampling any frames
pub fn check(rig: &LoadedRig, root: Option<&str>, root_motion: bool) -> Result<Skeleton> {
    let root = select_root(rig, root.or(rig.defaults.root.as_deref()))?;
    let config = ExportConfig {
        root,
        root_motion: root_motion || rig.defaults.root_motion,
        ..ExportConfig::new(String::new())
    };
    let skeleton = bvh_core::build_skeleton(&rig.scene, rig.target, &rig.humanoid, &config)?;

    for (id, bone) in skeleton.iter() {
        let label = match bone.kind {
            BoneKind::Root => "ROOT",
            BoneKind::Joint => "JOINT",
            BoneKind::EndSite => "End Site",
        };
        let depth = skeleton.depth(id);
        tracing::info!("{}{} {}", "  ".repeat(depth), label, bone.name);
    }
    Ok(skeleton)
}
