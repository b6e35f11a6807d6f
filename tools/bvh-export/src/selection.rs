//! Clip and root selection
//!
//! Motions are the animator's states in declaration order. A clip can only
//! be exported through a state that plays it; with no request the first
//! state's motion is used.

use anyhow::{Context, Result, bail};
use bvh_core::{AnimationEvaluator, ExportError, NodeId, SkeletonSource};

use crate::manifest::{LoadedRig, StateEntry};

/// A state's motion and its clip timing
#[derive(Debug, Clone, PartialEq)]
pub struct MotionInfo {
    pub state: String,
    pub clip: String,
    pub length: f32,
    pub frame_rate: f32,
    pub frame_count: usize,
}

/// Every state's motion, in declaration order
pub fn list_motions(rig: &LoadedRig) -> Result<Vec<MotionInfo>> {
    let animator = rig.animator.as_ref().ok_or(ExportError::NoAnimator)?;
    rig.states
        .iter()
        .map(|state| -> Result<MotionInfo> {
            let info = animator
                .clip_info(&state.motion)
                .ok_or_else(|| ExportError::ClipNotFound(state.motion.clone()))?;
            Ok(MotionInfo {
                state: state.name.clone(),
                clip: state.motion.clone(),
                length: info.length,
                frame_rate: info.frame_rate,
                frame_count: info.frame_count(),
            })
        })
        .collect()
}

/// Pick the state whose motion will be baked
pub fn select_state<'r>(rig: &'r LoadedRig, clip: Option<&str>) -> Result<&'r StateEntry> {
    if rig.animator.is_none() {
        return Err(ExportError::NoAnimator.into());
    }
    if !rig.humanoid.is_humanoid() {
        return Err(ExportError::NotHumanoid.into());
    }

    match clip {
        Some(clip) => rig
            .states
            .iter()
            .find(|state| state.motion == clip)
            .with_context(|| format!("No animator state whose motion is {}", clip)),
        None => match rig.states.first() {
            Some(state) => Ok(state),
            None => bail!("Animator has no states to export"),
        },
    }
}

/// Resolve an export root given by node name
pub fn select_root(rig: &LoadedRig, root: Option<&str>) -> Result<Option<NodeId>> {
    root.map(|name| {
        rig.node(name)
            .with_context(|| format!("Root transform '{}' is not a declared node", name))
    })
    .transpose()
}
