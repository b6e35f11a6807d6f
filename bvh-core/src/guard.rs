//! Scoped save/restore of live scene and playback state
//!
//! Baking poses the rig through the shared scene. [`TransformGuard`] records
//! every local transform under the export target and the evaluator's playback
//! settings on entry, and writes them back on [`TransformGuard::release`] or,
//! failing that, on drop.

use std::collections::VecDeque;

use glam::{Quat, Vec3};

use crate::error::ExportError;
use crate::evaluator::{AnimationEvaluator, PlaybackSettings};
use crate::scene::{NodeId, Scene};

/// Local transforms of a subtree, in pre-order
#[derive(Debug, Clone)]
pub struct SavedTransforms {
    root: NodeId,
    records: VecDeque<(Vec3, Quat)>,
}

impl SavedTransforms {
    /// Record `root` and every descendant, inactive nodes included
    pub fn capture(scene: &Scene, root: NodeId) -> Self {
        let records = scene
            .pre_order(root)
            .into_iter()
            .map(|id| (scene.local_position(id), scene.local_rotation(id)))
            .collect();
        Self { root, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write every record back in the same pre-order. The subtree must have
    /// exactly as many nodes as were captured; nothing is written otherwise.
    pub fn restore(mut self, scene: &mut Scene) -> Result<(), ExportError> {
        let order = scene.pre_order(self.root);
        if order.len() != self.records.len() {
            return Err(ExportError::StateRestoreMismatch {
                saved: self.records.len(),
                visited: order.len(),
            });
        }
        for id in order {
            if let Some((position, rotation)) = self.records.pop_front() {
                scene.set_local_position(id, position);
                scene.set_local_rotation(id, rotation);
            }
        }
        debug_assert!(self.records.is_empty());
        Ok(())
    }
}

/// Holds the scene and evaluator exclusively while a bake runs
pub struct TransformGuard<'s, E: AnimationEvaluator + ?Sized> {
    scene: &'s mut Scene,
    evaluator: &'s mut E,
    saved: Option<(SavedTransforms, PlaybackSettings)>,
}

impl<'s, E: AnimationEvaluator + ?Sized> TransformGuard<'s, E> {
    pub fn enter(scene: &'s mut Scene, evaluator: &'s mut E, root: NodeId) -> Self {
        let transforms = SavedTransforms::capture(scene, root);
        let playback = evaluator.playback();
        tracing::debug!(
            "Saved {} transforms under '{}'",
            transforms.len(),
            scene.name(root)
        );
        Self {
            scene,
            evaluator,
            saved: Some((transforms, playback)),
        }
    }

    pub fn scene(&self) -> &Scene {
        self.scene
    }

    /// Split borrow for driving the evaluator against the scene
    pub fn parts(&mut self) -> (&mut Scene, &mut E) {
        (&mut *self.scene, &mut *self.evaluator)
    }

    /// Restore everything and report a restore mismatch
    pub fn release(mut self) -> Result<(), ExportError> {
        self.restore()
    }

    fn restore(&mut self) -> Result<(), ExportError> {
        let Some((transforms, playback)) = self.saved.take() else {
            return Ok(());
        };
        self.evaluator.set_playback(playback);
        transforms.restore(self.scene)
    }
}

impl<E: AnimationEvaluator + ?Sized> Drop for TransformGuard<'_, E> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            tracing::error!("Failed to restore scene state: {}", e);
        }
    }
}
