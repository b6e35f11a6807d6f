//! Keyframe clip evaluator
//!
//! A self-contained [`AnimationEvaluator`] that poses nodes from sampled
//! position/rotation keys. Positions interpolate linearly, rotations take
//! the shortest-path slerp, and times outside the keyed range clamp to the
//! first or last key.

use glam::{Quat, Vec3};

use crate::error::ExportError;
use crate::evaluator::{AnimationEvaluator, ClipInfo, CullingMode, PlaybackSettings};
use crate::scene::{NodeId, Scene};

/// Keys driving one node's local transform
#[derive(Debug, Clone)]
pub struct NodeTrack {
    pub node: NodeId,
    pub positions: Vec<(f32, Vec3)>,
    pub rotations: Vec<(f32, Quat)>,
}

impl NodeTrack {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            positions: Vec::new(),
            rotations: Vec::new(),
        }
    }

    /// Time of the last key on either channel
    pub fn end_time(&self) -> f32 {
        let last_position = self.positions.last().map_or(0.0, |k| k.0);
        let last_rotation = self.rotations.last().map_or(0.0, |k| k.0);
        last_position.max(last_rotation)
    }

    pub fn position_at(&self, t: f32) -> Option<Vec3> {
        let (i, factor) = find_keys(&self.positions, t)?;
        let v0 = self.positions[i].1;
        Some(match self.positions.get(i + 1) {
            Some(&(_, v1)) => v0.lerp(v1, factor),
            None => v0,
        })
    }

    pub fn rotation_at(&self, t: f32) -> Option<Quat> {
        let (i, factor) = find_keys(&self.rotations, t)?;
        let q0 = self.rotations[i].1;
        Some(match self.rotations.get(i + 1) {
            // slerp already takes the shortest path
            Some(&(_, q1)) => q0.slerp(q1, factor).normalize(),
            None => q0,
        })
    }
}

/// Index of the key at or before `t` and the blend factor toward the next
fn find_keys<T>(keys: &[(f32, T)], t: f32) -> Option<(usize, f32)> {
    if keys.is_empty() {
        return None;
    }

    let mut i = 0;
    while i < keys.len() - 1 && keys[i + 1].0 < t {
        i += 1;
    }

    if i >= keys.len() - 1 {
        return Some((keys.len() - 1, 0.0));
    }

    let t0 = keys[i].0;
    let t1 = keys[i + 1].0;
    let factor = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
    Some((i, factor.clamp(0.0, 1.0)))
}

#[derive(Debug, Clone)]
pub struct KeyframeClip {
    pub name: String,
    pub frame_rate: f32,
    /// Explicit length in seconds; defaults to the last key time
    pub length: Option<f32>,
    pub tracks: Vec<NodeTrack>,
}

impl KeyframeClip {
    pub fn new(name: impl Into<String>, frame_rate: f32) -> Self {
        Self {
            name: name.into(),
            frame_rate,
            length: None,
            tracks: Vec::new(),
        }
    }

    pub fn length(&self) -> f32 {
        self.length.unwrap_or_else(|| {
            self.tracks
                .iter()
                .map(NodeTrack::end_time)
                .fold(0.0, f32::max)
        })
    }

    pub fn info(&self) -> ClipInfo {
        ClipInfo {
            length: self.length(),
            frame_rate: self.frame_rate,
        }
    }
}

/// Evaluator attached to one owner node (the export target)
#[derive(Debug, Clone)]
pub struct KeyframeAnimator {
    owner: NodeId,
    clips: Vec<KeyframeClip>,
    playback: PlaybackSettings,
    /// Whether any renderer under the owner is visible, for culling
    pub visible: bool,
}

impl KeyframeAnimator {
    pub fn new(owner: NodeId) -> Self {
        Self {
            owner,
            clips: Vec::new(),
            playback: PlaybackSettings::default(),
            visible: true,
        }
    }

    pub fn add_clip(&mut self, clip: KeyframeClip) {
        self.clips.push(clip);
    }

    pub fn clips(&self) -> &[KeyframeClip] {
        &self.clips
    }

    pub fn clip(&self, name: &str) -> Option<&KeyframeClip> {
        self.clips.iter().find(|c| c.name == name)
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }
}

impl AnimationEvaluator for KeyframeAnimator {
    fn clip_info(&self, clip: &str) -> Option<ClipInfo> {
        self.clip(clip).map(KeyframeClip::info)
    }

    fn advance_to(&mut self, scene: &mut Scene, clip: &str, time: f64) -> Result<(), ExportError> {
        let clip = self
            .clips
            .iter()
            .find(|c| c.name == clip)
            .ok_or_else(|| ExportError::ClipNotFound(clip.to_string()))?;

        if self.playback.culling_mode == CullingMode::CullCompletely && !self.visible {
            return Ok(());
        }

        let t = time as f32;
        for track in &clip.tracks {
            let node = track.node;
            if node == self.owner && !self.playback.apply_root_motion {
                continue;
            }
            if node.index() >= scene.len() {
                return Err(ExportError::Evaluation(format!(
                    "clip '{}' targets missing node {}",
                    clip.name,
                    node.index()
                )));
            }
            if let Some(position) = track.position_at(t) {
                scene.set_local_position(node, position);
            }
            if let Some(rotation) = track.rotation_at(t) {
                scene.set_local_rotation(node, rotation);
            }
        }
        Ok(())
    }

    fn playback(&self) -> PlaybackSettings {
        self.playback
    }

    fn set_playback(&mut self, settings: PlaybackSettings) {
        self.playback = settings;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn track(node: NodeId) -> NodeTrack {
        let mut track = NodeTrack::new(node);
        track.positions = vec![(0.0, Vec3::ZERO), (1.0, Vec3::new(2.0, 0.0, 0.0))];
        track.rotations = vec![
            (0.0, Quat::IDENTITY),
            (1.0, Quat::from_rotation_y(FRAC_PI_2)),
        ];
        track
    }

    #[test]
    fn test_interpolation_and_clamping() {
        let mut scene = Scene::new();
        let node = scene.add_node("Bone", None);
        let track = track(node);

        assert_eq!(track.position_at(0.5), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(track.position_at(-1.0), Some(Vec3::ZERO));
        assert_eq!(track.position_at(5.0), Some(Vec3::new(2.0, 0.0, 0.0)));

        let half = track.rotation_at(0.5).unwrap();
        assert!(half.abs_diff_eq(Quat::from_rotation_y(FRAC_PI_2 / 2.0), 1e-5));
        assert_eq!(NodeTrack::new(node).rotation_at(0.5), None);
    }

    #[test]
    fn test_clip_length_defaults_to_last_key() {
        let mut scene = Scene::new();
        let node = scene.add_node("Bone", None);
        let mut clip = KeyframeClip::new("wave", 30.0);
        clip.tracks.push(track(node));
        assert_eq!(clip.length(), 1.0);
        clip.length = Some(2.0);
        assert_eq!(clip.info().length, 2.0);
    }

    #[test]
    fn test_owner_track_requires_root_motion() {
        let mut scene = Scene::new();
        let owner = scene.add_node("Character", None);
        let mut animator = KeyframeAnimator::new(owner);
        let mut clip = KeyframeClip::new("walk", 30.0);
        clip.tracks.push(track(owner));
        animator.add_clip(clip);

        animator.advance_to(&mut scene, "walk", 1.0).unwrap();
        assert_eq!(scene.local_position(owner), Vec3::ZERO);

        animator.set_playback(PlaybackSettings::BAKING);
        animator.advance_to(&mut scene, "walk", 1.0).unwrap();
        assert_eq!(scene.local_position(owner), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_cull_completely_skips_invisible() {
        let mut scene = Scene::new();
        let owner = scene.add_node("Character", None);
        let bone = scene.add_node("Bone", Some(owner));
        let mut animator = KeyframeAnimator::new(owner);
        let mut clip = KeyframeClip::new("walk", 30.0);
        clip.tracks.push(track(bone));
        animator.add_clip(clip);
        animator.visible = false;
        animator.set_playback(PlaybackSettings {
            culling_mode: CullingMode::CullCompletely,
            ..PlaybackSettings::default()
        });

        animator.advance_to(&mut scene, "walk", 1.0).unwrap();
        assert_eq!(scene.local_position(bone), Vec3::ZERO);
    }

    #[test]
    fn test_unknown_clip() {
        let mut scene = Scene::new();
        let owner = scene.add_node("Character", None);
        let mut animator = KeyframeAnimator::new(owner);
        assert!(!animator.has_clip("run"));
        assert!(matches!(
            animator.advance_to(&mut scene, "run", 0.0),
            Err(ExportError::ClipNotFound(_))
        ));
    }
}
