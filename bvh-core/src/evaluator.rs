//! Animation evaluator interface
//!
//! The evaluator owns clip data and playback state. It never holds the scene:
//! [`AnimationEvaluator::advance_to`] receives it explicitly and writes the
//! resulting pose into node local transforms.

use crate::error::ExportError;
use crate::scene::Scene;

/// Timing source the evaluator advances with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    #[default]
    Normal,
    AnimatePhysics,
    UnscaledTime,
}

/// When the evaluator is allowed to skip pose evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullingMode {
    #[default]
    AlwaysAnimate,
    CullUpdateTransforms,
    CullCompletely,
}

/// Playback configuration saved and restored around baking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSettings {
    pub speed: f32,
    pub update_mode: UpdateMode,
    pub apply_root_motion: bool,
    pub culling_mode: CullingMode,
}

impl PlaybackSettings {
    /// Deterministic settings forced for the duration of a bake
    pub const BAKING: Self = Self {
        speed: 1.0,
        update_mode: UpdateMode::UnscaledTime,
        apply_root_motion: true,
        culling_mode: CullingMode::AlwaysAnimate,
    };
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            update_mode: UpdateMode::Normal,
            apply_root_motion: false,
            culling_mode: CullingMode::AlwaysAnimate,
        }
    }
}

/// Length and native sample rate of a clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipInfo {
    /// Seconds
    pub length: f32,
    /// Frames per second
    pub frame_rate: f32,
}

impl ClipInfo {
    /// Number of frames to bake: `length * frame_rate`, ties rounded to even
    pub fn frame_count(&self) -> usize {
        let frames = (self.length * self.frame_rate).round_ties_even();
        if frames.is_finite() && frames > 0.0 {
            frames as usize
        } else {
            0
        }
    }

    /// Seconds between baked frames
    pub fn frame_time(&self) -> f64 {
        1.0 / f64::from(self.frame_rate)
    }
}

/// Drives a rig's pose from a named clip
pub trait AnimationEvaluator {
    fn clip_info(&self, clip: &str) -> Option<ClipInfo>;

    fn has_clip(&self, clip: &str) -> bool {
        self.clip_info(clip).is_some()
    }

    /// Pose the rig at `time` seconds into `clip`, writing local transforms
    /// into `scene`. Must fully settle the pose before returning.
    fn advance_to(&mut self, scene: &mut Scene, clip: &str, time: f64) -> Result<(), ExportError>;

    fn playback(&self) -> PlaybackSettings;

    fn set_playback(&mut self, settings: PlaybackSettings);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_rounds_ties_to_even() {
        let clip = ClipInfo {
            length: 1.0,
            frame_rate: 30.0,
        };
        assert_eq!(clip.frame_count(), 30);
        assert_eq!(format!("{:.8}", clip.frame_time()), "0.03333333");

        let half = ClipInfo {
            length: 0.5,
            frame_rate: 5.0,
        };
        // 2.5 frames rounds to 2
        assert_eq!(half.frame_count(), 2);
    }

    #[test]
    fn test_degenerate_clip_has_no_frames() {
        let clip = ClipInfo {
            length: 0.0,
            frame_rate: 60.0,
        };
        assert_eq!(clip.frame_count(), 0);
    }
}
