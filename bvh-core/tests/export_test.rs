//! End-to-end export tests
//!
//! Builds small rigs in memory, bakes them through the keyframe evaluator,
//! and checks the BVH text and the scene state afterwards.

use bvh_core::{
    export, AnimationEvaluator, ClipInfo, ExportConfig, ExportError, HumanBone, HumanoidMap,
    KeyframeAnimator, KeyframeClip, NodeId, NodeTrack, PlaybackSettings, Scene, UpdateMode,
};
use glam::{Quat, Vec3};

struct Rig {
    scene: Scene,
    map: HumanoidMap,
    animator: KeyframeAnimator,
    target: NodeId,
    armature: NodeId,
    hips: NodeId,
}

/// Character / Armature / Hips / Spine / Spine_end with a one second wave
fn rig() -> Rig {
    let mut scene = Scene::new();
    let target = scene.add_node("Character", None);
    let armature = scene.add_node("Armature", Some(target));
    let hips = scene.add_node("Hips", Some(armature));
    scene.set_local_position(hips, Vec3::new(0.0, 1.0, 0.0));
    let spine = scene.add_node("Spine", Some(hips));
    scene.set_local_position(spine, Vec3::new(0.0, 0.5, 0.0));
    let end = scene.add_node("Spine_end", Some(spine));
    scene.set_local_position(end, Vec3::new(0.0, 0.25, 0.0));

    let mut map = HumanoidMap::new();
    map.insert(HumanBone::Hips, hips).unwrap();
    map.insert(HumanBone::Spine, spine).unwrap();

    let mut track = NodeTrack::new(spine);
    track.rotations = vec![
        (0.0, Quat::IDENTITY),
        (0.5, Quat::from_rotation_z(0.6)),
        (1.0, Quat::IDENTITY),
    ];
    let mut slide = NodeTrack::new(armature);
    slide.positions = vec![(0.0, Vec3::ZERO), (1.0, Vec3::new(1.0, 0.0, 0.0))];

    let mut clip = KeyframeClip::new("wave", 30.0);
    clip.length = Some(1.0);
    clip.tracks = vec![track, slide];

    let mut animator = KeyframeAnimator::new(target);
    animator.add_clip(clip);

    Rig {
        scene,
        map,
        animator,
        target,
        armature,
        hips,
    }
}

fn snapshot(scene: &Scene, root: NodeId) -> Vec<(Vec3, Quat)> {
    scene
        .pre_order(root)
        .into_iter()
        .map(|id| (scene.local_position(id), scene.local_rotation(id)))
        .collect()
}

fn run(rig: &mut Rig, config: &ExportConfig) -> Result<String, ExportError> {
    let mut out = Vec::new();
    export(
        &mut rig.scene,
        rig.target,
        &rig.map,
        &mut rig.animator,
        config,
        &mut out,
    )?;
    Ok(String::from_utf8(out).expect("BVH output is UTF-8"))
}

/// Rows after the `Frame Time:` line
fn motion_rows(text: &str) -> Vec<&str> {
    text.lines()
        .skip_while(|line| !line.starts_with("Frame Time:"))
        .skip(1)
        .collect()
}

#[test]
fn test_one_second_at_thirty_fps() {
    let mut rig = rig();
    let text = run(&mut rig, &ExportConfig::new("wave")).unwrap();

    assert!(text.starts_with("HIERARCHY\nROOT Hips\n"));
    assert!(text.contains("MOTION\nFrames: 30\nFrame Time: 0.03333333\n"));

    let rows = motion_rows(&text);
    assert_eq!(rows.len(), 30);
    for row in &rows {
        assert_eq!(row.split(' ').count(), 9, "row: {}", row);
        for token in row.split(' ') {
            token.parse::<f32>().expect("numeric channel value");
        }
    }
}

#[test]
fn test_hierarchy_is_well_formed() {
    let mut rig = rig();
    let text = run(&mut rig, &ExportConfig::new("wave")).unwrap();
    let hierarchy: String = text.lines().take_while(|l| *l != "MOTION").collect::<Vec<_>>().join("\n");

    let opens = hierarchy.matches('{').count();
    let closes = hierarchy.matches('}').count();
    assert_eq!(opens, closes);
    assert_eq!(opens, 3);
    assert_eq!(hierarchy.matches("ROOT ").count(), 1);
    assert_eq!(hierarchy.matches("JOINT ").count(), 1);
    assert_eq!(hierarchy.matches("End Site").count(), 1);
    assert_eq!(hierarchy.matches("CHANNELS 6").count(), 1);
    assert_eq!(hierarchy.matches("CHANNELS 3").count(), 1);
}

#[test]
fn test_export_is_idempotent() {
    let mut rig = rig();
    let config = ExportConfig::new("wave");
    let first = run(&mut rig, &config).unwrap();
    let second = run(&mut rig, &config).unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn test_export_leaves_scene_untouched() {
    let mut rig = rig();
    let before = snapshot(&rig.scene, rig.target);
    let playback = PlaybackSettings {
        speed: 0.25,
        update_mode: UpdateMode::AnimatePhysics,
        ..PlaybackSettings::default()
    };
    rig.animator.set_playback(playback);

    run(&mut rig, &ExportConfig::new("wave")).unwrap();

    assert_eq!(snapshot(&rig.scene, rig.target), before);
    assert_eq!(rig.animator.playback(), playback);
}

#[test]
fn test_root_outside_target_is_rejected() {
    let mut rig = rig();
    let stray = rig.scene.add_node("Stray", None);
    let config = ExportConfig {
        root: Some(stray),
        ..ExportConfig::new("wave")
    };
    let mut out = Vec::new();
    let result = export(
        &mut rig.scene,
        rig.target,
        &rig.map,
        &mut rig.animator,
        &config,
        &mut out,
    );
    match result {
        Err(ExportError::RootNotDescendant { root, target }) => {
            assert_eq!(root, "Stray");
            assert_eq!(target, "Character");
        }
        other => panic!("expected RootNotDescendant, got {:?}", other),
    }
    assert!(out.is_empty());
}

#[test]
fn test_unterminated_branch_leaves_scene_untouched() {
    let mut rig = rig();
    let arm = rig.scene.add_node("LeftUpperArm", Some(rig.hips));
    rig.map.insert(HumanBone::LeftUpperArm, arm).unwrap();
    let before = snapshot(&rig.scene, rig.target);

    match run(&mut rig, &ExportConfig::new("wave")) {
        Err(ExportError::UnterminatedBranch(names)) => assert_eq!(names, ["LeftUpperArm"]),
        other => panic!("expected UnterminatedBranch, got {:?}", other),
    }
    assert_eq!(snapshot(&rig.scene, rig.target), before);
}

#[test]
fn test_root_motion_tracks_armature_displacement() {
    let mut rig = rig();
    let config = ExportConfig {
        root_motion: true,
        ..ExportConfig::new("wave")
    };
    let text = run(&mut rig, &config).unwrap();
    assert!(text.starts_with("HIERARCHY\nROOT Armature\n"));

    let rows = motion_rows(&text);
    // Armature 6, Hips 3, Spine 3
    assert_eq!(rows[15].split(' ').count(), 12);
    // Half way along a 1 unit slide on +X, mirrored
    assert!(rows[15].starts_with("-0.50000000 0.00000000 0.00000000 "));

    let config = ExportConfig {
        right_handed: false,
        ..config
    };
    let text = run(&mut rig, &config).unwrap();
    assert!(motion_rows(&text)[15].starts_with("0.50000000 0.00000000 0.00000000 "));
}

#[test]
fn test_without_root_motion_armature_slide_is_ignored() {
    let mut rig = rig();
    let text = run(&mut rig, &ExportConfig::new("wave")).unwrap();
    for row in motion_rows(&text) {
        // Hips stays one unit above the armature
        assert!(row.starts_with("0.00000000 1.00000000 0.00000000 "), "row: {}", row);
    }
}

/// Fails partway through a bake after scrambling the pose
struct Faulty {
    inner: KeyframeAnimator,
    fail_at: usize,
    calls: usize,
}

impl AnimationEvaluator for Faulty {
    fn clip_info(&self, clip: &str) -> Option<ClipInfo> {
        self.inner.clip_info(clip)
    }

    fn advance_to(&mut self, scene: &mut Scene, clip: &str, time: f64) -> Result<(), ExportError> {
        self.inner.advance_to(scene, clip, time)?;
        self.calls += 1;
        if self.calls > self.fail_at {
            return Err(ExportError::Evaluation("induced failure".to_string()));
        }
        Ok(())
    }

    fn playback(&self) -> PlaybackSettings {
        self.inner.playback()
    }

    fn set_playback(&mut self, settings: PlaybackSettings) {
        self.inner.set_playback(settings);
    }
}

#[test]
fn test_failed_bake_restores_scene() {
    let mut rig = rig();
    rig.scene
        .set_local_rotation(rig.armature, Quat::from_rotation_y(0.3));
    let before = snapshot(&rig.scene, rig.target);
    let mut faulty = Faulty {
        inner: rig.animator.clone(),
        fail_at: 10,
        calls: 0,
    };

    let mut out = Vec::new();
    let err = export(
        &mut rig.scene,
        rig.target,
        &rig.map,
        &mut faulty,
        &ExportConfig::new("wave"),
        &mut out,
    )
    .unwrap_err();

    assert!(matches!(err, ExportError::Evaluation(_)));
    assert_eq!(faulty.calls, 11);
    // The sink keeps what was written before the failure
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("HIERARCHY\nROOT Hips\n"));
    assert!(text.contains("Frames: 30\n"));
    assert_eq!(motion_rows(&text).len(), 10);
    assert_eq!(snapshot(&rig.scene, rig.target), before);
    assert_eq!(faulty.playback(), PlaybackSettings::default());
}

#[test]
fn test_joint_written_after_end_site() {
    let mut rig = rig();
    let head = rig.scene.add_node("Head", Some(rig.hips));
    rig.scene.set_local_position(head, Vec3::new(0.0, 0.6, 0.0));
    let head_end = rig.scene.add_node("Head_end", Some(head));
    rig.scene.set_local_position(head_end, Vec3::new(0.0, 0.2, 0.0));
    let jaw = rig.scene.add_node("Jaw", Some(head));
    rig.scene.set_local_position(jaw, Vec3::new(0.0, 0.0, 0.1));
    rig.scene.add_node("Jaw_end", Some(jaw));
    rig.map.insert(HumanBone::Head, head).unwrap();
    rig.map.insert(HumanBone::Jaw, jaw).unwrap();

    let text = run(&mut rig, &ExportConfig::new("wave")).unwrap();
    let hierarchy: Vec<&str> = text.lines().take_while(|l| *l != "MOTION").map(str::trim).collect();
    let head_end = hierarchy.iter().position(|l| *l == "JOINT Head").unwrap() + 4;
    assert_eq!(hierarchy[head_end], "End Site");
    assert_eq!(hierarchy[head_end + 4], "JOINT Jaw");
    assert_eq!(hierarchy.iter().filter(|l| **l == "End Site").count(), 3);

    // Hips 6, Spine 3, Head 3, Jaw 3
    let rows = motion_rows(&text);
    assert_eq!(rows.len(), 30);
    assert!(rows.iter().all(|row| row.split(' ').count() == 15));
}
