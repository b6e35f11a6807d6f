//! Rig description file parsing
//!
//! A rig file declares the scene nodes under an export target, the humanoid
//! role mapping, the animator's states and the keyframe clips they play.
//! [`RigManifest::build`] validates the document and turns it into the
//! collaborators `bvh_core::export` runs against.

use anyhow::{Context, Result, bail};
use bvh_core::{HumanBone, HumanoidMap, KeyframeAnimator, KeyframeClip, NodeId, NodeTrack, Scene};
use glam::{Quat, Vec3};
use hashbrown::HashMap;
use serde::Deserialize;
use std::path::Path;

/// rig.toml manifest structure
#[derive(Debug, Deserialize)]
pub struct RigManifest {
    pub rig: RigSection,
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
    /// Role name (e.g. `LeftUpperArm`) to node name
    #[serde(default)]
    pub humanoid: HashMap<String, String>,
    #[serde(default)]
    pub animator: Option<AnimatorSection>,
    #[serde(default)]
    pub clips: Vec<ClipEntry>,
    #[serde(default)]
    pub export: ExportSection,
}

#[derive(Debug, Deserialize)]
pub struct RigSection {
    /// Node that owns the animator
    pub target: String,
}

/// Single scene node. Parents must be declared before their children.
#[derive(Debug, Deserialize)]
pub struct NodeEntry {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub position: [f32; 3],
    /// x y z w
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "default_true")]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnimatorSection {
    /// Whether any renderer under the target is visible, for culling
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub states: Vec<StateEntry>,
}

/// Animator state and the clip it plays
#[derive(Debug, Clone, Deserialize)]
pub struct StateEntry {
    pub name: String,
    pub motion: String,
}

#[derive(Debug, Deserialize)]
pub struct ClipEntry {
    pub name: String,
    pub frame_rate: f32,
    /// Seconds. Defaults to the last key time.
    #[serde(default)]
    pub length: Option<f32>,
    #[serde(default)]
    pub tracks: Vec<TrackEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TrackEntry {
    pub node: String,
    pub times: Vec<f32>,
    #[serde(default)]
    pub rotations: Option<Vec<[f32; 4]>>,
    #[serde(default)]
    pub positions: Option<Vec<[f32; 3]>>,
}

/// Export defaults. Command line flags override these.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportSection {
    #[serde(default)]
    pub clip: Option<String>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub root_motion: bool,
    #[serde(default = "default_true")]
    pub right_handed: bool,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            clip: None,
            root: None,
            root_motion: false,
            right_handed: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

/// A validated rig, ready to export
#[derive(Debug)]
pub struct LoadedRig {
    pub scene: Scene,
    pub target: NodeId,
    pub humanoid: HumanoidMap,
    pub animator: Option<KeyframeAnimator>,
    /// Animator states in declaration order
    pub states: Vec<StateEntry>,
    pub defaults: ExportSection,
    names: HashMap<String, NodeId>,
}

impl LoadedRig {
    /// Look up a node by its exact name
    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }
}

impl RigManifest {
    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rig file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid rig file: {}", path.display()))
    }

    /// Parse manifest from string
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse rig TOML")
    }

    /// Validate and build the scene, skeleton source and animator
    pub fn build(&self) -> Result<LoadedRig> {
        let mut scene = Scene::new();
        let mut names: HashMap<String, NodeId> = HashMap::new();

        for entry in &self.nodes {
            if names.contains_key(&entry.name) {
                bail!("Duplicate node name '{}'", entry.name);
            }
            let parent = match &entry.parent {
                Some(parent) => Some(*names.get(parent).with_context(|| {
                    format!(
                        "Node '{}' has unknown parent '{}' (parents must be declared first)",
                        entry.name, parent
                    )
                })?),
                None => None,
            };
            let id = scene.add_node(entry.name.as_str(), parent);
            scene.set_local_position(id, Vec3::from_array(entry.position));
            scene.set_local_rotation(id, rotation(entry.rotation, &entry.name)?);
            scene.set_active(id, entry.active);
            names.insert(entry.name.clone(), id);
        }

        let lookup = |name: &str| names.get(name).copied();

        let target = lookup(&self.rig.target)
            .with_context(|| format!("Export target '{}' is not a declared node", self.rig.target))?;

        let mut humanoid = HumanoidMap::new();
        for (role, node) in &self.humanoid {
            let bone: HumanBone = role
                .parse()
                .with_context(|| format!("Invalid [humanoid] entry '{}'", role))?;
            let id = lookup(node)
                .with_context(|| format!("Humanoid role {} maps to unknown node '{}'", role, node))?;
            humanoid.insert(bone, id)?;
        }

        let mut clips: Vec<KeyframeClip> = Vec::with_capacity(self.clips.len());
        for entry in &self.clips {
            if clips.iter().any(|c| c.name == entry.name) {
                bail!("Duplicate clip name '{}'", entry.name);
            }
            let mut clip = KeyframeClip::new(entry.name.as_str(), entry.frame_rate);
            clip.length = entry.length;
            for track in &entry.tracks {
                let node = lookup(&track.node).with_context(|| {
                    format!("Clip '{}' animates unknown node '{}'", entry.name, track.node)
                })?;
                clip.tracks.push(
                    build_track(node, track)
                        .with_context(|| format!("Clip '{}', track '{}'", entry.name, track.node))?,
                );
            }
            clips.push(clip);
        }

        let (animator, states) = match &self.animator {
            Some(section) => {
                for state in &section.states {
                    if !clips.iter().any(|c| c.name == state.motion) {
                        bail!(
                            "Animator state '{}' plays '{}', which is not a declared clip",
                            state.name,
                            state.motion
                        );
                    }
                }
                let mut animator = KeyframeAnimator::new(target);
                animator.visible = section.visible;
                for clip in clips {
                    animator.add_clip(clip);
                }
                (Some(animator), section.states.clone())
            }
            None => (None, Vec::new()),
        };

        tracing::debug!(
            "Loaded rig: {} nodes, {} humanoid roles, {} states",
            scene.len(),
            humanoid.len(),
            states.len()
        );

        Ok(LoadedRig {
            scene,
            target,
            humanoid,
            animator,
            states,
            defaults: self.export.clone(),
            names,
        })
    }
}

/// Load and validate a rig file
pub fn load_rig(path: &Path) -> Result<LoadedRig> {
    let manifest = RigManifest::load(path)?;
    manifest
        .build()
        .with_context(|| format!("Invalid rig file: {}", path.display()))
}

fn rotation(values: [f32; 4], what: &str) -> Result<Quat> {
    let q = Quat::from_array(values);
    if !q.is_finite() || q.length_squared() <= f32::EPSILON {
        bail!("'{}' has a degenerate rotation {:?}", what, values);
    }
    Ok(q.normalize())
}

fn build_track(node: NodeId, entry: &TrackEntry) -> Result<NodeTrack> {
    if entry.times.windows(2).any(|w| w[1] < w[0]) {
        bail!("Key times are not sorted");
    }

    let mut track = NodeTrack::new(node);
    if let Some(rotations) = &entry.rotations {
        if rotations.len() != entry.times.len() {
            bail!(
                "{} key times but {} rotations",
                entry.times.len(),
                rotations.len()
            );
        }
        track.rotations = entry
            .times
            .iter()
            .zip(rotations)
            .map(|(&t, &r)| -> Result<(f32, Quat)> { Ok((t, rotation(r, &entry.node)?)) })
            .collect::<Result<_>>()?;
    }
    if let Some(positions) = &entry.positions {
        if positions.len() != entry.times.len() {
            bail!(
                "{} key times but {} positions",
                entry.times.len(),
                positions.len()
            );
        }
        track.positions = entry
            .times
            .iter()
            .zip(positions)
            .map(|(&t, &p)| (t, Vec3::from_array(p)))
            .collect();
    }
    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RIG: &str = r#"
[rig]
target = "Character"

[[nodes]]
name = "Character"

[[nodes]]
name = "Armature"
parent = "Character"

[[nodes]]
name = "Hips"
parent = "Armature"
position = [0.0, 1.0, 0.0]

[[nodes]]
name = "Hips_end"
parent = "Hips"
position = [0.0, 0.2, 0.0]

[humanoid]
Hips = "Hips"

[animator]
[[animator.states]]
name = "Idle"
motion = "idle"

[[clips]]
name = "idle"
frame_rate = 24.0
length = 2.0

[[clips.tracks]]
node = "Hips"
times = [0.0, 1.0]
rotations = [[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 2.0]]
"#;

    fn build(content: &str) -> Result<LoadedRig> {
        RigManifest::parse(content)?.build()
    }

    #[test]
    fn test_parse_and_build() {
        let rig = build(RIG).unwrap();
        assert_eq!(rig.scene.len(), 4);
        assert_eq!(rig.scene.name(rig.target), "Character");
        assert_eq!(rig.humanoid.len(), 1);
        assert_eq!(rig.states.len(), 1);
        assert!(rig.defaults.right_handed);
        assert!(!rig.defaults.root_motion);

        let hips = rig.node("Hips").unwrap();
        assert_eq!(rig.scene.local_position(hips), Vec3::new(0.0, 1.0, 0.0));

        let animator = rig.animator.as_ref().unwrap();
        let clip = animator.clip("idle").unwrap();
        assert_eq!(clip.length(), 2.0);
        // Rotation keys are normalized on load
        assert_eq!(clip.tracks[0].rotations[1].1, Quat::IDENTITY);
    }

    #[test]
    fn test_unknown_parent() {
        let content = RIG.replace("parent = \"Armature\"", "parent = \"Skeleton\"");
        let err = build(&content).unwrap_err();
        assert!(format!("{:#}", err).contains("unknown parent 'Skeleton'"));
    }

    #[test]
    fn test_duplicate_node() {
        let content = RIG.replace("name = \"Hips_end\"", "name = \"Hips\"");
        let err = build(&content).unwrap_err();
        assert!(format!("{:#}", err).contains("Duplicate node name 'Hips'"));
    }

    #[test]
    fn test_unknown_role() {
        let content = RIG.replace("Hips = \"Hips\"", "Pelvis = \"Hips\"");
        let err = build(&content).unwrap_err();
        assert!(format!("{:#}", err).contains("Pelvis"));
    }

    #[test]
    fn test_key_count_mismatch() {
        let content = RIG.replace("times = [0.0, 1.0]", "times = [0.0, 0.5, 1.0]");
        let err = build(&content).unwrap_err();
        assert!(format!("{:#}", err).contains("3 key times but 2 rotations"));
    }

    #[test]
    fn test_unsorted_times() {
        let content = RIG.replace("times = [0.0, 1.0]", "times = [1.0, 0.0]");
        let err = build(&content).unwrap_err();
        assert!(format!("{:#}", err).contains("not sorted"));
    }

    #[test]
    fn test_state_motion_must_name_a_clip() {
        let content = RIG.replace("motion = \"idle\"", "motion = \"walk\"");
        let err = build(&content).unwrap_err();
        assert!(format!("{:#}", err).contains("'walk', which is not a declared clip"));
    }

    #[test]
    fn test_missing_sections() {
        let rig = build(
            r#"
[rig]
target = "Character"

[[nodes]]
name = "Character"
"#,
        )
        .unwrap();
        assert!(rig.animator.is_none());
        assert!(rig.humanoid.is_empty());
    }
}
