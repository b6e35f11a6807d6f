//! Bone classification
//!
//! Decides what a scene node contributes to the exported skeleton. Pure query
//! against the scene and skeleton source at call time.

use crate::humanoid::{HumanBone, SkeletonSource};
use crate::scene::{NodeId, Scene};

/// Node name treated as a joint carrying root motion when that is exported
pub const MOTION_ROOT_NAME: &str = "Armature";

/// Suffix marking a terminal node: `<parent>_end`
pub const END_SITE_SUFFIX: &str = "_end";

/// Why a node is a joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointRole {
    Canonical(HumanBone),
    /// The `Armature` node, promoted so it can carry global displacement
    MotionRoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Joint(JointRole),
    EndSiteCandidate,
    /// Not part of the skeleton; its children are still searched
    Skip,
    /// Inactive; the node and its whole subtree are ignored
    Inactive,
}

/// Classifies scene nodes under one export target
pub struct BoneClassifier<'a, S: SkeletonSource + ?Sized> {
    scene: &'a Scene,
    skeleton: &'a S,
    target: NodeId,
    root_motion: bool,
}

impl<'a, S: SkeletonSource + ?Sized> BoneClassifier<'a, S> {
    pub fn new(scene: &'a Scene, skeleton: &'a S, target: NodeId, root_motion: bool) -> Self {
        Self {
            scene,
            skeleton,
            target,
            root_motion,
        }
    }

    /// Joint role of `node`, ignoring activity and end-site naming
    pub fn joint_role(&self, node: NodeId) -> Option<JointRole> {
        if let Some(bone) = self.skeleton.canonical_bone(node) {
            return Some(JointRole::Canonical(bone));
        }
        if self.root_motion
            && self.scene.name(node) == MOTION_ROOT_NAME
            && self.scene.is_descendant_of(node, self.target)
        {
            return Some(JointRole::MotionRoot);
        }
        None
    }

    /// Classify `node` given the name of the nearest enclosing bone
    pub fn classify(&self, node: NodeId, parent_bone: Option<&str>) -> Classification {
        if !self.scene.is_active(node) {
            return Classification::Inactive;
        }
        if let Some(role) = self.joint_role(node) {
            return Classification::Joint(role);
        }
        match parent_bone {
            Some(parent) if is_end_site_name(self.scene.name(node), parent) => {
                Classification::EndSiteCandidate
            }
            _ => Classification::Skip,
        }
    }
}

/// Case-insensitive `<parent>_end` match
pub fn is_end_site_name(name: &str, parent: &str) -> bool {
    let expected = format!("{}{}", parent, END_SITE_SUFFIX);
    name.to_lowercase() == expected.to_lowercase()
}
