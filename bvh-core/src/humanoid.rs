//! Canonical humanoid joints and the skeleton source interface

use std::fmt;
use std::str::FromStr;

use hashbrown::HashMap;

use crate::error::ExportError;
use crate::scene::NodeId;

macro_rules! human_bones {
    ($($bone:ident),+ $(,)?) => {
        /// Closed set of humanoid bone roles a rig can map scene nodes to
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum HumanBone {
            $($bone),+
        }

        impl HumanBone {
            /// Every role, in canonical order
            pub const ALL: &'static [HumanBone] = &[$(HumanBone::$bone),+];

            pub fn name(self) -> &'static str {
                match self {
                    $(HumanBone::$bone => stringify!($bone)),+
                }
            }
        }
    };
}

human_bones! {
    Hips,
    LeftUpperLeg, RightUpperLeg,
    LeftLowerLeg, RightLowerLeg,
    LeftFoot, RightFoot,
    Spine, Chest, Neck, Head,
    LeftShoulder, RightShoulder,
    LeftUpperArm, RightUpperArm,
    LeftLowerArm, RightLowerArm,
    LeftHand, RightHand,
    LeftToes, RightToes,
    LeftEye, RightEye, Jaw,
    LeftThumbProximal, LeftThumbIntermediate, LeftThumbDistal,
    LeftIndexProximal, LeftIndexIntermediate, LeftIndexDistal,
    LeftMiddleProximal, LeftMiddleIntermediate, LeftMiddleDistal,
    LeftRingProximal, LeftRingIntermediate, LeftRingDistal,
    LeftLittleProximal, LeftLittleIntermediate, LeftLittleDistal,
    RightThumbProximal, RightThumbIntermediate, RightThumbDistal,
    RightIndexProximal, RightIndexIntermediate, RightIndexDistal,
    RightMiddleProximal, RightMiddleIntermediate, RightMiddleDistal,
    RightRingProximal, RightRingIntermediate, RightRingDistal,
    RightLittleProximal, RightLittleIntermediate, RightLittleDistal,
    UpperChest,
}

impl fmt::Display for HumanBone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a string names no humanoid role
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown humanoid bone '{0}'")]
pub struct UnknownHumanBone(pub String);

impl FromStr for HumanBone {
    type Err = UnknownHumanBone;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HumanBone::ALL
            .iter()
            .copied()
            .find(|bone| bone.name() == s)
            .ok_or_else(|| UnknownHumanBone(s.to_string()))
    }
}

/// Read-only query object answering "which humanoid role is this node?"
pub trait SkeletonSource {
    /// Whether the rig carries a humanoid avatar at all
    fn is_humanoid(&self) -> bool;

    /// Role mapped to `node`, if any
    fn canonical_bone(&self, node: NodeId) -> Option<HumanBone>;

    /// Node mapped to `bone`, if any
    fn bone_node(&self, bone: HumanBone) -> Option<NodeId>;
}

/// One-to-one mapping between humanoid roles and scene nodes
#[derive(Debug, Clone, Default)]
pub struct HumanoidMap {
    by_bone: HashMap<HumanBone, NodeId>,
    by_node: HashMap<NodeId, HumanBone>,
}

impl HumanoidMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `bone` to `node`. Each role and each node may be used once.
    pub fn insert(&mut self, bone: HumanBone, node: NodeId) -> Result<(), ExportError> {
        if self.by_bone.contains_key(&bone) {
            return Err(ExportError::DuplicateMapping(bone.to_string()));
        }
        if let Some(existing) = self.by_node.get(&node) {
            return Err(ExportError::DuplicateMapping(format!(
                "node {} (already {})",
                node.index(),
                existing
            )));
        }
        self.by_bone.insert(bone, node);
        self.by_node.insert(node, bone);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_bone.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_bone.is_empty()
    }
}

impl SkeletonSource for HumanoidMap {
    fn is_humanoid(&self) -> bool {
        self.by_bone.contains_key(&HumanBone::Hips)
    }

    fn canonical_bone(&self, node: NodeId) -> Option<HumanBone> {
        self.by_node.get(&node).copied()
    }

    fn bone_node(&self, bone: HumanBone) -> Option<NodeId> {
        self.by_bone.get(&bone).copied()
    }
}
