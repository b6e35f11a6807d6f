//! Per-frame pose sampling
//!
//! Reads the posed scene into one row of channel values. Rotations are taken
//! relative to each bone's bind pose and its parent bone's current world
//! rotation, not from the scene's native local rotation, so an export root
//! that is not the scene parent of its joints still yields correct channels.

use glam::{Quat, Vec3};

use crate::convert::{CoordinateConverter, euler_yxz_degrees};
use crate::hierarchy::{BoneId, BoneKind, Skeleton};
use crate::scene::Scene;

/// One motion row, in the order the CHANNELS lines declare
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameSample {
    values: Vec<f32>,
}

impl FrameSample {
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn push_position(&mut self, position: Vec3) {
        self.values.extend_from_slice(&[position.x, position.y, position.z]);
    }

    fn push_rotation(&mut self, rotation: Quat) {
        let (y, x, z) = euler_yxz_degrees(rotation);
        self.values.extend_from_slice(&[y, x, z]);
    }
}

pub struct PoseSampler<'k> {
    skeleton: &'k Skeleton,
    converter: CoordinateConverter,
    /// Root world transform at bind pose, when exporting root motion
    motion_baseline: Option<(Vec3, Quat)>,
}

impl<'k> PoseSampler<'k> {
    /// Must be created while the scene is still in its rest pose
    pub fn new(
        skeleton: &'k Skeleton,
        scene: &Scene,
        root_motion: bool,
        converter: CoordinateConverter,
    ) -> Self {
        let motion_baseline =
            root_motion.then(|| scene.world_transform(skeleton.bone(skeleton.root()).node));
        Self {
            skeleton,
            converter,
            motion_baseline,
        }
    }

    pub fn sample(&self, scene: &Scene) -> FrameSample {
        let mut row = FrameSample {
            values: Vec::with_capacity(self.skeleton.channel_count()),
        };

        for (id, bone) in self.skeleton.iter() {
            match bone.kind {
                BoneKind::Root => {
                    let (position, rotation) = self.root_channels(scene, id);
                    row.push_position(self.converter.position(position));
                    row.push_rotation(self.converter.rotation(rotation));
                }
                BoneKind::Joint => {
                    let rotation = self.local_rotation(scene, id);
                    row.push_rotation(self.converter.rotation(rotation));
                }
                BoneKind::EndSite => {}
            }
        }

        debug_assert_eq!(row.len(), self.skeleton.channel_count());
        row
    }

    fn root_channels(&self, scene: &Scene, id: BoneId) -> (Vec3, Quat) {
        let bone = self.skeleton.bone(id);
        let (position, rotation) = scene.world_transform(bone.node);

        if let Some((base_position, base_rotation)) = self.motion_baseline {
            return (position - base_position, rotation * base_rotation.inverse());
        }

        let offset = match self.skeleton.parent_node(id) {
            Some(parent) => position - scene.world_position(parent),
            None => position - bone.base_position,
        };
        (offset, self.local_rotation(scene, id))
    }

    /// Rotation relative to the bone's own bind pose
    fn local_rotation(&self, scene: &Scene, id: BoneId) -> Quat {
        let bone = self.skeleton.bone(id);
        let rotation = scene.world_rotation(bone.node);
        match self.skeleton.parent_node(id) {
            Some(parent) => {
                bone.base_rotation.inverse() * scene.world_rotation(parent).inverse() * rotation
            }
            None => bone.base_rotation.inverse() * rotation,
        }
    }
}
