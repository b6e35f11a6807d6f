//! Skeleton hierarchy extraction
//!
//! Walks the scene under the export root, keeps the nodes the classifier
//! recognises as joints or end sites, and records each bone's bind pose
//! relative to its parent bone. Decorative intermediate nodes are passed
//! through transparently, so a joint's parent bone is its nearest joint
//! ancestor rather than its scene parent.

use glam::{Quat, Vec3};

use crate::classify::{BoneClassifier, Classification, JointRole};
use crate::error::ExportError;
use crate::humanoid::SkeletonSource;
use crate::scene::{NodeId, Scene};

/// Index of a bone in a [`Skeleton`]; bones are stored in pre-order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoneId(usize);

impl BoneId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoneKind {
    Root,
    Joint,
    /// Terminal marker with no channels and no children
    EndSite,
}

/// A node of the exported skeleton
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    /// Source scene node (read only)
    pub node: NodeId,
    pub kind: BoneKind,
    pub parent: Option<BoneId>,
    pub children: Vec<BoneId>,
    /// Bind-pose position, in the bone's own bind frame relative to its parent
    pub base_position: Vec3,
    /// Bind-pose rotation relative to the parent's world rotation
    pub base_rotation: Quat,
    /// Bind-pose world-space vector from the parent reference to this bone
    pub rest_offset: Vec3,
}

impl Bone {
    /// Root and joints carry rotation channels
    pub fn is_joint(&self) -> bool {
        self.kind != BoneKind::EndSite
    }
}

/// Bone tree built once per export
#[derive(Debug, Clone)]
pub struct Skeleton {
    bones: Vec<Bone>,
    /// Scene node standing in as the root's parent, if any
    anchor: Option<NodeId>,
}

impl Skeleton {
    pub fn root(&self) -> BoneId {
        BoneId(0)
    }

    pub fn bone(&self, id: BoneId) -> &Bone {
        &self.bones[id.0]
    }

    /// All bones in pre-order (output order)
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Bones with their ids, in pre-order
    pub fn iter(&self) -> impl Iterator<Item = (BoneId, &Bone)> + '_ {
        self.bones.iter().enumerate().map(|(i, bone)| (BoneId(i), bone))
    }

    pub fn anchor(&self) -> Option<NodeId> {
        self.anchor
    }

    /// Scene node whose world transform is the parent reference of `id`
    pub fn parent_node(&self, id: BoneId) -> Option<NodeId> {
        match self.bones[id.0].parent {
            Some(parent) => Some(self.bones[parent.0].node),
            None => self.anchor,
        }
    }

    /// Root plus joints
    pub fn joint_count(&self) -> usize {
        self.bones.iter().filter(|b| b.is_joint()).count()
    }

    pub fn end_site_count(&self) -> usize {
        self.bones.len() - self.joint_count()
    }

    /// Values per motion row: 6 for the root, 3 per other joint
    pub fn channel_count(&self) -> usize {
        6 + 3 * (self.joint_count() - 1)
    }

    /// Depth of `id` below the root (root is 0)
    pub fn depth(&self, id: BoneId) -> usize {
        let mut depth = 0;
        let mut current = self.bones[id.0].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.bones[parent.0].parent;
        }
        depth
    }

    /// Record bind-pose offsets from the scene's current (rest) pose
    fn capture_bind_pose(&mut self, scene: &Scene) {
        for i in 0..self.bones.len() {
            let parent = self.parent_node(BoneId(i));
            let bone = &mut self.bones[i];
            let (position, rotation) = scene.world_transform(bone.node);
            match parent {
                None => {
                    bone.base_rotation = rotation;
                    bone.base_position = position;
                    bone.rest_offset = Vec3::ZERO;
                }
                Some(parent) => {
                    let (parent_position, parent_rotation) = scene.world_transform(parent);
                    let base_rotation = parent_rotation.inverse() * rotation;
                    bone.base_rotation = base_rotation;
                    bone.base_position = base_rotation.inverse() * (position - parent_position);
                    bone.rest_offset = position - parent_position;
                }
            }
        }
    }
}

/// Bone under construction. The wrapper draft may have no scene node.
#[derive(Debug)]
struct Draft {
    name: Option<String>,
    node: Option<NodeId>,
    end_site: bool,
    children: Vec<usize>,
}

const WRAPPER: usize = 0;

/// Builds a [`Skeleton`] from the scene under one export target
pub struct HierarchyBuilder<'a, S: SkeletonSource + ?Sized> {
    scene: &'a Scene,
    classifier: BoneClassifier<'a, S>,
    root_motion: bool,
    drafts: Vec<Draft>,
}

impl<'a, S: SkeletonSource + ?Sized> HierarchyBuilder<'a, S> {
    pub fn new(scene: &'a Scene, skeleton: &'a S, target: NodeId, root_motion: bool) -> Self {
        Self {
            scene,
            classifier: BoneClassifier::new(scene, skeleton, target, root_motion),
            root_motion,
            drafts: Vec::new(),
        }
    }

    pub fn build(mut self, root: NodeId) -> Result<Skeleton, ExportError> {
        // A joint root needs its scene parent as the offset reference;
        // otherwise the chosen node itself wraps the joints found below it.
        let root_is_joint = self.classifier.joint_role(root).is_some();
        let wrapper_node = if root_is_joint {
            self.scene.parent(root)
        } else {
            Some(root)
        };
        self.drafts.push(Draft {
            name: wrapper_node.map(|n| self.scene.name(n).to_string()),
            node: wrapper_node,
            end_site: false,
            children: Vec::new(),
        });

        self.traverse(WRAPPER, root)?;

        let top_level = self.drafts[WRAPPER].children.len();
        if top_level != 1 {
            return Err(ExportError::AmbiguousRoot(top_level));
        }

        // With root motion and a non-joint root, the wrapper itself carries
        // the global displacement. Otherwise its only child is the root.
        let (root_draft, anchor) = if self.root_motion && !root_is_joint {
            (WRAPPER, None)
        } else {
            let child = self.drafts[WRAPPER].children[0];
            if self.drafts[child].end_site {
                return Err(ExportError::AmbiguousRoot(0));
            }
            (child, wrapper_node)
        };

        let mut skeleton = self.compact(root_draft, anchor)?;

        let unterminated: Vec<String> = skeleton
            .bones
            .iter()
            .filter(|b| b.is_joint() && b.children.is_empty())
            .map(|b| b.name.clone())
            .collect();
        if !unterminated.is_empty() {
            for name in &unterminated {
                tracing::error!("Bone '{}' is not terminated by '{}_end'", name, name);
            }
            return Err(ExportError::UnterminatedBranch(unterminated));
        }

        skeleton.capture_bind_pose(self.scene);

        tracing::debug!(
            "Built skeleton rooted at '{}': {} joints, {} end sites",
            skeleton.bone(skeleton.root()).name,
            skeleton.joint_count(),
            skeleton.end_site_count()
        );
        Ok(skeleton)
    }

    fn traverse(&mut self, parent: usize, node: NodeId) -> Result<(), ExportError> {
        let scene = self.scene;
        let class = self
            .classifier
            .classify(node, self.drafts[parent].name.as_deref());

        match class {
            Classification::Inactive => {
                tracing::debug!("Skipping inactive subtree '{}'", scene.name(node));
            }
            Classification::Joint(role) => {
                if let JointRole::Canonical(bone) = role {
                    tracing::debug!("Joint '{}' ({})", scene.name(node), bone);
                }
                let id = self.attach(parent, node, false)?;
                for &child in scene.children(node) {
                    self.traverse(id, child)?;
                }
            }
            Classification::EndSiteCandidate => {
                self.attach(parent, node, true)?;
            }
            Classification::Skip => {
                for &child in scene.children(node) {
                    self.traverse(parent, child)?;
                }
            }
        }
        Ok(())
    }

    fn attach(&mut self, parent: usize, node: NodeId, end_site: bool) -> Result<usize, ExportError> {
        // An end site must be its parent's first child. Joints may follow it.
        if end_site && !self.drafts[parent].children.is_empty() {
            return Err(ExportError::MisplacedEndSite {
                end_site: self.scene.name(node).to_string(),
                parent: self.drafts[parent].name.clone().unwrap_or_default(),
            });
        }

        let id = self.drafts.len();
        self.drafts.push(Draft {
            name: Some(self.scene.name(node).to_string()),
            node: Some(node),
            end_site,
            children: Vec::new(),
        });
        self.drafts[parent].children.push(id);
        Ok(id)
    }

    /// Flatten the drafts reachable from `root` into a pre-order bone arena
    fn compact(&self, root: usize, anchor: Option<NodeId>) -> Result<Skeleton, ExportError> {
        let mut bones: Vec<Bone> = Vec::new();
        let mut stack: Vec<(usize, Option<BoneId>)> = vec![(root, None)];

        while let Some((draft_id, parent)) = stack.pop() {
            let draft = &self.drafts[draft_id];
            // Only the wrapper can lack a node, and it is rooted here only
            // when it wraps the chosen root itself.
            let node = draft.node.ok_or(ExportError::AmbiguousRoot(0))?;
            let id = BoneId(bones.len());
            let kind = if parent.is_none() {
                BoneKind::Root
            } else if draft.end_site {
                BoneKind::EndSite
            } else {
                BoneKind::Joint
            };
            bones.push(Bone {
                name: draft.name.clone().unwrap_or_default(),
                node,
                kind,
                parent,
                children: Vec::new(),
                base_position: Vec3::ZERO,
                base_rotation: Quat::IDENTITY,
                rest_offset: Vec3::ZERO,
            });
            if let Some(parent) = parent {
                bones[parent.0].children.push(id);
            }
            for &child in draft.children.iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        Ok(Skeleton { bones, anchor })
    }
}
