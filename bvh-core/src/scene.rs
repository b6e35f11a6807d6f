//! Scene graph snapshot
//!
//! A flat arena of named nodes with parent-relative transforms. This is the
//! state the animation evaluator writes poses into and the hierarchy builder
//! and pose sampler read world transforms from.

use glam::{Quat, Vec3};

/// Index of a node in a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single scene node
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Inactive nodes and their subtrees are ignored by the hierarchy builder
    pub active: bool,
    pub local_position: Vec3,
    pub local_rotation: Quat,
}

/// Scene graph arena. Nodes are never removed; child order is insertion order.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node under `parent` (or as a scene root) with an identity transform
    pub fn add_node(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.into(),
            parent,
            children: Vec::new(),
            active: true,
            local_position: Vec3::ZERO,
            local_rotation: Quat::IDENTITY,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn is_active(&self, id: NodeId) -> bool {
        self.nodes[id.0].active
    }

    pub fn set_active(&mut self, id: NodeId, active: bool) {
        self.nodes[id.0].active = active;
    }

    pub fn local_position(&self, id: NodeId) -> Vec3 {
        self.nodes[id.0].local_position
    }

    pub fn local_rotation(&self, id: NodeId) -> Quat {
        self.nodes[id.0].local_rotation
    }

    pub fn set_local_position(&mut self, id: NodeId, position: Vec3) {
        self.nodes[id.0].local_position = position;
    }

    pub fn set_local_rotation(&mut self, id: NodeId, rotation: Quat) {
        self.nodes[id.0].local_rotation = rotation;
    }

    /// World-space position and rotation, composed from the scene root down
    pub fn world_transform(&self, id: NodeId) -> (Vec3, Quat) {
        let node = &self.nodes[id.0];
        match node.parent {
            None => (node.local_position, node.local_rotation),
            Some(parent) => {
                let (parent_position, parent_rotation) = self.world_transform(parent);
                (
                    parent_position + parent_rotation * node.local_position,
                    (parent_rotation * node.local_rotation).normalize(),
                )
            }
        }
    }

    pub fn world_position(&self, id: NodeId) -> Vec3 {
        self.world_transform(id).0
    }

    pub fn world_rotation(&self, id: NodeId) -> Quat {
        self.world_transform(id).1
    }

    /// True if `ancestor` is `node` itself or any node on its parent chain
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id.0].parent;
        }
        false
    }

    /// Direct child of `parent` with exactly this name
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.name(child) == name)
    }

    /// First node with this name, searching every scene root in pre-order
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.roots()
            .flat_map(|root| self.pre_order(root))
            .find(|&id| self.name(id) == name)
    }

    /// Nodes without a parent, in insertion order
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(i, _)| NodeId(i))
    }

    /// `root` and all its descendants (active or not) in pre-order
    pub fn pre_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }
}
