//! Hierarchical transforms built with a push/pop matrix stack.
//!
//! A [`TransformStack`] owns a small tree of [`TransformNode`]s stored in an
//! arena. Each node holds its own 4×4 matrix plus an ordered list of children,
//! and composes to `model * (child_0 * child_1 * ... * child_n)`. Children are
//! combined strictly in insertion order, so two sibling branches with
//! non-commuting matrices produce different results if swapped.
//!
//! The stack keeps a cursor into the tree. [`push`](TransformStack::push)
//! creates a child under the cursor and moves into it;
//! [`pop`](TransformStack::pop) moves back to the owner. Mutators such as
//! [`translate`](TransformStack::translate) only touch the node under the
//! cursor, which is what allows "translate, then inside that do two
//! independent rotations":
//!
//! ```
//! use scenestack::{TransformStack, Vec3};
//!
//! let mut stack = TransformStack::new();
//! stack.translate(Vec3::new(0.0, 0.0, -2.0));
//! stack.in_sub_transform(|orbit| {
//!     orbit.rotate(Vec3::Y, 0.5);
//!     orbit.in_sub_transform(|arm| arm.translate(Vec3::new(0.0, 0.0, 2.0)));
//! });
//! let world = stack.compose();
//! # let _ = world;
//! ```
//!
//! Popped nodes are never removed: they stay in the tree and keep
//! contributing to [`compose`](TransformStack::compose) until
//! [`reset`](TransformStack::reset) discards the whole tree.

use glam::{Mat4, Quat, Vec3};

/// Index of a node inside a [`TransformStack`] arena.
///
/// Ids are only meaningful for the stack that produced them and are
/// invalidated by [`TransformStack::reset`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransformId(usize);

impl TransformId {
    /// Returns the arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single transform plus its ordered children.
///
/// `owner` is a non-owning back-reference used only by
/// [`TransformStack::pop`]; ownership flows strictly from parent to children.
#[derive(Clone, Debug)]
pub struct TransformNode {
    /// This node's own matrix.
    pub model: Mat4,
    children: Vec<TransformId>,
    owner: Option<TransformId>,
}

impl TransformNode {
    fn new(owner: Option<TransformId>) -> Self {
        Self {
            model: Mat4::IDENTITY,
            children: Vec::new(),
            owner,
        }
    }

    /// Child nodes in composition order.
    pub fn children(&self) -> &[TransformId] {
        &self.children
    }

    /// The node this one was pushed from, or `None` for the root.
    pub fn owner(&self) -> Option<TransformId> {
        self.owner
    }

    /// Returns true if this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Push/pop cursor over a tree of [`TransformNode`]s.
#[derive(Clone, Debug)]
pub struct TransformStack {
    nodes: Vec<TransformNode>,
    current: TransformId,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self {
            nodes: vec![TransformNode::new(None)],
            current: Self::ROOT,
        }
    }
}

impl TransformStack {
    /// Id of the root node. Always valid.
    pub const ROOT: TransformId = TransformId(0);

    /// Creates a stack holding a single identity root node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stack whose root node starts at `model`.
    pub fn from_matrix(model: Mat4) -> Self {
        let mut stack = Self::new();
        stack.nodes[0].model = model;
        stack
    }

    /// The node under the cursor.
    pub fn current(&self) -> TransformId {
        self.current
    }

    /// Looks up a node by id.
    pub fn node(&self, id: TransformId) -> Option<&TransformNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes in the tree, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root node cannot be removed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nesting depth of the cursor; zero at the root.
    ///
    /// A balanced sequence of pushes and pops returns this to its prior value.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.nodes[self.current.0].owner;
        while let Some(owner) = cursor {
            depth += 1;
            cursor = self.nodes[owner.0].owner;
        }
        depth
    }

    /// Own matrix of the node under the cursor.
    pub fn current_matrix(&self) -> Mat4 {
        self.nodes[self.current.0].model
    }

    /// Composes the whole tree into a single matrix.
    pub fn compose(&self) -> Mat4 {
        self.compose_node(Self::ROOT)
    }

    /// Composes the subtree rooted at `id`.
    ///
    /// A leaf returns its own matrix. Otherwise the children's composed
    /// matrices are multiplied left to right in child order, and the result is
    /// left-multiplied by the node's own matrix.
    pub fn compose_node(&self, id: TransformId) -> Mat4 {
        let node = &self.nodes[id.0];
        if node.children.is_empty() {
            return node.model;
        }
        let children = node
            .children
            .iter()
            .fold(Mat4::IDENTITY, |acc, &child| acc * self.compose_node(child));
        node.model * children
    }

    /// Creates a child under the cursor and moves the cursor into it.
    pub fn push(&mut self) -> TransformId {
        let id = TransformId(self.nodes.len());
        self.nodes.push(TransformNode::new(Some(self.current)));
        self.nodes[self.current.0].children.push(id);
        self.current = id;
        id
    }

    /// Moves the cursor back to its owner. A no-op at the root.
    pub fn pop(&mut self) {
        if let Some(owner) = self.nodes[self.current.0].owner {
            self.current = owner;
        }
    }

    /// Runs `f` inside a freshly pushed sub-transform, then pops.
    pub fn in_sub_transform<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push();
        let result = f(self);
        self.pop();
        result
    }

    /// Discards the tree and starts over with a single identity root.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.nodes.push(TransformNode::new(None));
        self.current = Self::ROOT;
    }

    /// Replaces the matrix of the node under the cursor.
    pub fn set_matrix(&mut self, model: Mat4) {
        self.nodes[self.current.0].model = model;
    }

    /// Post-multiplies the current node's matrix by `op`.
    pub fn apply(&mut self, op: Mat4) {
        let node = &mut self.nodes[self.current.0];
        node.model *= op;
    }

    /// Translates the current node.
    pub fn translate(&mut self, offset: Vec3) {
        self.apply(Mat4::from_translation(offset));
    }

    /// Rotates the current node by `angle` radians about `axis`.
    ///
    /// A zero-length axis leaves the node unchanged.
    pub fn rotate(&mut self, axis: Vec3, angle: f32) {
        let Some(axis) = axis.try_normalize() else {
            return;
        };
        self.apply(Mat4::from_quat(Quat::from_axis_angle(axis, angle)));
    }

    /// Rotates the current node by Euler angles applied X, then Y, then Z.
    pub fn rotate_xyz(&mut self, angles: Vec3) {
        self.apply(
            Mat4::from_rotation_x(angles.x)
                * Mat4::from_rotation_y(angles.y)
                * Mat4::from_rotation_z(angles.z),
        );
    }

    /// Uniformly scales the current node.
    pub fn scale(&mut self, factor: f32) {
        self.apply(Mat4::from_scale(Vec3::splat(factor)));
    }

    /// Scales the current node per axis.
    pub fn scale_xyz(&mut self, factors: Vec3) {
        self.apply(Mat4::from_scale(factors));
    }
}
