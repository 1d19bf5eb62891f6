//! Drawable nodes and their per-frame animation hooks.

use crate::assets::{MaterialId, MeshId};
use crate::transform::TransformStack;
use glam::{Mat4, Vec2, Vec3};
use slotmap::new_key_type;

new_key_type! {
    /// Key of a node inside a [`Scene`](super::Scene).
    pub struct NodeId;
}

/// Per-tick inputs handed to every animation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameContext {
    /// Seconds of animation time since the orchestrator started.
    pub time: f32,
    /// Animation time advanced by this tick.
    pub delta: f32,
    /// Number of ticks before this one.
    pub frame_index: u64,
    /// Pan gesture movement since the previous tick, in view widths scaled
    /// by the pan sensitivity.
    pub pan_delta: Vec2,
}

/// Mutable state an animation carries from one tick to the next.
///
/// Lives next to the node instead of inside the closure so the orchestrator
/// can inspect and reset it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AnimationState {
    /// Accumulated rotation in radians.
    pub rotation: f32,
    /// Accumulated translation.
    pub offset: Vec3,
}

/// Signature of a per-frame animation.
pub type AnimationFn = dyn FnMut(&mut TransformStack, &mut AnimationState, &FrameContext);

pub(crate) struct Animation {
    pub(crate) state: AnimationState,
    pub(crate) update: Box<AnimationFn>,
}

/// A named node of the scene graph.
///
/// A node is drawn when it references a mesh and a material with a base
/// colour texture; otherwise it only contributes its transform to its
/// children.
pub struct DrawableNode {
    name: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Static placement relative to the parent. Never touched by resets.
    pub local: Mat4,
    /// Per-frame transform built by the animation, applied after `local`.
    pub transform: TransformStack,
    pub mesh: Option<MeshId>,
    pub material: Option<MaterialId>,
    pub(crate) animation: Option<Animation>,
}

impl DrawableNode {
    /// An empty node: identity transform, nothing to draw.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            local: Mat4::IDENTITY,
            transform: TransformStack::new(),
            mesh: None,
            material: None,
            animation: None,
        }
    }

    pub fn with_mesh(mut self, mesh: MeshId) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    /// Places the node at `model` relative to its parent.
    pub fn with_transform(mut self, model: Mat4) -> Self {
        self.local = model;
        self
    }

    /// Attaches an animation run once per tick before drawing.
    pub fn with_animation(
        mut self,
        update: impl FnMut(&mut TransformStack, &mut AnimationState, &FrameContext) + 'static,
    ) -> Self {
        self.set_animation(update);
        self
    }

    /// Replaces the animation and clears its state.
    pub fn set_animation(
        &mut self,
        update: impl FnMut(&mut TransformStack, &mut AnimationState, &FrameContext) + 'static,
    ) {
        self.animation = Some(Animation {
            state: AnimationState::default(),
            update: Box::new(update),
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in draw order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_animated(&self) -> bool {
        self.animation.is_some()
    }

    pub fn animation_state(&self) -> Option<&AnimationState> {
        self.animation.as_ref().map(|a| &a.state)
    }

    /// The static placement followed by the animated transform.
    pub fn local_matrix(&self) -> Mat4 {
        self.local * self.transform.compose()
    }
}

impl std::fmt::Debug for DrawableNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawableNode")
            .field("name", &self.name)
            .field("children", &self.children.len())
            .field("mesh", &self.mesh)
            .field("material", &self.material)
            .field("animated", &self.animation.is_some())
            .finish()
    }
}
