//! The scene graph.
//!
//! A [`Scene`] is a tree of [`DrawableNode`]s stored in a slot map and
//! addressed by [`NodeId`]. Alongside the tree it holds the lighting
//! environment, an optional sky node drawn before everything else, and the
//! [`AssetTable`] the nodes' mesh and material ids point into.
//!
//! # Example
//!
//! ```
//! use scenestack::{DrawableNode, Mat4, Scene, Vec3};
//!
//! let mut scene = Scene::new();
//! let root = scene.root();
//! let bob = scene
//!     .add_child(
//!         root,
//!         DrawableNode::new("bob").with_animation(|stack, _, frame| {
//!             stack.translate(Vec3::new(0.0, 0.15 * frame.time.sin(), 0.0));
//!         }),
//!     )
//!     .unwrap();
//!
//! assert_eq!(scene.find_by_name("bob"), Some(bob));
//! assert_eq!(scene.find_by_name("missing"), None);
//! # let _ = Mat4::IDENTITY;
//! ```

mod node;

pub use node::{AnimationFn, AnimationState, DrawableNode, FrameContext, NodeId};

use crate::assets::{AssetTable, Material};
use crate::config::ResetPolicy;
use crate::error::{RenderError, Result};
use crate::light::{Light, MAX_LIGHTS};
use crate::mesh::Mesh;
use glam::{Mat4, Vec3};
use slotmap::{Key, SlotMap};

/// A drawable that passed the eligibility check, with its resolved assets.
#[derive(Clone, Copy, Debug)]
pub struct DrawItem<'a> {
    pub id: NodeId,
    pub node: &'a DrawableNode,
    pub mesh: &'a Mesh,
    pub material: &'a Material,
    /// Product of every ancestor's local matrix and the node's own.
    pub world: Mat4,
}

/// A scene graph plus its lighting environment and assets.
pub struct Scene {
    nodes: SlotMap<NodeId, DrawableNode>,
    root: NodeId,
    sky: Option<NodeId>,
    /// Ambient colour added to every lit surface.
    pub ambient_color: Vec3,
    lights: Vec<Light>,
    /// Meshes and materials referenced by the nodes.
    pub assets: AssetTable,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// An empty scene holding only a root node named `"root"`.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(DrawableNode::new("root"));
        Self {
            nodes,
            root,
            sky: None,
            ambient_color: Vec3::ZERO,
            lights: Vec::new(),
            assets: AssetTable::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The sky node, if one was set.
    pub fn sky(&self) -> Option<NodeId> {
        self.sky
    }

    pub fn node(&self, id: NodeId) -> Option<&DrawableNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut DrawableNode> {
        self.nodes.get_mut(id)
    }

    /// Number of nodes, root and sky included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a scene has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends `node` as the last child of `parent`.
    ///
    /// Names are unique within the graph; a name already in use is rejected.
    pub fn add_child(&mut self, parent: NodeId, mut node: DrawableNode) -> Result<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(invalid_node(parent));
        }
        if self.find_by_name(node.name()).is_some() {
            log::warn!("Rejecting duplicate node name '{}'", node.name());
            return Err(RenderError::DuplicateNode(node.name().to_owned()));
        }
        node.parent = Some(parent);
        let id = self.nodes.insert(node);
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    /// Installs the sky node, replacing any previous one.
    ///
    /// The sky lives outside the tree: it is not reachable from the root and
    /// is drawn first using the root's matrix.
    pub fn set_sky(&mut self, node: DrawableNode) -> NodeId {
        if let Some(old) = self.sky.take() {
            self.nodes.remove(old);
        }
        let id = self.nodes.insert(node);
        self.sky = Some(id);
        id
    }

    /// Adds a light. Fails once [`MAX_LIGHTS`] are present.
    pub fn add_light(&mut self, light: Light) -> Result<()> {
        if self.lights.len() >= MAX_LIGHTS {
            return Err(RenderError::TooManyLights { max: MAX_LIGHTS });
        }
        self.lights.push(light);
        Ok(())
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [Light] {
        &mut self.lights
    }

    /// Depth-first search from the root; the first node named `name` wins.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node.name() == name {
                return Some(id);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Resolves a node's mesh and material if it can be drawn.
    ///
    /// A node is drawable when its mesh exists and its material has a base
    /// colour texture.
    pub fn resolve(&self, node: &DrawableNode) -> Option<(&Mesh, &Material)> {
        let mesh = self.assets.mesh(node.mesh?)?;
        let material = self.assets.material(node.material?)?;
        material.base_color?;
        Some((mesh, material))
    }

    /// World matrix of the root, which the sky is drawn with.
    pub fn root_matrix(&self) -> Mat4 {
        self.nodes[self.root].local_matrix()
    }

    /// The sky as a draw item, if it is set and drawable.
    pub fn sky_item(&self) -> Option<DrawItem<'_>> {
        let id = self.sky?;
        let node = &self.nodes[id];
        let (mesh, material) = self.resolve(node)?;
        Some(DrawItem {
            id,
            node,
            mesh,
            material,
            world: self.root_matrix() * node.local_matrix(),
        })
    }

    /// Visits every drawable node depth-first with its world matrix.
    ///
    /// Nodes that cannot be drawn are not visited but still pass their
    /// transform down to their children.
    pub fn for_each_drawable<F>(&self, mut visitor: F)
    where
        F: FnMut(DrawItem<'_>),
    {
        // The visitor cannot fail, so neither can the walk.
        let _ = self.try_for_each_drawable(|item| {
            visitor(item);
            Ok(())
        });
    }

    /// Like [`for_each_drawable`](Self::for_each_drawable), stopping at the
    /// first error the visitor returns.
    pub fn try_for_each_drawable<F>(&self, mut visitor: F) -> Result<()>
    where
        F: FnMut(DrawItem<'_>) -> Result<()>,
    {
        let mut stack = vec![(self.root, Mat4::IDENTITY)];
        while let Some((id, parent_world)) = stack.pop() {
            let node = &self.nodes[id];
            let world = parent_world * node.local_matrix();
            if let Some((mesh, material)) = self.resolve(node) {
                visitor(DrawItem {
                    id,
                    node,
                    mesh,
                    material,
                    world,
                })?;
            }
            stack.extend(node.children.iter().rev().map(|&child| (child, world)));
        }
        Ok(())
    }

    /// Runs every node's animation once. Returns how many ran.
    ///
    /// With [`ResetPolicy::Central`] each animated node's stack is reset
    /// first; with [`ResetPolicy::Manual`] the animation owns that step.
    pub fn animate(&mut self, frame: &FrameContext, policy: ResetPolicy) -> usize {
        let mut count = 0;
        for node in self.nodes.values_mut() {
            let Some(animation) = node.animation.as_mut() else {
                continue;
            };
            if policy == ResetPolicy::Central {
                node.transform.reset();
            }
            (animation.update)(&mut node.transform, &mut animation.state, frame);
            let depth = node.transform.depth();
            if depth != 0 {
                log::debug!(
                    "Animation of '{}' left its transform stack {} level(s) deep",
                    node.name(),
                    depth
                );
            }
            count += 1;
        }
        count
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("nodes", &self.nodes.len())
            .field("sky", &self.sky.is_some())
            .field("lights", &self.lights.len())
            .field("assets", &self.assets)
            .finish()
    }
}

fn invalid_node(id: NodeId) -> RenderError {
    RenderError::InvalidHandle {
        kind: "node",
        index: id.data().as_ffi() as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{MaterialId, MeshId};
    use crate::backend::{GraphicsBackend, HeadlessBackend};
    use crate::mesh::MeshData;
    use crate::texture::ImageAsset;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    /// A scene whose asset table holds one cube mesh and two materials: one
    /// textured, one without a texture.
    fn scene_with_assets() -> (Scene, MeshId, MaterialId, MaterialId) {
        let mut backend = HeadlessBackend::new(64, 64);
        let mut scene = Scene::new();
        let mesh = Mesh::upload(&mut backend, &MeshData::cube()).unwrap();
        let mesh = scene.assets.add_mesh(mesh);
        let texture = backend
            .create_texture(&ImageAsset::solid("white", [255; 4]))
            .unwrap();
        let textured = scene.assets.add_material(Material::textured(texture));
        let bare = scene.assets.add_material(Material::default());
        (scene, mesh, textured, bare)
    }

    #[test]
    fn finds_nodes_depth_first() {
        let mut scene = Scene::new();
        let root = scene.root();
        let fish = scene.add_child(root, DrawableNode::new("fish")).unwrap();
        let bob = scene.add_child(root, DrawableNode::new("bob")).unwrap();
        let nested = scene.add_child(fish, DrawableNode::new("blub 1")).unwrap();

        assert_eq!(scene.find_by_name("bob"), Some(bob));
        assert_eq!(scene.find_by_name("blub 1"), Some(nested));
        assert_eq!(scene.find_by_name("root"), Some(root));
        assert_eq!(scene.find_by_name("missing"), None);
        assert_eq!(scene.node(nested).unwrap().parent(), Some(fish));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut scene = Scene::new();
        let root = scene.root();
        let fish = scene.add_child(root, DrawableNode::new("fish")).unwrap();
        let bob = scene.add_child(root, DrawableNode::new("bob")).unwrap();

        assert!(matches!(
            scene.add_child(fish, DrawableNode::new("bob")),
            Err(RenderError::DuplicateNode(name)) if name == "bob"
        ));
        assert_eq!(scene.len(), 3);
        assert!(scene.node(fish).unwrap().children().is_empty());
        assert_eq!(scene.find_by_name("bob"), Some(bob));
    }

    #[test]
    fn add_child_rejects_unknown_parent() {
        let mut scene = Scene::new();
        assert!(matches!(
            scene.add_child(NodeId::default(), DrawableNode::new("orphan")),
            Err(RenderError::InvalidHandle { kind: "node", .. })
        ));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn traversal_composes_parent_then_child() {
        let (mut scene, mesh, textured, _) = scene_with_assets();
        let root = scene.root();
        let parent = scene
            .add_child(
                root,
                DrawableNode::new("parent")
                    .with_transform(Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0))),
            )
            .unwrap();
        let child = scene
            .add_child(
                parent,
                DrawableNode::new("child")
                    .with_mesh(mesh)
                    .with_material(textured)
                    .with_transform(Mat4::from_rotation_z(FRAC_PI_2)),
            )
            .unwrap();
        // rotate first, then translate by the parent
        let child_translation = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        scene.node_mut(child).unwrap().transform.apply(child_translation);

        let mut visited = Vec::new();
        scene.for_each_drawable(|item| visited.push((item.id, item.world)));

        assert_eq!(visited.len(), 1);
        assert_eq!(visited[0].0, child);
        let origin = visited[0].1.transform_point3(Vec3::ZERO);
        // (0,2,0) rotated a quarter turn about Z is (-2,0,0), then +1 on X
        assert_relative_eq!(origin.x, -1.0, epsilon = 1e-5);
        assert_relative_eq!(origin.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn untextured_nodes_are_skipped_but_their_children_drawn() {
        let (mut scene, mesh, textured, bare) = scene_with_assets();
        let root = scene.root();
        let hidden = scene
            .add_child(
                root,
                DrawableNode::new("hidden")
                    .with_mesh(mesh)
                    .with_material(bare)
                    .with_transform(Mat4::from_translation(Vec3::X)),
            )
            .unwrap();
        let shown = scene
            .add_child(
                hidden,
                DrawableNode::new("shown").with_mesh(mesh).with_material(textured),
            )
            .unwrap();
        scene
            .add_child(root, DrawableNode::new("no mesh").with_material(textured))
            .unwrap();

        let mut visited = Vec::new();
        scene.for_each_drawable(|item| visited.push((item.id, item.world)));
        assert_eq!(visited.len(), 1);
        assert_eq!(visited[0].0, shown);
        assert_eq!(visited[0].1, Mat4::from_translation(Vec3::X));
    }

    #[test]
    fn children_are_visited_in_insertion_order() {
        let (mut scene, mesh, textured, _) = scene_with_assets();
        let root = scene.root();
        let names = ["a", "b", "c"];
        for name in names {
            scene
                .add_child(root, DrawableNode::new(name).with_mesh(mesh).with_material(textured))
                .unwrap();
        }
        let mut order = Vec::new();
        scene.for_each_drawable(|item| order.push(item.node.name().to_owned()));
        assert_eq!(order, names);
    }

    #[test]
    fn try_for_each_stops_at_first_error() {
        let (mut scene, mesh, textured, _) = scene_with_assets();
        let root = scene.root();
        for name in ["a", "b"] {
            scene
                .add_child(root, DrawableNode::new(name).with_mesh(mesh).with_material(textured))
                .unwrap();
        }
        let mut seen = 0;
        let result = scene.try_for_each_drawable(|_| {
            seen += 1;
            Err(RenderError::TooManyLights { max: 3 })
        });
        assert!(result.is_err());
        assert_eq!(seen, 1);
    }

    #[test]
    fn sky_is_outside_the_tree() {
        let (mut scene, mesh, textured, _) = scene_with_assets();
        scene
            .node_mut(scene.root())
            .unwrap()
            .transform
            .rotate(Vec3::Y, 1.0);
        let sky = scene.set_sky(DrawableNode::new("sky").with_mesh(mesh).with_material(textured));

        assert_eq!(scene.find_by_name("sky"), None);
        let mut drawn = 0;
        scene.for_each_drawable(|_| drawn += 1);
        assert_eq!(drawn, 0);

        let item = scene.sky_item().unwrap();
        assert_eq!(item.id, sky);
        assert!(item.world.abs_diff_eq(Mat4::from_rotation_y(1.0), 1e-6));

        scene.set_sky(DrawableNode::new("sky 2"));
        assert!(scene.node(sky).is_none());
        assert!(scene.sky_item().is_none());
    }

    #[test]
    fn at_most_three_lights() {
        let mut scene = Scene::new();
        for _ in 0..MAX_LIGHTS {
            scene.add_light(Light::point(Vec3::ONE, Vec3::ONE)).unwrap();
        }
        assert!(matches!(
            scene.add_light(Light::directional_default()),
            Err(RenderError::TooManyLights { max: 3 })
        ));
        assert_eq!(scene.lights().len(), 3);
    }

    #[test]
    fn central_reset_rebuilds_each_tick() {
        let mut scene = Scene::new();
        let root = scene.root();
        let bob = scene
            .add_child(
                root,
                DrawableNode::new("bob").with_animation(|stack, state, frame| {
                    state.rotation += 1.0;
                    stack.in_sub_transform(|sub| {
                        sub.translate(Vec3::new(0.0, 0.15 * frame.time.sin(), 0.0));
                    });
                }),
            )
            .unwrap();

        let frame = FrameContext {
            time: FRAC_PI_2,
            ..Default::default()
        };
        assert_eq!(scene.animate(&frame, ResetPolicy::Central), 1);
        assert_eq!(scene.animate(&frame, ResetPolicy::Central), 1);

        let node = scene.node(bob).unwrap();
        assert_eq!(node.transform.len(), 2);
        assert_eq!(node.animation_state().unwrap().rotation, 2.0);
        let y = node.local_matrix().w_axis.y;
        assert_relative_eq!(y, 0.15, epsilon = 1e-5);
    }

    #[test]
    fn static_placement_survives_central_reset() {
        let mut scene = Scene::new();
        let root = scene.root();
        let bob = scene
            .add_child(
                root,
                DrawableNode::new("bob")
                    .with_transform(Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)))
                    .with_animation(|stack, _, frame| {
                        stack.translate(Vec3::new(0.0, 0.15 * frame.time.sin(), 0.0));
                    }),
            )
            .unwrap();

        let frame = FrameContext {
            time: FRAC_PI_2,
            ..Default::default()
        };
        scene.animate(&frame, ResetPolicy::Central);
        scene.animate(&frame, ResetPolicy::Central);

        let origin = scene
            .node(bob)
            .unwrap()
            .local_matrix()
            .transform_point3(Vec3::ZERO);
        assert_relative_eq!(origin.x, 5.0, epsilon = 1e-5);
        assert_relative_eq!(origin.y, 0.15, epsilon = 1e-5);
    }

    #[test]
    fn manual_reset_accumulates_stale_branches() {
        let mut scene = Scene::new();
        let root = scene.root();
        let bob = scene
            .add_child(
                root,
                DrawableNode::new("bob").with_animation(|stack, _, _| {
                    stack.in_sub_transform(|sub| sub.translate(Vec3::Y));
                }),
            )
            .unwrap();

        let frame = FrameContext::default();
        scene.animate(&frame, ResetPolicy::Manual);
        scene.animate(&frame, ResetPolicy::Manual);

        let node = scene.node(bob).unwrap();
        assert_eq!(node.transform.len(), 3);
        assert_relative_eq!(node.local_matrix().w_axis.y, 2.0, epsilon = 1e-5);
    }
}
