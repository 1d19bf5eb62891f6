//! # scenestack
//!
//! **A small scene-graph renderer with a triple-buffered frame loop.**
//!
//! Build a tree of [`DrawableNode`]s, give them meshes, textures and a
//! per-frame animation, and hand the [`Scene`] to a [`FrameOrchestrator`].
//! Each tick animates the tree, writes one uniform block per drawable into a
//! ring of in-flight buffers, records the draws and presents.
//!
//! ## Quick Start
//!
//! ```no_run
//! use scenestack::*;
//!
//! fn main() -> Result<()> {
//!     run(AppConfig::new().title("Spinning cube"), |backend| {
//!         let mut scene = Scene::new();
//!         let cube = Mesh::upload(backend, &MeshData::cube())?;
//!         let texture = backend.create_texture(&ImageAsset::solid("white", [255; 4]))?;
//!
//!         let mesh = scene.assets.add_mesh(cube);
//!         let material = scene.assets.add_material(Material::textured(texture));
//!
//!         let node = DrawableNode::new("cube")
//!             .with_mesh(mesh)
//!             .with_material(material)
//!             .with_animation(|transform, _, frame| {
//!                 transform.rotate(Vec3::Y, frame.time);
//!             });
//!         scene.add_child(scene.root(), node)?;
//!         scene.add_light(Light::directional_default())?;
//!         Ok(scene)
//!     })
//! }
//! ```
//!
//! ## Layout
//!
//! - [`TransformStack`] keeps a node's local transform as a stack of matrices.
//! - [`UniformRing`] hands out per-frame uniform slots, blocking while all of
//!   them are still owned by the GPU.
//! - [`backend::GraphicsBackend`] is the only seam to the GPU. Tests run the
//!   whole frame loop against [`backend::HeadlessBackend`].

mod app;
mod assets;
pub mod backend;
mod camera;
mod config;
pub mod demo;
mod error;
mod gpu;
mod input;
mod light;
mod mesh;
mod orchestrator;
mod ring;
pub mod scene;
mod texture;
mod transform;
mod uniforms;

pub use app::run;
pub use assets::{AssetLoader, AssetTable, Material, MaterialId, MeshId, parse_obj, parse_stl};
pub use backend::{
    BufferHandle, BufferUsage, CullMode, DepthMode, GraphicsBackend, HeadlessBackend,
    PipelineHandle, SamplerHandle, SamplerMode, SkipReason, TextureHandle, WgpuBackend,
};
pub use camera::Camera;
pub use config::{AppConfig, RendererConfig, ResetPolicy};
pub use error::{RenderError, Result};
pub use gpu::GpuContext;
pub use input::{DEFAULT_PAN_SENSITIVITY, PanTracker};
pub use light::{Light, LightBlock, LightRaw, MAX_LIGHTS};
pub use mesh::{Mesh, MeshData, Submesh, SubmeshData, Vertex3d};
pub use orchestrator::{
    FrameOrchestrator, FrameOutcome, FrameState, scene_pipeline_desc, sky_pipeline_desc,
};
pub use ring::{FrameSemaphore, RingSignal, SlotHandle, UniformRing};
pub use scene::{AnimationState, DrawItem, DrawableNode, FrameContext, NodeId, Scene};
pub use texture::ImageAsset;
pub use transform::{TransformId, TransformNode, TransformStack};
pub use uniforms::{DrawUniforms, normal_matrix};

// Re-export glam math types for convenience
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
