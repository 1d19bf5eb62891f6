//! Per-frame driver: animate, encode, submit.
//!
//! One [`FrameOrchestrator::tick`] runs the whole frame on the calling thread:
//!
//! 1. **Updating**: advance the time by `1 / preferred_fps`, then run every
//!    drawable's animation at the new time.
//! 2. **Encoding**: walk the sky and then the scene graph. Each drawable takes
//!    the next slot of its own [`UniformRing`], blocking (with the configured
//!    timeout) while every slot is still in flight, and gets its
//!    [`DrawUniforms`] written. Binds and draws are recorded into the
//!    backend's [`FrameEncoder`].
//! 3. **Submitted**: the encoder is handed to the backend with a completion
//!    callback that releases one slot on every ring used by the frame.
//!
//! A tick that cannot get a drawable returns [`FrameOutcome::Skipped`]; one
//! whose ring acquisition times out returns [`FrameOutcome::Dropped`]. In both
//! cases the slots taken so far are cancelled newest first, which hands them
//! back and rewinds each ring onto them. Slots still owned by earlier frames
//! are left alone.

use crate::assets::Material;
use crate::backend::{
    Binding, BufferHandle, CullMode, DepthMode, FrameEncoder, GraphicsBackend, PipelineDesc,
    PipelineHandle, SamplerHandle, SamplerMode, ShaderProgram, SkipReason, TextureHandle,
};
use crate::config::RendererConfig;
use crate::error::{RenderError, Result};
use crate::light::LightBlock;
use crate::mesh::{Submesh, Vertex3d};
use crate::ring::{SlotHandle, UniformRing};
use crate::scene::{DrawItem, FrameContext, NodeId, Scene};
use crate::uniforms::DrawUniforms;
use glam::{Mat4, Vec2};
use slotmap::SecondaryMap;

const SCENE_SHADER: &str = include_str!("shaders/scene.wgsl");
const SKY_SHADER: &str = include_str!("shaders/sky.wgsl");

/// Where the orchestrator is within a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameState {
    /// Between ticks, nothing submitted yet or the last frame was abandoned.
    #[default]
    Idle,
    Updating,
    Encoding,
    /// The last frame was handed to the backend. Completion is reported
    /// asynchronously through the rings.
    Submitted,
}

/// Result of one [`FrameOrchestrator::tick`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was submitted with this many indexed draws.
    Presented { draws: usize },
    /// The backend had no target to draw into.
    Skipped(SkipReason),
    /// A uniform ring stayed full past the acquire timeout.
    Dropped,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
    Sky,
    Scene,
}

impl Pass {
    fn label(self) -> &'static str {
        match self {
            Pass::Sky => "Draw Sky",
            Pass::Scene => "Draw Scene",
        }
    }
}

/// Everything needed to encode one drawable, captured during the walk.
struct DrawJob {
    id: NodeId,
    pass: Pass,
    world: Mat4,
    material: Material,
    texture: TextureHandle,
    vertex_buffer: BufferHandle,
    submeshes: Vec<Submesh>,
}

impl DrawJob {
    fn from_item(item: DrawItem<'_>, pass: Pass) -> Option<Self> {
        Some(Self {
            id: item.id,
            pass,
            world: item.world,
            material: *item.material,
            texture: item.material.base_color?,
            vertex_buffer: item.mesh.vertex_buffer,
            submeshes: item.mesh.submeshes.clone(),
        })
    }
}

/// Pipeline descriptor for lit scene geometry.
pub fn scene_pipeline_desc() -> PipelineDesc {
    PipelineDesc {
        label: "Scene Pipeline".into(),
        vertex: ShaderProgram::wgsl("Scene Shader", SCENE_SHADER, "vs_main"),
        fragment: ShaderProgram::wgsl("Scene Shader", SCENE_SHADER, "fs_main"),
        vertex_layout: Vertex3d::LAYOUT,
        depth: DepthMode::TestAndWrite,
        cull: CullMode::Back,
    }
}

/// Pipeline descriptor for the sky: unlit, no depth test or write.
pub fn sky_pipeline_desc() -> PipelineDesc {
    PipelineDesc {
        label: "Sky Pipeline".into(),
        vertex: ShaderProgram::wgsl("Sky Shader", SKY_SHADER, "vs_main"),
        fragment: ShaderProgram::wgsl("Sky Shader", SKY_SHADER, "fs_main"),
        vertex_layout: Vertex3d::LAYOUT,
        depth: DepthMode::Disabled,
        cull: CullMode::Back,
    }
}

/// Drives a [`Scene`] through a [`GraphicsBackend`], one frame per tick.
pub struct FrameOrchestrator {
    config: RendererConfig,
    scene: Scene,
    rings: SecondaryMap<NodeId, UniformRing>,
    scene_pipeline: PipelineHandle,
    sky_pipeline: PipelineHandle,
    default_sampler: SamplerHandle,
    time: f32,
    frame_index: u64,
    pan_delta: Vec2,
    state: FrameState,
}

impl FrameOrchestrator {
    /// Creates the pipelines and default sampler for `scene`.
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        scene: Scene,
        config: RendererConfig,
    ) -> Result<Self> {
        let scene_pipeline = backend.create_pipeline(&scene_pipeline_desc())?;
        let sky_pipeline = backend.create_pipeline(&sky_pipeline_desc())?;
        let default_sampler = backend.create_sampler(SamplerMode::Linear)?;

        log::info!(
            "Scene ready: {} nodes, {} lights, {} meshes, sky: {}",
            scene.len(),
            scene.lights().len(),
            scene.assets.mesh_count(),
            if scene.sky().is_some() { "yes" } else { "no" }
        );

        Ok(Self {
            config,
            scene,
            rings: SecondaryMap::new(),
            scene_pipeline,
            sky_pipeline,
            default_sampler,
            time: 0.0,
            frame_index: 0,
            pan_delta: Vec2::ZERO,
            state: FrameState::Idle,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Animation time of the most recent tick.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Sets the clock. The next tick animates at `time + 1 / preferred_fps`.
    pub fn set_time(&mut self, time: f32) {
        self.time = time;
    }

    /// Ticks run so far, skipped and dropped ones included.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Adds pan movement to hand to the next tick's animations.
    pub fn add_pan_delta(&mut self, delta: Vec2) {
        self.pan_delta += delta;
    }

    /// The uniform ring of a drawable, once it has been drawn at least once.
    pub fn ring(&self, id: NodeId) -> Option<&UniformRing> {
        self.rings.get(id)
    }

    /// Runs one frame.
    ///
    /// Errors are fatal resource failures; frames that merely could not be
    /// drawn come back as [`FrameOutcome::Skipped`] or
    /// [`FrameOutcome::Dropped`].
    pub fn tick(&mut self, backend: &mut dyn GraphicsBackend) -> Result<FrameOutcome> {
        self.state = FrameState::Updating;
        let view_projection = self.update(backend.drawable_size());

        self.state = FrameState::Encoding;
        let jobs = self.collect_draws();
        let mut acquired = Vec::with_capacity(jobs.len());
        if let Err(err) = self.acquire_slots(backend, &jobs, view_projection, &mut acquired) {
            self.cancel_slots(&acquired);
            self.state = FrameState::Idle;
            if err.is_recoverable() {
                log::warn!("Frame {} dropped: {}", self.frame_index - 1, err);
                return Ok(FrameOutcome::Dropped);
            }
            return Err(err);
        }

        let mut encoder = match backend.begin_frame() {
            Ok(encoder) => encoder,
            Err(reason) => {
                self.cancel_slots(&acquired);
                self.state = FrameState::Idle;
                log::warn!("Frame {} skipped: {}", self.frame_index - 1, reason);
                return Ok(FrameOutcome::Skipped(reason));
            }
        };
        self.encode(&mut encoder, &jobs, &acquired);
        let draws = encoder.draw_count();

        let signals: Vec<_> = acquired
            .iter()
            .filter_map(|(id, _)| self.rings.get(*id).map(UniformRing::signal))
            .collect();
        backend.present(
            encoder,
            Box::new(move || {
                for signal in &signals {
                    signal.release();
                }
            }),
        )?;
        self.state = FrameState::Submitted;
        log::debug!("Frame {} submitted: {} draws", self.frame_index - 1, draws);
        Ok(FrameOutcome::Presented { draws })
    }

    /// Advances the clock, runs the animations and returns this frame's
    /// view-projection matrix.
    fn update(&mut self, (width, height): (u32, u32)) -> Mat4 {
        let step = self.config.frame_step();
        self.time += step;
        let frame = FrameContext {
            time: self.time,
            delta: step,
            frame_index: self.frame_index,
            pan_delta: std::mem::take(&mut self.pan_delta),
        };
        self.scene.animate(&frame, self.config.reset_policy);
        self.frame_index += 1;

        let aspect = width as f32 / height.max(1) as f32;
        self.config.camera.view_projection(aspect)
    }

    /// Sky first, then the scene graph depth-first.
    fn collect_draws(&self) -> Vec<DrawJob> {
        let mut jobs = Vec::new();
        if let Some(job) = self
            .scene
            .sky_item()
            .and_then(|item| DrawJob::from_item(item, Pass::Sky))
        {
            jobs.push(job);
        }
        self.scene.for_each_drawable(|item| {
            jobs.extend(DrawJob::from_item(item, Pass::Scene));
        });
        jobs
    }

    /// Takes a ring slot per job and writes its uniforms. Every acquired slot
    /// is pushed onto `acquired` in job order, even on error.
    fn acquire_slots(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        jobs: &[DrawJob],
        view_projection: Mat4,
        acquired: &mut Vec<(NodeId, SlotHandle)>,
    ) -> Result<()> {
        let eye = self.config.camera.eye;

        for job in jobs {
            if !self.rings.contains_key(job.id) {
                let name = self
                    .scene
                    .node(job.id)
                    .map_or("unnamed", |node| node.name());
                let ring = UniformRing::for_draws(
                    backend,
                    &format!("{} Uniforms", name),
                    self.config.in_flight_frames,
                )?;
                log::debug!(
                    "Created uniform ring for '{}' ({} slots)",
                    name,
                    ring.capacity()
                );
                self.rings.insert(job.id, ring);
            }
            let Some(ring) = self.rings.get_mut(job.id) else {
                return Err(RenderError::InvalidHandle {
                    kind: "uniform ring",
                    index: acquired.len(),
                });
            };

            let slot = ring.acquire_next_pumped(self.config.acquire_timeout, || backend.poll())?;
            acquired.push((job.id, slot));

            let light = LightBlock::new(
                eye,
                self.scene.ambient_color,
                job.material.specular_color,
                job.material.specular_power,
                self.scene.lights(),
            );
            ring.write(
                backend,
                slot,
                &DrawUniforms::new(job.world, view_projection, light),
            )?;
        }
        Ok(())
    }

    /// Gives back the slots of an abandoned frame, newest first.
    fn cancel_slots(&mut self, acquired: &[(NodeId, SlotHandle)]) {
        for (id, slot) in acquired.iter().rev() {
            if let Some(ring) = self.rings.get_mut(*id) {
                ring.cancel(*slot);
            }
        }
    }

    fn encode(
        &self,
        encoder: &mut FrameEncoder,
        jobs: &[DrawJob],
        acquired: &[(NodeId, SlotHandle)],
    ) {
        let mut pass = None;
        for (job, (_, slot)) in jobs.iter().zip(acquired) {
            if pass != Some(job.pass) {
                if pass.is_some() {
                    encoder.pop_debug_group();
                }
                encoder.push_debug_group(job.pass.label());
                let pipeline = match job.pass {
                    Pass::Sky => self.sky_pipeline,
                    Pass::Scene => self.scene_pipeline,
                };
                encoder.bind(Binding::Pipeline(pipeline), 0);
                pass = Some(job.pass);
            }

            encoder.bind(Binding::VertexBuffer(job.vertex_buffer), 0);
            encoder.bind(Binding::Uniform(slot.buffer), 0);
            encoder.bind(Binding::Texture(job.texture), 0);
            encoder.bind(
                Binding::Sampler(job.material.sampler.unwrap_or(self.default_sampler)),
                0,
            );
            for submesh in &job.submeshes {
                encoder.draw_indexed(submesh.index_buffer, submesh.index_count, submesh.primitive);
            }
        }
        if pass.is_some() {
            encoder.pop_debug_group();
        }
    }
}

impl std::fmt::Debug for FrameOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameOrchestrator")
            .field("state", &self.state)
            .field("time", &self.time)
            .field("frame_index", &self.frame_index)
            .field("rings", &self.rings.len())
            .field("scene", &self.scene)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Command, HeadlessBackend};
    use crate::config::ResetPolicy;
    use crate::light::Light;
    use crate::mesh::{Mesh, MeshData};
    use crate::scene::DrawableNode;
    use crate::texture::ImageAsset;
    use crate::uniforms::{LIGHT_OFFSET, NORMAL_OFFSET};
    use approx::assert_relative_eq;
    use glam::{Mat3, Vec3};
    use std::f32::consts::FRAC_PI_2;
    use std::time::Duration;

    /// Root plus a bobbing "bob" and, optionally, a sky.
    fn bob_scene(backend: &mut HeadlessBackend, with_sky: bool) -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let cube = Mesh::upload(backend, &MeshData::cube()).unwrap();
        let cube = scene.assets.add_mesh(cube);
        let texture = backend
            .create_texture(&ImageAsset::solid("bob", [200, 120, 40, 255]))
            .unwrap();
        let material = scene
            .assets
            .add_material(Material::textured(texture).with_specular(Vec3::splat(0.8), 100.0));

        if with_sky {
            let sky = Mesh::upload(backend, &MeshData::sphere(150.0, 20, 20, true)).unwrap();
            let sky = scene.assets.add_mesh(sky);
            let sky_texture = backend
                .create_texture(&ImageAsset::solid("sky", [0, 0, 80, 255]))
                .unwrap();
            let sky_material = scene.assets.add_material(Material::textured(sky_texture));
            scene.set_sky(DrawableNode::new("sky").with_mesh(sky).with_material(sky_material));
        }

        let root = scene.root();
        let bob = scene
            .add_child(
                root,
                DrawableNode::new("bob")
                    .with_mesh(cube)
                    .with_material(material)
                    .with_animation(|stack, _, frame| {
                        stack.translate(Vec3::new(0.0, 0.15 * frame.time.sin(), 0.0));
                    }),
            )
            .unwrap();
        scene.ambient_color = Vec3::splat(0.01);
        scene
            .add_light(Light::point(Vec3::splat(2.0), Vec3::ONE))
            .unwrap();
        (scene, bob)
    }

    fn read_floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn bob_world_offset_lands_in_the_uniform_slot() {
        let mut backend = HeadlessBackend::new(800, 600);
        let (scene, bob) = bob_scene(&mut backend, false);
        let config = RendererConfig::default();
        let step = config.frame_step();
        let mut orchestrator = FrameOrchestrator::new(&mut backend, scene, config).unwrap();
        orchestrator.set_time(FRAC_PI_2 - step);

        let outcome = orchestrator.tick(&mut backend).unwrap();
        assert_eq!(outcome, FrameOutcome::Presented { draws: 1 });
        assert_eq!(orchestrator.state(), FrameState::Submitted);

        let frame = backend.last_frame().unwrap();
        let uniform = frame.uniform_bindings()[0];
        let bytes = backend.buffer_bytes(uniform).unwrap();
        let model = Mat4::from_cols_slice(&read_floats(&bytes[..64]));
        assert_relative_eq!(model.w_axis.y, 0.15, epsilon = 1e-5);

        // pure translation: the normal matrix is the identity
        let normal = read_floats(&bytes[NORMAL_OFFSET..LIGHT_OFFSET]);
        let normal = Mat3::from_cols(
            Vec3::from_slice(&normal[0..3]),
            Vec3::from_slice(&normal[4..7]),
            Vec3::from_slice(&normal[8..11]),
        );
        assert!(normal.abs_diff_eq(Mat3::IDENTITY, 1e-6));

        let ring = orchestrator.ring(bob).unwrap();
        assert_eq!(ring.in_flight(), 1);
        backend.complete_all();
        assert_eq!(ring.in_flight(), 0);
    }

    #[test]
    fn sky_is_drawn_first_in_its_own_group() {
        let mut backend = HeadlessBackend::new(800, 600);
        let (scene, _) = bob_scene(&mut backend, true);
        let mut orchestrator =
            FrameOrchestrator::new(&mut backend, scene, RendererConfig::default()).unwrap();

        let outcome = orchestrator.tick(&mut backend).unwrap();
        assert_eq!(outcome, FrameOutcome::Presented { draws: 2 });

        let frame = backend.last_frame().unwrap();
        assert_eq!(frame.debug_groups(), vec!["Draw Sky", "Draw Scene"]);

        let pipelines: Vec<PipelineHandle> = frame
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::Bind {
                    binding: Binding::Pipeline(p),
                    ..
                } => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(pipelines.len(), 2);
        let sky = backend.pipeline(pipelines[0]).unwrap();
        assert_eq!(sky.depth, DepthMode::Disabled);
        let lit = backend.pipeline(pipelines[1]).unwrap();
        assert_eq!(lit.depth, DepthMode::TestAndWrite);
    }

    #[test]
    fn time_advances_by_one_step_per_tick() {
        let mut backend = HeadlessBackend::new(800, 600);
        let (scene, _) = bob_scene(&mut backend, false);
        let config = RendererConfig::default().preferred_fps(50);
        let mut orchestrator = FrameOrchestrator::new(&mut backend, scene, config).unwrap();

        for _ in 0..3 {
            orchestrator.tick(&mut backend).unwrap();
            backend.complete_all();
        }
        assert_relative_eq!(orchestrator.time(), 0.06, epsilon = 1e-6);
        assert_eq!(orchestrator.frame_index(), 3);
    }

    #[test]
    fn first_tick_animates_one_step_in() {
        let mut backend = HeadlessBackend::new(800, 600);
        let (scene, _) = bob_scene(&mut backend, false);
        let mut orchestrator =
            FrameOrchestrator::new(&mut backend, scene, RendererConfig::default()).unwrap();
        orchestrator.tick(&mut backend).unwrap();

        let uniform = backend.last_frame().unwrap().uniform_bindings()[0];
        let model = read_floats(&backend.buffer_bytes(uniform).unwrap()[..64]);
        assert_relative_eq!(model[13], 0.15 * (1.0f32 / 60.0).sin(), epsilon = 1e-6);
    }

    #[test]
    fn starved_ring_drops_the_frame_and_recovers() {
        let mut backend = HeadlessBackend::new(800, 600);
        let (scene, bob) = bob_scene(&mut backend, false);
        let config = RendererConfig::default()
            .in_flight_frames(2)
            .acquire_timeout(Some(Duration::from_millis(20)));
        let mut orchestrator = FrameOrchestrator::new(&mut backend, scene, config).unwrap();

        for _ in 0..2 {
            assert!(matches!(
                orchestrator.tick(&mut backend).unwrap(),
                FrameOutcome::Presented { .. }
            ));
        }
        assert_eq!(backend.frames_in_flight(), 2);

        // a sky added now gets a fresh ring, drawn before the starved bob
        let sky_mesh = Mesh::upload(&mut backend, &MeshData::sphere(150.0, 20, 20, true)).unwrap();
        let sky_texture = backend
            .create_texture(&ImageAsset::solid("sky", [0, 0, 80, 255]))
            .unwrap();
        let scene = orchestrator.scene_mut();
        let mesh = scene.assets.add_mesh(sky_mesh);
        let material = scene.assets.add_material(Material::textured(sky_texture));
        let sky = scene.set_sky(DrawableNode::new("sky").with_mesh(mesh).with_material(material));

        assert_eq!(orchestrator.tick(&mut backend).unwrap(), FrameOutcome::Dropped);
        assert_eq!(orchestrator.state(), FrameState::Idle);
        assert_eq!(backend.frames().len(), 2);
        // the sky slot taken before the timeout was handed back
        assert_eq!(orchestrator.ring(sky).unwrap().in_flight(), 0);
        assert_eq!(orchestrator.ring(bob).unwrap().in_flight(), 2);

        assert!(backend.complete_next_frame());
        assert_eq!(orchestrator.ring(bob).unwrap().in_flight(), 1);
        assert_eq!(
            orchestrator.tick(&mut backend).unwrap(),
            FrameOutcome::Presented { draws: 2 }
        );
        assert_eq!(orchestrator.ring(sky).unwrap().in_flight(), 1);
    }

    #[test]
    fn ring_slots_rotate_fifo() {
        let mut backend = HeadlessBackend::new(800, 600);
        let (scene, _) = bob_scene(&mut backend, false);
        let mut orchestrator =
            FrameOrchestrator::new(&mut backend, scene, RendererConfig::default()).unwrap();

        let mut bound = Vec::new();
        for _ in 0..4 {
            orchestrator.tick(&mut backend).unwrap();
            bound.push(backend.last_frame().unwrap().uniform_bindings()[0]);
            backend.complete_next_frame();
        }
        assert_ne!(bound[0], bound[1]);
        assert_ne!(bound[1], bound[2]);
        assert_eq!(bound[0], bound[3]);
    }

    #[test]
    fn unavailable_drawable_skips_and_releases() {
        let mut backend = HeadlessBackend::new(800, 600);
        let (scene, bob) = bob_scene(&mut backend, false);
        let mut orchestrator =
            FrameOrchestrator::new(&mut backend, scene, RendererConfig::default()).unwrap();

        backend.set_drawable_unavailable(Some("surface lost"));
        let outcome = orchestrator.tick(&mut backend).unwrap();
        assert_eq!(
            outcome,
            FrameOutcome::Skipped(SkipReason::NoDrawable("surface lost".into()))
        );
        assert_eq!(orchestrator.ring(bob).unwrap().in_flight(), 0);
        assert!(backend.frames().is_empty());

        backend.set_drawable_unavailable(None);
        backend.set_drawable_size(0, 600);
        assert_eq!(
            orchestrator.tick(&mut backend).unwrap(),
            FrameOutcome::Skipped(SkipReason::ZeroSized)
        );
    }

    #[test]
    fn abandoned_frame_never_reuses_an_in_flight_slot() {
        let mut backend = HeadlessBackend::new(800, 600);
        let (scene, bob) = bob_scene(&mut backend, false);
        let mut orchestrator =
            FrameOrchestrator::new(&mut backend, scene, RendererConfig::default()).unwrap();

        let mut in_flight = Vec::new();
        for _ in 0..2 {
            orchestrator.tick(&mut backend).unwrap();
            in_flight.push(backend.last_frame().unwrap().uniform_bindings()[0]);
        }

        backend.set_drawable_unavailable(Some("surface lost"));
        assert!(matches!(
            orchestrator.tick(&mut backend).unwrap(),
            FrameOutcome::Skipped(_)
        ));
        assert_eq!(orchestrator.ring(bob).unwrap().in_flight(), 2);

        backend.set_drawable_unavailable(None);
        orchestrator.tick(&mut backend).unwrap();
        assert_eq!(backend.frames_in_flight(), 3);
        let bound = backend.last_frame().unwrap().uniform_bindings()[0];
        assert!(!in_flight.contains(&bound));
        assert_eq!(orchestrator.ring(bob).unwrap().in_flight(), 3);
    }

    #[test]
    fn lighting_reaches_the_uniform_block() {
        let mut backend = HeadlessBackend::new(800, 600);
        let (scene, _) = bob_scene(&mut backend, false);
        let mut orchestrator =
            FrameOrchestrator::new(&mut backend, scene, RendererConfig::default()).unwrap();
        orchestrator.tick(&mut backend).unwrap();

        let uniform = backend.last_frame().unwrap().uniform_bindings()[0];
        let bytes = backend.buffer_bytes(uniform).unwrap();
        let block: LightBlock =
            bytemuck::pod_read_unaligned(&bytes[LIGHT_OFFSET..LIGHT_OFFSET + LightBlock::SIZE]);
        assert_eq!(block.light_count, 1);
        assert_eq!(block.camera_position, [0.0, 0.0, 4.0]);
        assert_eq!(block.specular_power, 100.0);
        assert_eq!(block.lights[0].position, [2.0, 2.0, 2.0, 1.0]);
    }

    #[test]
    fn manual_policy_leaves_reset_to_the_animation() {
        let mut backend = HeadlessBackend::new(800, 600);
        let (mut scene, _) = bob_scene(&mut backend, false);
        let root = scene.root();
        let spinner = scene
            .add_child(
                root,
                DrawableNode::new("spinner").with_animation(|stack, state, _| {
                    stack.reset();
                    state.rotation += 0.01;
                    stack.rotate(Vec3::Z, state.rotation);
                }),
            )
            .unwrap();
        let config = RendererConfig::default().reset_policy(ResetPolicy::Manual);
        let mut orchestrator = FrameOrchestrator::new(&mut backend, scene, config).unwrap();
        for _ in 0..3 {
            orchestrator.tick(&mut backend).unwrap();
            backend.complete_all();
        }
        let node = orchestrator.scene().node(spinner).unwrap();
        assert_eq!(node.transform.len(), 1);
        assert_relative_eq!(node.animation_state().unwrap().rotation, 0.03, epsilon = 1e-6);
    }
}
