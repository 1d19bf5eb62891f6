//! [`GraphicsBackend`] on top of `wgpu`.
//!
//! Resources live in vectors indexed by the handle types. Every pipeline
//! shares one layout:
//!
//! - **Group 0**: the per-draw uniform buffer (binding 0), vertex + fragment
//! - **Group 1**: base colour texture (binding 0) and sampler (binding 1)
//!
//! Uniform bind groups are built once per uniform buffer. Texture bind groups
//! are built on first use of a (texture, sampler) pair and cached.
//!
//! wgpu fixes the primitive topology per pipeline, so each [`PipelineDesc`]
//! can own several pipeline variants, one per [`PrimitiveType`] actually
//! drawn with it. Triangle lists are built eagerly; other topologies are
//! built before the frame that first needs them is replayed.

use super::{
    Binding, BufferHandle, BufferUsage, Command, CompletionCallback, CullMode, DepthMode,
    FrameEncoder, FrameToken, GraphicsBackend, PipelineDesc, PipelineHandle, PrimitiveType,
    SamplerHandle, SamplerMode, SkipReason, TextureHandle, VertexFormat,
};
use crate::error::{RenderError, Result};
use crate::gpu::GpuContext;
use crate::texture::ImageAsset;
use std::collections::HashMap;
use std::sync::Arc;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

struct PipelineEntry {
    desc: PipelineDesc,
    vertex_module: wgpu::ShaderModule,
    fragment_module: wgpu::ShaderModule,
    variants: HashMap<PrimitiveType, wgpu::RenderPipeline>,
}

struct TextureEntry {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Resources bound at the time of a draw during replay.
#[derive(Default, Clone, Copy)]
struct DrawState {
    pipeline: Option<PipelineHandle>,
    vertex_buffer: Option<BufferHandle>,
    uniform: Option<BufferHandle>,
    texture: Option<TextureHandle>,
    sampler: Option<SamplerHandle>,
}

impl DrawState {
    fn bind(&mut self, binding: Binding, slot: u32) {
        if slot != 0 {
            log::warn!("Ignoring bind of {:?} to unsupported slot {}", binding, slot);
            return;
        }
        match binding {
            Binding::Pipeline(h) => self.pipeline = Some(h),
            Binding::VertexBuffer(h) => self.vertex_buffer = Some(h),
            Binding::Uniform(h) => self.uniform = Some(h),
            Binding::Texture(h) => self.texture = Some(h),
            Binding::Sampler(h) => self.sampler = Some(h),
        }
    }
}

/// Renders to a window surface through `wgpu`.
pub struct WgpuBackend {
    gpu: GpuContext,
    size: (u32, u32),
    clear_color: wgpu::Color,

    buffers: Vec<wgpu::Buffer>,
    uniform_groups: HashMap<usize, wgpu::BindGroup>,
    textures: Vec<TextureEntry>,
    samplers: Vec<wgpu::Sampler>,
    texture_groups: HashMap<(usize, usize), wgpu::BindGroup>,
    pipelines: Vec<PipelineEntry>,

    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,

    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),

    next_frame: u64,
    current: Option<(FrameToken, wgpu::SurfaceTexture)>,
}

impl WgpuBackend {
    /// Creates the device and surface for `window`.
    ///
    /// `in_flight_frames` is passed on as the surface's maximum frame latency.
    pub fn new(window: Arc<Window>, in_flight_frames: usize) -> Result<Self> {
        let gpu = GpuContext::new(window, in_flight_frames as u32)?;
        Ok(Self::from_context(gpu))
    }

    /// Wraps an existing GPU context.
    pub fn from_context(gpu: GpuContext) -> Self {
        let device = &gpu.device;

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniforms Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let depth_size = (gpu.width(), gpu.height());
        let depth_view = create_depth_view(&gpu);

        Self {
            size: depth_size,
            gpu,
            clear_color: wgpu::Color::BLACK,
            buffers: Vec::new(),
            uniform_groups: HashMap::new(),
            textures: Vec::new(),
            samplers: Vec::new(),
            texture_groups: HashMap::new(),
            pipelines: Vec::new(),
            uniform_layout,
            texture_layout,
            pipeline_layout,
            depth_view,
            depth_size,
            next_frame: 0,
            current: None,
        }
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Sets the colour the frame target is cleared to.
    pub fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = wgpu::Color {
            r: rgba[0] as f64,
            g: rgba[1] as f64,
            b: rgba[2] as f64,
            a: rgba[3] as f64,
        };
    }

    /// Follows a window resize.
    ///
    /// A zero-sized window keeps the old surface configuration; frames are
    /// skipped until the window has an area again.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        if width > 0 && height > 0 {
            self.gpu.resize(width, height);
            log::info!("Surface resized to {}x{}", width, height);
        }
    }

    fn ensure_depth_size(&mut self) {
        let size = (self.gpu.width(), self.gpu.height());
        if self.depth_size != size {
            self.depth_view = create_depth_view(&self.gpu);
            self.depth_size = size;
        }
    }

    fn buffer(&self, handle: BufferHandle) -> Result<&wgpu::Buffer> {
        self.buffers.get(handle.index()).ok_or(RenderError::InvalidHandle {
            kind: BufferHandle::KIND,
            index: handle.index(),
        })
    }

    fn check_binding(&self, binding: Binding) -> Result<()> {
        let (kind, index, live) = match binding {
            Binding::Pipeline(h) => (PipelineHandle::KIND, h.index(), self.pipelines.len()),
            Binding::VertexBuffer(h) => (BufferHandle::KIND, h.index(), self.buffers.len()),
            Binding::Uniform(h) => {
                let live = if self.uniform_groups.contains_key(&h.index()) {
                    self.buffers.len()
                } else {
                    0
                };
                (BufferHandle::KIND, h.index(), live)
            }
            Binding::Texture(h) => (TextureHandle::KIND, h.index(), self.textures.len()),
            Binding::Sampler(h) => (SamplerHandle::KIND, h.index(), self.samplers.len()),
        };
        if index < live {
            Ok(())
        } else {
            Err(RenderError::InvalidHandle { kind, index })
        }
    }

    /// Validates a recording and builds the pipeline variants and texture
    /// bind groups its draws need.
    fn prepare(&mut self, commands: &[Command]) -> Result<()> {
        let mut state = DrawState::default();
        for command in commands {
            match command {
                Command::Bind { binding, slot } => {
                    self.check_binding(*binding)?;
                    state.bind(*binding, *slot);
                }
                Command::DrawIndexed {
                    index_buffer,
                    primitive,
                    ..
                } => {
                    self.buffer(*index_buffer)?;
                    if let Some(pipeline) = state.pipeline {
                        self.ensure_variant(pipeline, *primitive)?;
                    }
                    if let (Some(texture), Some(sampler)) = (state.texture, state.sampler) {
                        self.ensure_texture_group(texture, sampler);
                    }
                }
                Command::PushDebugGroup(_) | Command::PopDebugGroup => {}
            }
        }
        Ok(())
    }

    fn ensure_variant(&mut self, handle: PipelineHandle, primitive: PrimitiveType) -> Result<()> {
        let entry = &self.pipelines[handle.index()];
        if entry.variants.contains_key(&primitive) {
            return Ok(());
        }
        let pipeline = build_pipeline(
            &self.gpu,
            &self.pipeline_layout,
            &entry.desc,
            &entry.vertex_module,
            &entry.fragment_module,
            primitive,
        )?;
        log::debug!("Built {:?} variant of pipeline '{}'", primitive, entry.desc.label);
        self.pipelines[handle.index()]
            .variants
            .insert(primitive, pipeline);
        Ok(())
    }

    fn ensure_texture_group(&mut self, texture: TextureHandle, sampler: SamplerHandle) {
        let key = (texture.index(), sampler.index());
        if self.texture_groups.contains_key(&key) {
            return;
        }
        let group = self
            .gpu
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Material Bind Group"),
                layout: &self.texture_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(
                            &self.textures[texture.index()].view,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.samplers[sampler.index()]),
                    },
                ],
            });
        self.texture_groups.insert(key, group);
    }

    /// Replays a prepared recording into `pass`.
    fn replay(&self, pass: &mut wgpu::RenderPass<'_>, commands: &[Command]) {
        let mut state = DrawState::default();
        for command in commands {
            match command {
                Command::Bind { binding, slot } => state.bind(*binding, *slot),
                Command::PushDebugGroup(label) => pass.push_debug_group(label),
                Command::PopDebugGroup => pass.pop_debug_group(),
                Command::DrawIndexed {
                    index_buffer,
                    index_count,
                    primitive,
                } => {
                    let (Some(pipeline), Some(vertex), Some(uniform), Some(texture), Some(sampler)) = (
                        state.pipeline,
                        state.vertex_buffer,
                        state.uniform,
                        state.texture,
                        state.sampler,
                    ) else {
                        log::warn!("Skipping draw with incomplete bindings");
                        continue;
                    };
                    let (Some(render_pipeline), Some(uniform_group), Some(texture_group)) = (
                        self.pipelines[pipeline.index()].variants.get(primitive),
                        self.uniform_groups.get(&uniform.index()),
                        self.texture_groups
                            .get(&(texture.index(), sampler.index())),
                    ) else {
                        log::warn!("Skipping draw with unprepared resources");
                        continue;
                    };

                    pass.set_pipeline(render_pipeline);
                    pass.set_bind_group(0, uniform_group, &[]);
                    pass.set_bind_group(1, texture_group, &[]);
                    pass.set_vertex_buffer(0, self.buffers[vertex.index()].slice(..));
                    pass.set_index_buffer(
                        self.buffers[index_buffer.index()].slice(..),
                        wgpu::IndexFormat::Uint32,
                    );
                    pass.draw_indexed(0..*index_count, 0, 0..1);
                }
            }
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    fn create_buffer(
        &mut self,
        label: &str,
        bytes: &[u8],
        usage: BufferUsage,
    ) -> Result<BufferHandle> {
        use wgpu::util::DeviceExt;

        let usage = match usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        };
        let buffer = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytes,
                usage,
            });
        self.buffers.push(buffer);
        Ok(BufferHandle(self.buffers.len() - 1))
    }

    fn create_uniform_buffer(&mut self, label: &str, size: u64) -> Result<BufferHandle> {
        let buffer = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let group = self
            .gpu
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
        self.buffers.push(buffer);
        let index = self.buffers.len() - 1;
        self.uniform_groups.insert(index, group);
        Ok(BufferHandle(index))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, bytes: &[u8]) -> Result<()> {
        let target = self.buffer(buffer)?;
        let size = target.size();
        if offset + bytes.len() as u64 > size {
            return Err(RenderError::BufferOverflow {
                offset,
                len: bytes.len(),
                size,
            });
        }
        self.gpu.queue.write_buffer(target, offset, bytes);
        Ok(())
    }

    fn create_texture(&mut self, image: &ImageAsset) -> Result<TextureHandle> {
        use wgpu::util::DeviceExt;

        let texture = self.gpu.device.create_texture_with_data(
            &self.gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(image.label.as_str()),
                size: wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &image.pixels,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.textures.push(TextureEntry { texture, view });
        Ok(TextureHandle(self.textures.len() - 1))
    }

    fn create_sampler(&mut self, mode: SamplerMode) -> Result<SamplerHandle> {
        let (address, filter) = match mode {
            SamplerMode::Linear => (wgpu::AddressMode::Repeat, wgpu::FilterMode::Linear),
            SamplerMode::NearestClamp => {
                (wgpu::AddressMode::ClampToEdge, wgpu::FilterMode::Nearest)
            }
        };
        let sampler = self.gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(if mode == SamplerMode::Linear {
                "Linear Sampler"
            } else {
                "Nearest Clamp Sampler"
            }),
            address_mode_u: address,
            address_mode_v: address,
            address_mode_w: address,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: filter,
            ..Default::default()
        });
        self.samplers.push(sampler);
        Ok(SamplerHandle(self.samplers.len() - 1))
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc) -> Result<PipelineHandle> {
        let device = &self.gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.vertex.label.as_ref()),
            source: wgpu::ShaderSource::Wgsl(desc.vertex.source.clone()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.fragment.label.as_ref()),
            source: wgpu::ShaderSource::Wgsl(desc.fragment.source.clone()),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::PipelineCreate {
                label: desc.label.to_string(),
                reason: error.to_string(),
            });
        }

        let pipeline = build_pipeline(
            &self.gpu,
            &self.pipeline_layout,
            desc,
            &vertex_module,
            &fragment_module,
            PrimitiveType::TriangleList,
        )?;

        let mut variants = HashMap::new();
        variants.insert(PrimitiveType::TriangleList, pipeline);
        self.pipelines.push(PipelineEntry {
            desc: desc.clone(),
            vertex_module,
            fragment_module,
            variants,
        });
        log::debug!("Created pipeline '{}'", desc.label);
        Ok(PipelineHandle(self.pipelines.len() - 1))
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.size
    }

    fn begin_frame(&mut self) -> std::result::Result<FrameEncoder, SkipReason> {
        if self.size.0 == 0 || self.size.1 == 0 {
            return Err(SkipReason::ZeroSized);
        }
        self.ensure_depth_size();

        let surface_texture = match self.gpu.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gpu.reconfigure();
                return Err(SkipReason::NoDrawable("surface lost or outdated".into()));
            }
            Err(e) => return Err(SkipReason::NoDrawable(e.to_string())),
        };

        let token = FrameToken(self.next_frame);
        self.next_frame += 1;
        self.current = Some((token, surface_texture));
        Ok(FrameEncoder::new(token))
    }

    fn present(&mut self, encoder: FrameEncoder, on_completed: CompletionCallback) -> Result<()> {
        let frame = encoder.frame();
        let surface_texture = match self.current.take() {
            Some((token, texture)) if token == frame => texture,
            _ => {
                return Err(RenderError::InvalidHandle {
                    kind: "frame",
                    index: frame.index() as usize,
                });
            }
        };

        let commands = encoder.into_commands();
        self.prepare(&commands)?;

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut gpu_encoder =
            self.gpu
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                });

        {
            let mut pass = gpu_encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.replay(&mut pass, &commands);
        }

        self.gpu.queue.submit(std::iter::once(gpu_encoder.finish()));
        self.gpu.queue.on_submitted_work_done(on_completed);
        surface_texture.present();
        Ok(())
    }

    fn poll(&mut self) {
        if let Err(e) = self.gpu.device.poll(wgpu::PollType::Poll) {
            log::warn!("Device poll failed: {}", e);
        }
    }
}

fn create_depth_view(gpu: &GpuContext) -> wgpu::TextureView {
    let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: gpu.width(),
            height: gpu.height(),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn build_pipeline(
    gpu: &GpuContext,
    layout: &wgpu::PipelineLayout,
    desc: &PipelineDesc,
    vertex_module: &wgpu::ShaderModule,
    fragment_module: &wgpu::ShaderModule,
    primitive: PrimitiveType,
) -> Result<wgpu::RenderPipeline> {
    let attributes: Vec<wgpu::VertexAttribute> = desc
        .vertex_layout
        .attributes
        .iter()
        .map(|a| wgpu::VertexAttribute {
            offset: a.offset,
            shader_location: a.location,
            format: match a.format {
                VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
                VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
                VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
            },
        })
        .collect();

    let (topology, strip_index_format) = match primitive {
        PrimitiveType::TriangleList => (wgpu::PrimitiveTopology::TriangleList, None),
        PrimitiveType::TriangleStrip => (
            wgpu::PrimitiveTopology::TriangleStrip,
            Some(wgpu::IndexFormat::Uint32),
        ),
        PrimitiveType::LineList => (wgpu::PrimitiveTopology::LineList, None),
        PrimitiveType::LineStrip => (
            wgpu::PrimitiveTopology::LineStrip,
            Some(wgpu::IndexFormat::Uint32),
        ),
        PrimitiveType::PointList => (wgpu::PrimitiveTopology::PointList, None),
    };

    let cull_mode = match desc.cull {
        CullMode::None => None,
        CullMode::Back => Some(wgpu::Face::Back),
        CullMode::Front => Some(wgpu::Face::Front),
    };

    // The pass always carries a depth attachment, so "disabled" still
    // declares the format and just never tests or writes.
    let (depth_write_enabled, depth_compare) = match desc.depth {
        DepthMode::TestAndWrite => (true, wgpu::CompareFunction::Less),
        DepthMode::Disabled => (false, wgpu::CompareFunction::Always),
    };

    gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = gpu
        .device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label.as_ref()),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: vertex_module,
                entry_point: Some(desc.vertex.entry_point.as_ref()),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: desc.vertex_layout.stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &attributes,
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: fragment_module,
                entry_point: Some(desc.fragment.entry_point.as_ref()),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format,
                cull_mode,
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled,
                depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

    match pollster::block_on(gpu.device.pop_error_scope()) {
        Some(error) => Err(RenderError::PipelineCreate {
            label: desc.label.to_string(),
            reason: error.to_string(),
        }),
        None => Ok(pipeline),
    }
}
