//! The graphics backend seam.
//!
//! The renderer core never talks to a GPU API directly. Everything it needs
//! goes through [`GraphicsBackend`]: resource creation, uniform writes,
//! per-frame command recording and presentation with a completion callback.
//!
//! Commands are not issued immediately. [`GraphicsBackend::begin_frame`] hands
//! out a [`FrameEncoder`], the orchestrator records binds and draws into it,
//! and [`GraphicsBackend::present`] replays the recording against the frame's
//! target image. This keeps the frame walk free of GPU borrows and lets the
//! [`HeadlessBackend`] inspect exactly what a frame would have drawn.
//!
//! Two implementations ship with the crate:
//!
//! - [`WgpuBackend`] renders to a window surface through `wgpu`.
//! - [`HeadlessBackend`] keeps resources in memory, records frames, and holds
//!   completion callbacks until told to fire them.

mod headless;
mod wgpu_backend;

pub use headless::{HeadlessBackend, RecordedFrame};
pub use wgpu_backend::WgpuBackend;

use crate::error::Result;
use crate::texture::ImageAsset;
use std::borrow::Cow;

/// Callback fired once the GPU has finished with a submitted frame.
///
/// May run on any thread.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) usize);

        impl $name {
            /// Resource table name used in error messages.
            pub const KIND: &'static str = $kind;

            /// Returns the backend table index.
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

handle_type!(
    /// Handle to a backend buffer (vertex, index or uniform).
    BufferHandle,
    "buffer"
);
handle_type!(
    /// Handle to a backend texture.
    TextureHandle,
    "texture"
);
handle_type!(
    /// Handle to a backend sampler.
    SamplerHandle,
    "sampler"
);
handle_type!(
    /// Handle to a backend render pipeline.
    PipelineHandle,
    "pipeline"
);

/// What a buffer will be bound as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

/// How index data is assembled into primitives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
    LineStrip,
    PointList,
}

/// Depth testing for a pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthMode {
    /// Less-than test with depth writes.
    #[default]
    TestAndWrite,
    /// No depth test and no depth writes.
    Disabled,
}

/// Face culling for a pipeline. Front faces wind counter-clockwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    #[default]
    Back,
    Front,
}

/// Texture filtering preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SamplerMode {
    /// Linear min/mag/mip filtering, repeating addresses.
    #[default]
    Linear,
    /// Nearest filtering, clamped addresses.
    NearestClamp,
}

/// Format of a single vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

/// One attribute inside an interleaved vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub offset: u64,
    pub format: VertexFormat,
}

/// Interleaved vertex layout of buffer slot 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: &'static [VertexAttribute],
}

/// One shader entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderProgram {
    pub label: Cow<'static, str>,
    /// WGSL source.
    pub source: Cow<'static, str>,
    pub entry_point: Cow<'static, str>,
}

impl ShaderProgram {
    pub fn wgsl(
        label: impl Into<Cow<'static, str>>,
        source: impl Into<Cow<'static, str>>,
        entry_point: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
            entry_point: entry_point.into(),
        }
    }
}

/// Everything needed to build a render pipeline.
///
/// The bind layout is fixed: uniform slot 0 holds a
/// [`DrawUniforms`](crate::DrawUniforms) block visible to both stages,
/// texture slot 0 and sampler slot 0 feed the fragment stage.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineDesc {
    pub label: Cow<'static, str>,
    pub vertex: ShaderProgram,
    pub fragment: ShaderProgram,
    pub vertex_layout: VertexLayout,
    pub depth: DepthMode,
    pub cull: CullMode,
}

/// A resource bound into a slot of the current frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    Pipeline(PipelineHandle),
    VertexBuffer(BufferHandle),
    Uniform(BufferHandle),
    Texture(TextureHandle),
    Sampler(SamplerHandle),
}

/// A single recorded command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Bind {
        binding: Binding,
        slot: u32,
    },
    DrawIndexed {
        index_buffer: BufferHandle,
        index_count: u32,
        primitive: PrimitiveType,
    },
    PushDebugGroup(String),
    PopDebugGroup,
}

/// Identifies the target image a [`FrameEncoder`] was opened for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameToken(pub(crate) u64);

impl FrameToken {
    pub fn index(self) -> u64 {
        self.0
    }
}

/// Command recording for one frame.
#[derive(Debug)]
pub struct FrameEncoder {
    frame: FrameToken,
    commands: Vec<Command>,
}

impl FrameEncoder {
    /// Opens an empty recording for `frame`.
    pub fn new(frame: FrameToken) -> Self {
        Self {
            frame,
            commands: Vec::new(),
        }
    }

    pub fn frame(&self) -> FrameToken {
        self.frame
    }

    /// Recorded commands in submission order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    pub fn bind(&mut self, binding: Binding, slot: u32) {
        self.commands.push(Command::Bind { binding, slot });
    }

    pub fn draw_indexed(
        &mut self,
        index_buffer: BufferHandle,
        index_count: u32,
        primitive: PrimitiveType,
    ) {
        self.commands.push(Command::DrawIndexed {
            index_buffer,
            index_count,
            primitive,
        });
    }

    pub fn push_debug_group(&mut self, label: impl Into<String>) {
        self.commands.push(Command::PushDebugGroup(label.into()));
    }

    pub fn pop_debug_group(&mut self) {
        self.commands.push(Command::PopDebugGroup);
    }

    /// Number of recorded draw commands.
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawIndexed { .. }))
            .count()
    }
}

/// Why a frame could not be started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The surface has zero width or height (minimised window).
    ZeroSized,
    /// No target image could be acquired this tick.
    NoDrawable(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ZeroSized => write!(f, "drawable is zero-sized"),
            SkipReason::NoDrawable(msg) => write!(f, "no drawable available: {}", msg),
        }
    }
}

/// The GPU-facing collaborator of the renderer.
pub trait GraphicsBackend {
    /// Creates a buffer initialised with `bytes`.
    fn create_buffer(&mut self, label: &str, bytes: &[u8], usage: BufferUsage)
    -> Result<BufferHandle>;

    /// Creates a zeroed, CPU-writable uniform buffer of `size` bytes.
    fn create_uniform_buffer(&mut self, label: &str, size: u64) -> Result<BufferHandle>;

    /// Copies `bytes` into `buffer` at `offset`.
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, bytes: &[u8]) -> Result<()>;

    /// Uploads an RGBA8 image.
    fn create_texture(&mut self, image: &ImageAsset) -> Result<TextureHandle>;

    fn create_sampler(&mut self, mode: SamplerMode) -> Result<SamplerHandle>;

    fn create_pipeline(&mut self, desc: &PipelineDesc) -> Result<PipelineHandle>;

    /// Current size of the frame target in pixels.
    fn drawable_size(&self) -> (u32, u32);

    /// Acquires the next target image and opens a recording for it.
    fn begin_frame(&mut self) -> std::result::Result<FrameEncoder, SkipReason>;

    /// Replays `encoder` against its target, presents it, and arranges for
    /// `on_completed` to fire exactly once when the GPU is done with it.
    fn present(&mut self, encoder: FrameEncoder, on_completed: CompletionCallback) -> Result<()>;

    /// Gives the backend a chance to deliver pending completion callbacks.
    fn poll(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_records_in_order() {
        let mut encoder = FrameEncoder::new(FrameToken(7));
        encoder.push_debug_group("Draw Scene");
        encoder.bind(Binding::Pipeline(PipelineHandle(0)), 0);
        encoder.draw_indexed(BufferHandle(3), 36, PrimitiveType::TriangleList);
        encoder.pop_debug_group();

        assert_eq!(encoder.frame().index(), 7);
        assert_eq!(encoder.draw_count(), 1);
        assert_eq!(
            encoder.commands()[1],
            Command::Bind {
                binding: Binding::Pipeline(PipelineHandle(0)),
                slot: 0
            }
        );
        assert_eq!(encoder.into_commands().last(), Some(&Command::PopDebugGroup));
    }
}
