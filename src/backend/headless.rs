//! In-memory backend for tests and tooling.
//!
//! [`HeadlessBackend`] keeps every resource in plain vectors, records each
//! presented frame, and holds completion callbacks until the caller fires
//! them with [`complete_next_frame`](HeadlessBackend::complete_next_frame) or
//! [`complete_all`](HeadlessBackend::complete_all). That makes GPU latency
//! fully controllable: a test can keep frames "in flight" for as long as it
//! likes and watch the uniform rings starve.

use super::{
    Binding, BufferHandle, BufferUsage, Command, CompletionCallback, FrameEncoder, FrameToken,
    GraphicsBackend, PipelineDesc, PipelineHandle, SamplerHandle, SamplerMode, SkipReason,
    TextureHandle,
};
use crate::error::{RenderError, Result};
use crate::texture::ImageAsset;
use std::collections::VecDeque;

#[derive(Debug)]
struct BufferEntry {
    label: String,
    usage: BufferUsage,
    bytes: Vec<u8>,
}

#[derive(Debug)]
struct TextureEntry {
    label: String,
    width: u32,
    height: u32,
}

/// A frame handed to [`GraphicsBackend::present`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedFrame {
    pub token: FrameToken,
    pub commands: Vec<Command>,
}

impl RecordedFrame {
    /// Number of indexed draws in the frame.
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::DrawIndexed { .. }))
            .count()
    }

    /// Uniform buffers bound in the frame, in bind order.
    pub fn uniform_bindings(&self) -> Vec<BufferHandle> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Bind {
                    binding: Binding::Uniform(buffer),
                    ..
                } => Some(*buffer),
                _ => None,
            })
            .collect()
    }

    /// Labels of the debug groups pushed in the frame, in order.
    pub fn debug_groups(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::PushDebugGroup(label) => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// A [`GraphicsBackend`] with no GPU behind it.
#[derive(Default)]
pub struct HeadlessBackend {
    buffers: Vec<BufferEntry>,
    textures: Vec<TextureEntry>,
    samplers: Vec<SamplerMode>,
    pipelines: Vec<PipelineDesc>,
    size: (u32, u32),
    unavailable: Option<String>,
    next_frame: u64,
    frames: Vec<RecordedFrame>,
    pending: VecDeque<CompletionCallback>,
}

impl std::fmt::Debug for HeadlessBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessBackend")
            .field("buffers", &self.buffers.len())
            .field("textures", &self.textures.len())
            .field("pipelines", &self.pipelines.len())
            .field("size", &self.size)
            .field("frames", &self.frames.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl HeadlessBackend {
    /// A backend whose drawable is `width` × `height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            ..Default::default()
        }
    }

    /// Simulates a window resize.
    pub fn set_drawable_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    /// Makes [`begin_frame`](GraphicsBackend::begin_frame) fail with
    /// [`SkipReason::NoDrawable`] until cleared with `None`.
    pub fn set_drawable_unavailable(&mut self, reason: Option<&str>) {
        self.unavailable = reason.map(str::to_owned);
    }

    /// Fires the completion callback of the oldest in-flight frame.
    ///
    /// Returns false when nothing was in flight.
    pub fn complete_next_frame(&mut self) -> bool {
        match self.pending.pop_front() {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Fires every pending completion callback in submission order.
    pub fn complete_all(&mut self) -> usize {
        let mut completed = 0;
        while self.complete_next_frame() {
            completed += 1;
        }
        completed
    }

    /// Frames presented but not yet completed.
    pub fn frames_in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Every frame presented so far.
    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&RecordedFrame> {
        self.frames.last()
    }

    /// Current contents of a buffer.
    pub fn buffer_bytes(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(buffer.index()).map(|b| b.bytes.as_slice())
    }

    pub fn buffer_usage(&self, buffer: BufferHandle) -> Option<BufferUsage> {
        self.buffers.get(buffer.index()).map(|b| b.usage)
    }

    pub fn buffer_label(&self, buffer: BufferHandle) -> Option<&str> {
        self.buffers.get(buffer.index()).map(|b| b.label.as_str())
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Label and size of an uploaded texture.
    pub fn texture_info(&self, texture: TextureHandle) -> Option<(&str, u32, u32)> {
        self.textures
            .get(texture.index())
            .map(|t| (t.label.as_str(), t.width, t.height))
    }

    pub fn sampler_mode(&self, sampler: SamplerHandle) -> Option<SamplerMode> {
        self.samplers.get(sampler.index()).copied()
    }

    pub fn pipeline(&self, pipeline: PipelineHandle) -> Option<&PipelineDesc> {
        self.pipelines.get(pipeline.index())
    }

    fn check_binding(&self, binding: Binding) -> Result<()> {
        let (kind, index, live) = match binding {
            Binding::Pipeline(h) => (PipelineHandle::KIND, h.index(), self.pipelines.len()),
            Binding::VertexBuffer(h) | Binding::Uniform(h) => {
                (BufferHandle::KIND, h.index(), self.buffers.len())
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
}

impl GraphicsBackend for HeadlessBackend {
    fn create_buffer(
        &mut self,
        label: &str,
        bytes: &[u8],
        usage: BufferUsage,
    ) -> Result<BufferHandle> {
        self.buffers.push(BufferEntry {
            label: label.to_owned(),
            usage,
            bytes: bytes.to_vec(),
        });
        Ok(BufferHandle(self.buffers.len() - 1))
    }

    fn create_uniform_buffer(&mut self, label: &str, size: u64) -> Result<BufferHandle> {
        self.create_buffer(label, &vec![0; size as usize], BufferUsage::Uniform)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, bytes: &[u8]) -> Result<()> {
        let entry = self
            .buffers
            .get_mut(buffer.index())
            .ok_or(RenderError::InvalidHandle {
                kind: BufferHandle::KIND,
                index: buffer.index(),
            })?;
        let size = entry.bytes.len() as u64;
        let start = offset as usize;
        let end = start + bytes.len();
        if end as u64 > size {
            return Err(RenderError::BufferOverflow {
                offset,
                len: bytes.len(),
                size,
            });
        }
        entry.bytes[start..end].copy_from_slice(bytes);
        Ok(())
    }

    fn create_texture(&mut self, image: &ImageAsset) -> Result<TextureHandle> {
        self.textures.push(TextureEntry {
            label: image.label.clone(),
            width: image.width,
            height: image.height,
        });
        Ok(TextureHandle(self.textures.len() - 1))
    }

    fn create_sampler(&mut self, mode: SamplerMode) -> Result<SamplerHandle> {
        self.samplers.push(mode);
        Ok(SamplerHandle(self.samplers.len() - 1))
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc) -> Result<PipelineHandle> {
        self.pipelines.push(desc.clone());
        Ok(PipelineHandle(self.pipelines.len() - 1))
    }

    fn drawable_size(&self) -> (u32, u32) {
        self.size
    }

    fn begin_frame(&mut self) -> std::result::Result<FrameEncoder, SkipReason> {
        if self.size.0 == 0 || self.size.1 == 0 {
            return Err(SkipReason::ZeroSized);
        }
        if let Some(reason) = &self.unavailable {
            return Err(SkipReason::NoDrawable(reason.clone()));
        }
        let token = FrameToken(self.next_frame);
        self.next_frame += 1;
        Ok(FrameEncoder::new(token))
    }

    fn present(&mut self, encoder: FrameEncoder, on_completed: CompletionCallback) -> Result<()> {
        for command in encoder.commands() {
            match command {
                Command::Bind { binding, .. } => self.check_binding(*binding)?,
                Command::DrawIndexed { index_buffer, .. } => {
                    self.check_binding(Binding::VertexBuffer(*index_buffer))?
                }
                Command::PushDebugGroup(_) | Command::PopDebugGroup => {}
            }
        }
        let token = encoder.frame();
        self.frames.push(RecordedFrame {
            token,
            commands: encoder.into_commands(),
        });
        self.pending.push_back(on_completed);
        Ok(())
    }
}
