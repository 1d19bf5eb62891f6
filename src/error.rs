//! Error types.
//!
//! Every fallible operation in the crate returns [`Result<T>`], an alias for
//! `std::result::Result<T, RenderError>`.
//!
//! Two classes of failure matter to callers:
//!
//! - **Construction failures** (missing assets, no adapter, bad handles) are
//!   fatal. The scene cannot render without its declared content, so the demo
//!   binary logs them and exits.
//! - [`RenderError::FrameDropped`] is the only recoverable error. It is raised
//!   when a uniform ring stays starved past its timeout; the frame is abandoned
//!   and the render loop carries on with the next tick.
//!
//! Frames skipped because no drawable surface was available are not errors at
//! all, see [`FrameOutcome::Skipped`](crate::FrameOutcome::Skipped).

use std::time::Duration;
use thiserror::Error;

/// The main error type for the renderer.
#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // Asset errors
    // ========================================================================
    /// No file for the named asset exists under the asset root.
    #[error("asset not found: {0}")]
    AssetNotFound(String),

    /// The asset file exists but could not be decoded.
    #[error("failed to parse asset '{name}': {reason}")]
    AssetParse {
        /// Name the asset was requested by.
        name: String,
        /// Decoder message.
        reason: String,
    },

    /// Image decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========================================================================
    // GPU & window errors
    // ========================================================================
    /// No adapter compatible with the window surface was found.
    #[error("no compatible GPU adapter available")]
    AdapterUnavailable,

    /// Failed to create the logical device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreate(#[from] wgpu::RequestDeviceError),

    /// Failed to create a presentation surface for the window.
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    /// Shader compilation or pipeline validation failed.
    #[error("failed to create pipeline '{label}': {reason}")]
    PipelineCreate {
        label: String,
        reason: String,
    },

    /// Event loop error (winit).
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    /// Window creation error (winit).
    #[error("window error: {0}")]
    Window(#[from] winit::error::OsError),

    // ========================================================================
    // Resource & scene errors
    // ========================================================================
    /// A backend handle does not name any live resource.
    #[error("invalid {kind} handle (index: {index})")]
    InvalidHandle {
        /// Resource table the handle was looked up in.
        kind: &'static str,
        /// The offending index.
        index: usize,
    },

    /// A buffer write would run past the end of the buffer.
    #[error("write of {len} bytes at offset {offset} overflows a {size}-byte buffer")]
    BufferOverflow {
        offset: u64,
        len: usize,
        size: u64,
    },

    /// A node name is already used in the scene graph.
    #[error("a node named '{0}' already exists")]
    DuplicateNode(String),

    /// More lights were added than the uniform layout has slots for.
    #[error("a scene holds at most {max} lights")]
    TooManyLights {
        /// Number of light slots in the uniform layout.
        max: usize,
    },

    // ========================================================================
    // Frame errors
    // ========================================================================
    /// A uniform ring had no free slot within the acquire timeout.
    #[error("frame dropped: no uniform slot freed within {waited:?}")]
    FrameDropped {
        /// How long acquisition waited before giving up.
        waited: Duration,
    },
}

impl RenderError {
    /// Returns true for errors the render loop can survive by skipping a frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RenderError::FrameDropped { .. })
    }
}

/// Alias for `std::result::Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_frame_drops_are_recoverable() {
        let dropped = RenderError::FrameDropped {
            waited: Duration::from_millis(5),
        };
        assert!(dropped.is_recoverable());
        assert!(!RenderError::AssetNotFound("bob".into()).is_recoverable());
        assert!(!RenderError::TooManyLights { max: 3 }.is_recoverable());
    }

    #[test]
    fn messages_name_the_asset() {
        let err = RenderError::AssetParse {
            name: "blub".into(),
            reason: "unexpected token".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse asset 'blub': unexpected token"
        );
    }
}
