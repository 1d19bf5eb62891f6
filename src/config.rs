//! Renderer and window configuration.

use crate::camera::Camera;
use glam::Vec3;
use std::time::Duration;

/// Who resets an animated drawable's transform stack each tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResetPolicy {
    /// The orchestrator resets the stack right before running the animation.
    #[default]
    Central,
    /// The animation calls `reset()` itself. Branches it pushes without
    /// resetting accumulate from tick to tick.
    Manual,
}

/// Settings for a [`FrameOrchestrator`](crate::FrameOrchestrator).
#[derive(Clone, Debug, PartialEq)]
pub struct RendererConfig {
    /// Uniform slots per drawable, i.e. frames that may be in flight.
    pub in_flight_frames: usize,
    /// Animation time advances by `1 / preferred_fps` per tick.
    pub preferred_fps: u32,
    pub camera: Camera,
    pub clear_color: [f32; 4],
    /// How long to wait for a free uniform slot before dropping the frame.
    /// `None` blocks until one frees up.
    pub acquire_timeout: Option<Duration>,
    pub reset_policy: ResetPolicy,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            in_flight_frames: 3,
            preferred_fps: 60,
            camera: Camera::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            acquire_timeout: Some(Duration::from_secs(1)),
            reset_policy: ResetPolicy::Central,
        }
    }
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight_frames(mut self, count: usize) -> Self {
        self.in_flight_frames = count.max(1);
        self
    }

    pub fn preferred_fps(mut self, fps: u32) -> Self {
        self.preferred_fps = fps.max(1);
        self
    }

    pub fn camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    pub fn eye(mut self, eye: Vec3) -> Self {
        self.camera.eye = eye;
        self
    }

    pub fn clear_color(mut self, rgba: [f32; 4]) -> Self {
        self.clear_color = rgba;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn reset_policy(mut self, policy: ResetPolicy) -> Self {
        self.reset_policy = policy;
        self
    }

    /// Seconds of animation time per tick.
    pub fn frame_step(&self) -> f32 {
        1.0 / self.preferred_fps.max(1) as f32
    }
}

/// Window settings plus the renderer configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub renderer: RendererConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "scenestack".to_string(),
            width: 800,
            height: 600,
            renderer: RendererConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn renderer(mut self, renderer: RendererConfig) -> Self {
        self.renderer = renderer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_aquarium() {
        let config = RendererConfig::default();
        assert_eq!(config.in_flight_frames, 3);
        assert_eq!(config.camera.eye, Vec3::new(0.0, 0.0, 4.0));
        assert_eq!(config.camera.far, 160.0);
        assert_eq!(config.reset_policy, ResetPolicy::Central);
        assert_eq!(config.frame_step(), 1.0 / 60.0);
    }

    #[test]
    fn builders_clamp_to_at_least_one() {
        let config = RendererConfig::new().in_flight_frames(0).preferred_fps(0);
        assert_eq!(config.in_flight_frames, 1);
        assert_eq!(config.frame_step(), 1.0);
    }
}
