use glam::Vec2;
use winit::event::{ElementState, MouseButton, TouchPhase, WindowEvent};

/// Default scale from view widths dragged to pan units.
pub const DEFAULT_PAN_SENSITIVITY: f32 = 5.0;

/// Turns drags (left mouse button or a single touch) into pan deltas.
///
/// Deltas point from the current pointer position back to the previous one
/// and are measured in view widths times the sensitivity, on both axes, so
/// dragging right across the whole view yields `(-sensitivity, 0)`. They
/// accumulate until [`take_delta`](Self::take_delta) is called once per tick.
#[derive(Clone, Debug)]
pub struct PanTracker {
    sensitivity: f32,
    view_width: f32,
    dragging: bool,
    last_position: Option<Vec2>,
    delta: Vec2,
}

impl Default for PanTracker {
    fn default() -> Self {
        Self::new(DEFAULT_PAN_SENSITIVITY)
    }
}

impl PanTracker {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity,
            view_width: 1.0,
            dragging: false,
            last_position: None,
            delta: Vec2::ZERO,
        }
    }

    /// Sets the width deltas are normalised by. Zero is ignored.
    pub fn set_view_width(&mut self, width: u32) {
        if width > 0 {
            self.view_width = width as f32;
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Process a window event and update the pan state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => self.set_view_width(size.width),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.dragging = *state == ElementState::Pressed,
            WindowEvent::CursorMoved { position, .. } => {
                self.move_to(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                self.dragging = false;
                self.last_position = None;
            }
            WindowEvent::Touch(touch) => {
                let position = Vec2::new(touch.location.x as f32, touch.location.y as f32);
                match touch.phase {
                    TouchPhase::Started => {
                        self.dragging = true;
                        self.last_position = Some(position);
                    }
                    TouchPhase::Moved => self.move_to(position),
                    TouchPhase::Ended | TouchPhase::Cancelled => self.dragging = false,
                }
            }
            _ => {}
        }
    }

    /// Moves the pointer, accumulating a delta while dragging.
    pub fn move_to(&mut self, position: Vec2) {
        if let (true, Some(last)) = (self.dragging, self.last_position) {
            self.delta += (last - position) / self.view_width * self.sensitivity;
        }
        self.last_position = Some(position);
    }

    /// Presses or releases the drag button.
    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
    }

    /// Returns the delta accumulated since the last call and clears it.
    pub fn take_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn drag_across_the_view_is_one_sensitivity() {
        let mut pan = PanTracker::default();
        pan.set_view_width(200);
        pan.move_to(Vec2::new(0.0, 100.0));
        pan.set_dragging(true);
        pan.move_to(Vec2::new(100.0, 100.0));
        pan.move_to(Vec2::new(200.0, 50.0));

        let delta = pan.take_delta();
        assert_relative_eq!(delta.x, -5.0);
        // y is normalised by width too
        assert_relative_eq!(delta.y, 1.25);
        assert_eq!(pan.take_delta(), Vec2::ZERO);
    }

    #[test]
    fn hovering_does_not_pan() {
        let mut pan = PanTracker::new(1.0);
        pan.move_to(Vec2::ZERO);
        pan.move_to(Vec2::new(10.0, 10.0));
        assert_eq!(pan.take_delta(), Vec2::ZERO);
        assert!(!pan.is_dragging());
    }

    #[test]
    fn zero_width_is_ignored() {
        let mut pan = PanTracker::new(1.0);
        pan.set_view_width(0);
        pan.set_dragging(true);
        pan.move_to(Vec2::ZERO);
        pan.move_to(Vec2::new(-2.0, 0.0));
        assert_eq!(pan.take_delta(), Vec2::new(2.0, 0.0));
    }
}
