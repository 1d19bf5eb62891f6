use glam::{Mat4, Vec3};

/// A fixed-eye perspective camera.
///
/// The view matrix only translates the world by `-eye`; the camera always
/// looks down -Z. The projection is right-handed with a `[0, 1]` depth range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 4.0),
            fov_y: std::f32::consts::PI / 5.0,
            near: 0.1,
            far: 160.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, eye: Vec3) -> Self {
        self.eye = eye;
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov_y = fov_degrees.to_radians();
        self
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn view(&self) -> Mat4 {
        Mat4::from_translation(-self.eye)
    }

    /// Perspective projection for a drawable of the given aspect ratio.
    ///
    /// A non-positive or non-finite aspect falls back to square.
    pub fn projection(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    /// `projection * view`.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn view_moves_world_opposite_the_eye() {
        let camera = Camera::new();
        let p = camera.view().transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(0.0, 0.0, -4.0));
    }

    #[test]
    fn origin_projects_to_screen_centre() {
        let camera = Camera::new();
        let clip = camera.view_projection(16.0 / 9.0) * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn degenerate_aspect_is_square() {
        let camera = Camera::new().with_fov(85.0).with_clip(0.01, 100.0);
        assert_eq!(camera.projection(0.0), camera.projection(1.0));
        assert_eq!(camera.projection(f32::NAN), camera.projection(1.0));
        assert_relative_eq!(camera.fov_y, 85f32.to_radians());
    }
}
