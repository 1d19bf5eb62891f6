//! Scene lights and their packed GPU layout.
//!
//! [`Light`] is the CPU-side description. Before upload each light is packed
//! into a [`LightRaw`], and the per-draw lighting state (camera position,
//! ambient colour, material specular terms and up to [`MAX_LIGHTS`] lights)
//! is packed into a [`LightBlock`].
//!
//! # Memory Layout
//!
//! Both structs follow WGSL uniform alignment rules, so every `vec3` is
//! followed by a scalar that fills its fourth lane.
//!
//! | `LightRaw` field     | Format    | Offset |
//! |----------------------|-----------|--------|
//! | position             | Float32x4 | 0      |
//! | color                | Float32x3 | 16     |
//! | ambient_intensity    | Float32   | 28     |
//! | diffuse_intensity    | Float32   | 32     |
//! | specular_intensity   | Float32   | 36     |
//! | shininess            | Float32   | 40     |
//! | (padding)            | Float32   | 44     |
//!
//! | `LightBlock` field   | Format          | Offset |
//! |----------------------|-----------------|--------|
//! | camera_position      | Float32x3       | 0      |
//! | specular_power       | Float32         | 12     |
//! | ambient_color        | Float32x3       | 16     |
//! | light_count          | Uint32          | 28     |
//! | specular_color       | Float32x3       | 32     |
//! | (padding)            | Float32         | 44     |
//! | lights               | 3 × `LightRaw`  | 48     |

use glam::{Vec3, Vec4};

/// Number of light slots in a [`LightBlock`].
pub const MAX_LIGHTS: usize = 3;

/// A point or directional light.
///
/// `position.w` selects the kind: `1.0` is a point light at `position.xyz`,
/// `0.0` is a directional light whose rays arrive from `position.xyz`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    /// World position (w = 1) or direction towards the light (w = 0).
    pub position: Vec4,
    /// Linear RGB colour.
    pub color: Vec3,
    /// Scale of the light's ambient contribution.
    pub ambient_intensity: f32,
    /// Scale of the Lambert term.
    pub diffuse_intensity: f32,
    /// Scale of the specular term.
    pub specular_intensity: f32,
    /// Specular exponent used when the material does not override it.
    pub shininess: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self::point(Vec3::ZERO, Vec3::ZERO)
    }
}

impl Light {
    /// A point light at `position`.
    pub fn point(position: Vec3, color: Vec3) -> Self {
        Self {
            position: position.extend(1.0),
            color,
            ambient_intensity: 0.0,
            diffuse_intensity: 1.0,
            specular_intensity: 1.0,
            shininess: 1.0,
        }
    }

    /// A directional light arriving from `direction`.
    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Self {
            position: direction.normalize_or_zero().extend(0.0),
            ..Self::point(Vec3::ZERO, color)
        }
    }

    /// White frontal light with a faint ambient term.
    pub fn directional_default() -> Self {
        Self::directional(Vec3::Z, Vec3::ONE)
            .with_ambient(0.1)
            .with_diffuse(0.8)
            .with_specular(2.0)
            .with_shininess(10.0)
    }

    /// Sets the ambient intensity.
    pub fn with_ambient(mut self, intensity: f32) -> Self {
        self.ambient_intensity = intensity;
        self
    }

    /// Sets the diffuse intensity.
    pub fn with_diffuse(mut self, intensity: f32) -> Self {
        self.diffuse_intensity = intensity;
        self
    }

    /// Sets the specular intensity.
    pub fn with_specular(mut self, intensity: f32) -> Self {
        self.specular_intensity = intensity;
        self
    }

    /// Sets the shininess exponent.
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.shininess = shininess;
        self
    }

    /// Returns true for directional lights.
    pub fn is_directional(&self) -> bool {
        self.position.w == 0.0
    }

    /// Packs this light for upload.
    pub fn to_raw(&self) -> LightRaw {
        LightRaw {
            position: self.position.to_array(),
            color: self.color.to_array(),
            ambient_intensity: self.ambient_intensity,
            diffuse_intensity: self.diffuse_intensity,
            specular_intensity: self.specular_intensity,
            shininess: self.shininess,
            _padding: 0.0,
        }
    }
}

/// GPU layout of one light. 48 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRaw {
    pub position: [f32; 4],
    pub color: [f32; 3],
    pub ambient_intensity: f32,
    pub diffuse_intensity: f32,
    pub specular_intensity: f32,
    pub shininess: f32,
    pub _padding: f32,
}

/// GPU layout of the per-draw lighting state. 192 bytes.
///
/// Unused light slots are zeroed and `light_count` tells the shader how many
/// are live.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightBlock {
    pub camera_position: [f32; 3],
    pub specular_power: f32,
    pub ambient_color: [f32; 3],
    pub light_count: u32,
    pub specular_color: [f32; 3],
    pub _padding: f32,
    pub lights: [LightRaw; MAX_LIGHTS],
}

impl LightBlock {
    /// Size of the block in bytes.
    pub const SIZE: usize = std::mem::size_of::<LightBlock>();

    /// Packs the scene lighting plus one material's specular terms.
    ///
    /// Lights beyond [`MAX_LIGHTS`] are ignored; [`Scene`](crate::Scene)
    /// refuses to hold more than that in the first place.
    pub fn new(
        camera_position: Vec3,
        ambient_color: Vec3,
        specular_color: Vec3,
        specular_power: f32,
        lights: &[Light],
    ) -> Self {
        let mut packed = [LightRaw::default(); MAX_LIGHTS];
        let count = lights.len().min(MAX_LIGHTS);
        for (slot, light) in packed.iter_mut().zip(lights) {
            *slot = light.to_raw();
        }
        Self {
            camera_position: camera_position.to_array(),
            specular_power,
            ambient_color: ambient_color.to_array(),
            light_count: count as u32,
            specular_color: specular_color.to_array(),
            _padding: 0.0,
            lights: packed,
        }
    }
}
