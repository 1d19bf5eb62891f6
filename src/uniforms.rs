//! Per-draw uniform data and its byte layout.
//!
//! One [`DrawUniforms`] block is written into a uniform ring slot for every
//! drawable, every frame. Field order is part of the contract with
//! `shaders/scene.wgsl` and `shaders/sky.wgsl`:
//!
//! | Field            | Format            | Offset                   |
//! |------------------|-------------------|--------------------------|
//! | model            | 4 × Float32x4     | [`MODEL_OFFSET`]         |
//! | view_projection  | 4 × Float32x4     | [`VIEW_PROJECTION_OFFSET`] |
//! | normal           | 3 × Float32x4     | [`NORMAL_OFFSET`]        |
//! | light            | [`LightBlock`]    | [`LIGHT_OFFSET`]         |
//!
//! The normal matrix is a `mat3x3<f32>` on the shader side, which WGSL lays
//! out as three 16-byte columns.

use crate::light::LightBlock;
use glam::{Mat3, Mat4};

/// Byte offset of the model matrix.
pub const MODEL_OFFSET: usize = 0;
/// Byte offset of the view-projection matrix.
pub const VIEW_PROJECTION_OFFSET: usize = 64;
/// Byte offset of the normal matrix.
pub const NORMAL_OFFSET: usize = 128;
/// Byte offset of the light block.
pub const LIGHT_OFFSET: usize = 176;

/// Below this determinant the model matrix is treated as singular.
const SINGULAR_EPSILON: f32 = 1e-12;

/// Uniform block for a single draw call.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    /// Object-to-world matrix.
    pub model: [[f32; 4]; 4],
    /// World-to-clip matrix.
    pub view_projection: [[f32; 4]; 4],
    /// Inverse transpose of the model's upper 3×3, padded to vec4 columns.
    pub normal: [[f32; 4]; 3],
    /// Lighting state for the fragment stage.
    pub light: LightBlock,
}

impl DrawUniforms {
    /// Size of the block in bytes.
    pub const SIZE: usize = std::mem::size_of::<DrawUniforms>();

    /// Packs one draw. The normal matrix is derived from `model`.
    pub fn new(model: Mat4, view_projection: Mat4, light: LightBlock) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            view_projection: view_projection.to_cols_array_2d(),
            normal: pad_mat3(normal_matrix(model)),
            light,
        }
    }

    /// Raw bytes, ready for a buffer write.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Computes `transpose(inverse(upper-left 3×3 of model))`.
///
/// A singular model matrix (for example a zero scale) has no inverse; the
/// identity is returned so lighting stays finite.
pub fn normal_matrix(model: Mat4) -> Mat3 {
    let upper = Mat3::from_mat4(model);
    if upper.determinant().abs() < SINGULAR_EPSILON {
        return Mat3::IDENTITY;
    }
    upper.inverse().transpose()
}

fn pad_mat3(m: Mat3) -> [[f32; 4]; 3] {
    [
        m.x_axis.extend(0.0).to_array(),
        m.y_axis.extend(0.0).to_array(),
        m.z_axis.extend(0.0).to_array(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::Vec3;
    use std::mem::offset_of;

    #[test]
    fn field_offsets_match_wire_contract() {
        assert_eq!(offset_of!(DrawUniforms, model), MODEL_OFFSET);
        assert_eq!(offset_of!(DrawUniforms, view_projection), VIEW_PROJECTION_OFFSET);
        assert_eq!(offset_of!(DrawUniforms, normal), NORMAL_OFFSET);
        assert_eq!(offset_of!(DrawUniforms, light), LIGHT_OFFSET);
        assert_eq!(DrawUniforms::SIZE, LIGHT_OFFSET + LightBlock::SIZE);
        assert_eq!(DrawUniforms::SIZE % 16, 0);
    }

    #[test]
    fn identity_model_has_identity_normal_matrix() {
        assert_eq!(normal_matrix(Mat4::IDENTITY), Mat3::IDENTITY);
    }

    #[test]
    fn normal_matrix_ignores_translation_and_inverts_scale() {
        let model = Mat4::from_translation(Vec3::new(5.0, -3.0, 2.0))
            * Mat4::from_scale(Vec3::new(2.0, 4.0, 1.0));
        let n = normal_matrix(model);
        assert_abs_diff_eq!(n.x_axis.x, 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(n.y_axis.y, 0.25, epsilon = 1e-5);
        assert_abs_diff_eq!(n.z_axis.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn rotation_normal_matrix_equals_rotation() {
        let model = Mat4::from_rotation_y(0.7);
        let n = normal_matrix(model);
        assert!(n.abs_diff_eq(Mat3::from_rotation_y(0.7), 1e-5));
    }

    #[test]
    fn singular_model_falls_back_to_identity() {
        let model = Mat4::from_scale(Vec3::new(0.0, 1.0, 1.0));
        assert_eq!(normal_matrix(model), Mat3::IDENTITY);
    }

    #[test]
    fn bytes_start_with_model_columns() {
        let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let uniforms = DrawUniforms::new(model, Mat4::IDENTITY, LightBlock::default());
        let bytes = uniforms.as_bytes();
        assert_eq!(bytes.len(), DrawUniforms::SIZE);
        let translation: &[f32] = bytemuck::cast_slice(&bytes[48..64]);
        assert_eq!(translation, &[1.0, 2.0, 3.0, 1.0]);
        let normal: &[f32] = bytemuck::cast_slice(&bytes[NORMAL_OFFSET..NORMAL_OFFSET + 16]);
        assert_eq!(normal, &[1.0, 0.0, 0.0, 0.0]);
    }
}
