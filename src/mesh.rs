//! Mesh geometry: vertex format, CPU-side mesh data, and uploaded meshes.
//!
//! - [`Vertex3d`] is the interleaved vertex used by every pipeline.
//! - [`MeshData`] holds vertices plus one index list per [`SubmeshData`];
//!   built-in primitives and the asset loader both produce it.
//! - [`Mesh`] is the uploaded form: one vertex buffer and a list of
//!   [`Submesh`]es, each an index buffer with its count and primitive type.
//!
//! # Vertex Layout
//!
//! [`Vertex3d`] is 32 bytes per vertex:
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |
//!
//! All primitives wind front faces counter-clockwise.

use crate::backend::{
    BufferHandle, BufferUsage, GraphicsBackend, PrimitiveType, VertexAttribute, VertexFormat,
    VertexLayout,
};
use crate::error::Result;
use glam::Vec3;
use std::f32::consts::PI;

/// A vertex with position, normal, and texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    /// Position in model space.
    pub position: [f32; 3],
    /// Surface normal, normalized.
    pub normal: [f32; 3],
    /// Texture coordinates with v pointing down the image.
    pub uv: [f32; 2],
}

impl Vertex3d {
    const ATTRIBUTES: &'static [VertexAttribute] = &[
        // position
        VertexAttribute {
            location: 0,
            offset: 0,
            format: VertexFormat::Float32x3,
        },
        // normal
        VertexAttribute {
            location: 1,
            offset: 12,
            format: VertexFormat::Float32x3,
        },
        // uv
        VertexAttribute {
            location: 2,
            offset: 24,
            format: VertexFormat::Float32x2,
        },
    ];

    /// Backend-neutral layout of this vertex type.
    pub const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<Vertex3d>() as u64,
        attributes: Self::ATTRIBUTES,
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Indices for one submesh.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmeshData {
    pub indices: Vec<u32>,
    pub primitive: PrimitiveType,
}

/// Geometry that has not been uploaded yet.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub label: String,
    pub vertices: Vec<Vertex3d>,
    pub submeshes: Vec<SubmeshData>,
}

impl MeshData {
    /// A mesh with a single triangle-list submesh.
    pub fn new(label: impl Into<String>, vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self {
            label: label.into(),
            vertices,
            submeshes: vec![SubmeshData {
                indices,
                primitive: PrimitiveType::TriangleList,
            }],
        }
    }

    /// Total indices across all submeshes.
    pub fn index_count(&self) -> usize {
        self.submeshes.iter().map(|s| s.indices.len()).sum()
    }

    /// A cube spanning -0.5..0.5 on every axis. Each face maps the full
    /// texture.
    pub fn cube() -> Self {
        // Each face has its own vertices for correct normals
        #[rustfmt::skip]
        let vertices = vec![
            // Front face (Z+)
            Vertex3d::new([-0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0], [0.0, 1.0]),
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0], [1.0, 1.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0], [1.0, 0.0]),
            Vertex3d::new([-0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0], [0.0, 0.0]),
            // Back face (Z-)
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0], [0.0, 1.0]),
            Vertex3d::new([-0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0], [1.0, 1.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0], [1.0, 0.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0], [0.0, 0.0]),
            // Top face (Y+)
            Vertex3d::new([-0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0], [0.0, 1.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0], [0.0, 0.0]),
            // Bottom face (Y-)
            Vertex3d::new([-0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0], [0.0, 1.0]),
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([-0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0], [0.0, 0.0]),
            // Right face (X+)
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 1.0,  0.0,  0.0], [0.0, 1.0]),
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 1.0,  0.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 1.0,  0.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 1.0,  0.0,  0.0], [0.0, 0.0]),
            // Left face (X-)
            Vertex3d::new([-0.5, -0.5, -0.5], [-1.0,  0.0,  0.0], [0.0, 1.0]),
            Vertex3d::new([-0.5, -0.5,  0.5], [-1.0,  0.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([-0.5,  0.5,  0.5], [-1.0,  0.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [-1.0,  0.0,  0.0], [0.0, 0.0]),
        ];

        Self::new("Cube", vertices, quad_indices(6))
    }

    /// A cube of half-extent 1 textured from a cross-shaped atlas.
    ///
    /// The atlas is a 4×4 grid of cells; the second row holds left, front,
    /// right and back, with top above and bottom below the front cell:
    ///
    /// ```text
    ///         [top]
    /// [left] [front] [right] [back]
    ///         [bot]
    /// ```
    pub fn atlas_cube() -> Self {
        // (normal, four corners counter-clockwise from top-left, top-left cell uv)
        #[rustfmt::skip]
        let faces: [([f32; 3], [[f32; 3]; 4], [f32; 2]); 6] = [
            // Front
            ([ 0.0,  0.0,  1.0], [[-1.0,  1.0,  1.0], [-1.0, -1.0,  1.0], [ 1.0, -1.0,  1.0], [ 1.0,  1.0,  1.0]], [0.25, 0.25]),
            // Left
            ([-1.0,  0.0,  0.0], [[-1.0,  1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, -1.0,  1.0], [-1.0,  1.0,  1.0]], [0.00, 0.25]),
            // Right
            ([ 1.0,  0.0,  0.0], [[ 1.0,  1.0,  1.0], [ 1.0, -1.0,  1.0], [ 1.0, -1.0, -1.0], [ 1.0,  1.0, -1.0]], [0.50, 0.25]),
            // Top
            ([ 0.0,  1.0,  0.0], [[-1.0,  1.0, -1.0], [-1.0,  1.0,  1.0], [ 1.0,  1.0,  1.0], [ 1.0,  1.0, -1.0]], [0.25, 0.00]),
            // Bottom
            ([ 0.0, -1.0,  0.0], [[-1.0, -1.0,  1.0], [-1.0, -1.0, -1.0], [ 1.0, -1.0, -1.0], [ 1.0, -1.0,  1.0]], [0.25, 0.50]),
            // Back
            ([ 0.0,  0.0, -1.0], [[ 1.0,  1.0, -1.0], [ 1.0, -1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0,  1.0, -1.0]], [0.75, 0.25]),
        ];

        let cell = 0.25;
        let mut vertices = Vec::with_capacity(24);
        for (normal, corners, [s, t]) in faces {
            let uvs = [[s, t], [s, t + cell], [s + cell, t + cell], [s + cell, t]];
            for (position, uv) in corners.into_iter().zip(uvs) {
                vertices.push(Vertex3d::new(position, normal, uv));
            }
        }

        Self::new("Atlas Cube", vertices, quad_indices(6))
    }

    /// A UV sphere of the given radius.
    ///
    /// With `inward` set, normals point to the centre and the winding is
    /// flipped so the inside faces are the front faces (for skies).
    pub fn sphere(radius: f32, segments: u32, rings: u32, inward: bool) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let sign = if inward { -1.0 } else { 1.0 };
        let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);

        for ring in 0..=rings {
            let phi = PI * ring as f32 / rings as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for seg in 0..=segments {
                let theta = 2.0 * PI * seg as f32 / segments as f32;
                let x = ring_radius * theta.cos();
                let z = ring_radius * theta.sin();

                vertices.push(Vertex3d::new(
                    [x * radius, y * radius, z * radius],
                    [x * sign, y * sign, z * sign],
                    [seg as f32 / segments as f32, ring as f32 / rings as f32],
                ));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;

                if inward {
                    indices.extend_from_slice(&[current, next, current + 1]);
                    indices.extend_from_slice(&[current + 1, next, next + 1]);
                } else {
                    indices.extend_from_slice(&[current, current + 1, next]);
                    indices.extend_from_slice(&[current + 1, next + 1, next]);
                }
            }
        }

        Self::new("Sphere", vertices, indices)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Replaces all normals with area-weighted averages of the adjacent
    /// triangle normals. Non-triangle submeshes are ignored.
    pub fn recalculate_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = [0.0, 0.0, 0.0];
        }

        for sub in &self.submeshes {
            if sub.primitive != PrimitiveType::TriangleList {
                continue;
            }
            for tri in sub.indices.chunks_exact(3) {
                let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
                let p0 = Vec3::from(self.vertices[i0].position);
                let p1 = Vec3::from(self.vertices[i1].position);
                let p2 = Vec3::from(self.vertices[i2].position);
                // |cross| is twice the area, which is the weight we want
                let face_normal = (p1 - p0).cross(p2 - p0);

                for i in [i0, i1, i2] {
                    let n = Vec3::from(self.vertices[i].normal) + face_normal;
                    self.vertices[i].normal = n.into();
                }
            }
        }

        for v in &mut self.vertices {
            v.normal = Vec3::from(v.normal).normalize_or_zero().into();
        }
    }
}

/// Two triangles per quad of four consecutive vertices.
fn quad_indices(quads: u32) -> Vec<u32> {
    (0..quads)
        .flat_map(|q| {
            let b = q * 4;
            [b, b + 1, b + 2, b + 2, b + 3, b]
        })
        .collect()
}

/// One drawable range of an uploaded mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Submesh {
    pub index_buffer: BufferHandle,
    pub index_count: u32,
    pub primitive: PrimitiveType,
}

/// Geometry resident in backend buffers.
///
/// Immutable once uploaded and shared by handle between drawables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mesh {
    pub label: String,
    pub vertex_buffer: BufferHandle,
    pub submeshes: Vec<Submesh>,
}

impl Mesh {
    /// Uploads `data`, one index buffer per submesh.
    pub fn upload(backend: &mut dyn GraphicsBackend, data: &MeshData) -> Result<Self> {
        let vertex_buffer = backend.create_buffer(
            &format!("{} Vertex Buffer", data.label),
            bytemuck::cast_slice(&data.vertices),
            BufferUsage::Vertex,
        )?;

        let submeshes = data
            .submeshes
            .iter()
            .enumerate()
            .map(|(i, sub)| {
                let index_buffer = backend.create_buffer(
                    &format!("{} Index Buffer {}", data.label, i),
                    bytemuck::cast_slice(&sub.indices),
                    BufferUsage::Index,
                )?;
                Ok(Submesh {
                    index_buffer,
                    index_count: sub.indices.len() as u32,
                    primitive: sub.primitive,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            label: data.label.clone(),
            vertex_buffer,
            submeshes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    #[test]
    fn vertex_layout_is_32_bytes() {
        assert_eq!(Vertex3d::LAYOUT.stride, 32);
        assert_eq!(Vertex3d::LAYOUT.attributes[2].offset, 24);
    }

    #[test]
    fn cube_faces_wind_counter_clockwise() {
        for mesh in [MeshData::cube(), MeshData::atlas_cube()] {
            let sub = &mesh.submeshes[0];
            assert_eq!(sub.indices.len(), 36);
            for tri in sub.indices.chunks(3) {
                let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| {
                    Vec3::from(mesh.vertices[i as usize].position)
                });
                let face_normal = (b - a).cross(c - a);
                let vertex_normal = Vec3::from(mesh.vertices[tri[0] as usize].normal);
                assert!(
                    face_normal.dot(vertex_normal) > 0.0,
                    "{} has a clockwise triangle",
                    mesh.label
                );
            }
        }
    }

    #[test]
    fn atlas_cube_front_uses_second_cell() {
        let cube = MeshData::atlas_cube();
        assert_eq!(cube.vertices[0].uv, [0.25, 0.25]);
        assert_eq!(cube.vertices[2].uv, [0.5, 0.5]);
        assert_eq!(cube.vertices[0].position, [-1.0, 1.0, 1.0]);
    }

    #[test]
    fn inward_sphere_points_normals_at_centre() {
        let sky = MeshData::sphere(150.0, 20, 20, true);
        assert_eq!(sky.vertices.len(), 21 * 21);
        assert_eq!(sky.index_count(), 20 * 20 * 6);
        let v = sky.vertices[30];
        let position = Vec3::from(v.position);
        assert!((position.length() - 150.0).abs() < 1e-2);
        assert!(position.dot(Vec3::from(v.normal)) < 0.0);
    }

    #[test]
    fn sphere_front_faces_follow_normals() {
        for inward in [false, true] {
            let sphere = MeshData::sphere(1.0, 8, 8, inward);
            let indices = &sphere.submeshes[0].indices;
            // a triangle away from the degenerate poles
            let start = (3 * 8 * 6) as usize;
            let [a, b, c] = [0, 1, 2].map(|k| {
                Vec3::from(sphere.vertices[indices[start + k] as usize].position)
            });
            let face_normal = (b - a).cross(c - a);
            let vertex_normal = Vec3::from(sphere.vertices[indices[start] as usize].normal);
            assert!(face_normal.dot(vertex_normal) > 0.0, "inward = {}", inward);
        }
    }

    #[test]
    fn recalculated_normals_face_outward() {
        let mut cube = MeshData::cube();
        let expected: Vec<[f32; 3]> = cube.vertices.iter().map(|v| v.normal).collect();
        cube.recalculate_normals();
        let actual: Vec<[f32; 3]> = cube.vertices.iter().map(|v| v.normal).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn upload_creates_one_index_buffer_per_submesh() {
        let mut backend = HeadlessBackend::new(16, 16);
        let mut data = MeshData::cube();
        data.submeshes.push(SubmeshData {
            indices: vec![0, 1],
            primitive: PrimitiveType::LineList,
        });

        let mesh = Mesh::upload(&mut backend, &data).unwrap();
        assert_eq!(mesh.submeshes.len(), 2);
        assert_eq!(mesh.submeshes[1].index_count, 2);
        assert_eq!(mesh.submeshes[1].primitive, PrimitiveType::LineList);
        assert_eq!(backend.buffer_count(), 3);
        assert_eq!(
            backend.buffer_usage(mesh.vertex_buffer),
            Some(BufferUsage::Vertex)
        );
        assert_eq!(
            backend.buffer_bytes(mesh.vertex_buffer).map(<[u8]>::len),
            Some(24 * 32)
        );
    }
}
