//! Named assets: loading from disk and the shared asset table.
//!
//! [`AssetLoader`] resolves names against an asset root directory:
//!
//! | Kind    | Looked up as                         | Decoder  |
//! |---------|--------------------------------------|----------|
//! | mesh    | `<root>/<name>.obj`, `<root>/<name>.stl` | `tobj`, `stl_io` |
//! | texture | `<root>/<name>.png`, `.jpg`, `.jpeg` | `image`  |
//!
//! Loaded meshes and materials go into an [`AssetTable`] and are referenced
//! from drawables by [`MeshId`] / [`MaterialId`], so a school of identical
//! fish shares one mesh and one material.

use crate::backend::{GraphicsBackend, PrimitiveType, SamplerHandle, TextureHandle};
use crate::error::{RenderError, Result};
use crate::mesh::{Mesh, MeshData, SubmeshData, Vertex3d};
use crate::texture::ImageAsset;
use glam::Vec3;
use std::collections::HashMap;
use std::io::{BufRead, Read, Seek};
use std::path::{Path, PathBuf};

/// Handle to a mesh in an [`AssetTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

/// Handle to a material in an [`AssetTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub(crate) usize);

/// Surface parameters shared by every drawable that uses them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Base colour texture. Drawables whose material has none are not drawn.
    pub base_color: Option<TextureHandle>,
    /// Sampler override; the renderer's default linear sampler otherwise.
    pub sampler: Option<SamplerHandle>,
    pub specular_color: Vec3,
    /// Specular exponent. Zero or less defers to each light's shininess.
    pub specular_power: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: None,
            sampler: None,
            specular_color: Vec3::ONE,
            specular_power: 1.0,
        }
    }
}

impl Material {
    /// A material textured with `base_color`.
    pub fn textured(base_color: TextureHandle) -> Self {
        Self {
            base_color: Some(base_color),
            ..Default::default()
        }
    }

    pub fn with_specular(mut self, color: Vec3, power: f32) -> Self {
        self.specular_color = color;
        self.specular_power = power;
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerHandle) -> Self {
        self.sampler = Some(sampler);
        self
    }
}

/// Uploaded meshes and materials, addressed by id.
#[derive(Debug, Default)]
pub struct AssetTable {
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    mesh_names: HashMap<String, MeshId>,
}

impl AssetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `mesh` under its label.
    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        let id = MeshId(self.meshes.len());
        self.mesh_names.insert(mesh.label.clone(), id);
        self.meshes.push(mesh);
        id
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.get(id.0)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id.0)
    }

    /// Looks up a mesh by the label it was stored under.
    pub fn find_mesh(&self, label: &str) -> Option<MeshId> {
        self.mesh_names.get(label).copied()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}

const MESH_EXTENSIONS: &[&str] = &["obj", "stl"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Resolves asset names against a root directory.
#[derive(Clone, Debug)]
pub struct AssetLoader {
    root: PathBuf,
}

impl AssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the asset root exists at all.
    pub fn is_available(&self) -> bool {
        self.root.is_dir()
    }

    fn resolve(&self, name: &str, extensions: &[&str]) -> Result<PathBuf> {
        extensions
            .iter()
            .map(|ext| self.root.join(format!("{}.{}", name, ext)))
            .find(|path| path.is_file())
            .ok_or_else(|| RenderError::AssetNotFound(name.to_owned()))
    }

    /// Reads and decodes a named mesh without uploading it.
    pub fn load_mesh_data(&self, name: &str) -> Result<MeshData> {
        let path = self.resolve(name, MESH_EXTENSIONS)?;
        let file = std::fs::File::open(&path)?;
        let mut reader = std::io::BufReader::new(file);
        let is_stl = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("stl"));

        let data = if is_stl {
            parse_stl(name, &mut reader)?
        } else {
            parse_obj(name, &mut reader)?
        };
        log::debug!(
            "Loaded mesh '{}' from {}: {} vertices, {} submeshes",
            name,
            path.display(),
            data.vertices.len(),
            data.submeshes.len()
        );
        Ok(data)
    }

    /// Reads and decodes a named image.
    pub fn load_image(&self, name: &str) -> Result<ImageAsset> {
        let path = self.resolve(name, IMAGE_EXTENSIONS)?;
        let mut image = ImageAsset::from_file(&path)?;
        image.label = name.to_owned();
        Ok(image)
    }

    /// Loads, uploads and stores a named mesh. A mesh already in `table`
    /// under the same name is reused.
    pub fn load_mesh(
        &self,
        backend: &mut dyn GraphicsBackend,
        table: &mut AssetTable,
        name: &str,
    ) -> Result<MeshId> {
        if let Some(id) = table.find_mesh(name) {
            return Ok(id);
        }
        let data = self.load_mesh_data(name)?;
        let mesh = Mesh::upload(backend, &data)?;
        Ok(table.add_mesh(mesh))
    }

    /// Loads and uploads a named texture.
    pub fn load_texture(
        &self,
        backend: &mut dyn GraphicsBackend,
        name: &str,
    ) -> Result<TextureHandle> {
        let image = self.load_image(name)?;
        backend.create_texture(&image)
    }
}

/// Parses Wavefront OBJ. Every model in the file becomes one submesh of a
/// single mesh; texture v is flipped to point down the image.
pub fn parse_obj<R: BufRead>(name: &str, reader: &mut R) -> Result<MeshData> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    // Materials come from the asset table, not from .mtl files.
    let (models, _) = tobj::load_obj_buf(reader, &options, |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })
    .map_err(|e| RenderError::AssetParse {
        name: name.to_owned(),
        reason: e.to_string(),
    })?;

    if models.is_empty() {
        return Err(RenderError::AssetParse {
            name: name.to_owned(),
            reason: "no geometry".into(),
        });
    }

    let mut vertices = Vec::new();
    let mut submeshes = Vec::with_capacity(models.len());
    let mut missing_normals = false;

    for model in &models {
        let mesh = &model.mesh;
        let base = vertices.len() as u32;
        let count = mesh.positions.len() / 3;
        missing_normals |= mesh.normals.len() != mesh.positions.len();

        for i in 0..count {
            let position = [
                mesh.positions[3 * i],
                mesh.positions[3 * i + 1],
                mesh.positions[3 * i + 2],
            ];
            let normal = if mesh.normals.len() >= 3 * i + 3 {
                [
                    mesh.normals[3 * i],
                    mesh.normals[3 * i + 1],
                    mesh.normals[3 * i + 2],
                ]
            } else {
                [0.0, 0.0, 0.0]
            };
            let uv = if mesh.texcoords.len() >= 2 * i + 2 {
                [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]]
            } else {
                [0.0, 0.0]
            };
            vertices.push(Vertex3d::new(position, normal, uv));
        }

        submeshes.push(SubmeshData {
            indices: mesh.indices.iter().map(|i| i + base).collect(),
            primitive: PrimitiveType::TriangleList,
        });
    }

    let mut data = MeshData {
        label: name.to_owned(),
        vertices,
        submeshes,
    };
    if missing_normals {
        data.recalculate_normals();
    }
    Ok(data)
}

/// Parses binary or ASCII STL. STL has no texture coordinates.
pub fn parse_stl<R: Read + Seek>(name: &str, reader: &mut R) -> Result<MeshData> {
    let stl = stl_io::read_stl(reader).map_err(|e| RenderError::AssetParse {
        name: name.to_owned(),
        reason: e.to_string(),
    })?;

    let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
    let mut indices = Vec::with_capacity(stl.faces.len() * 3);

    // Faces index into a shared vertex list; split them so each face keeps
    // its own flat normal.
    for (i, face) in stl.faces.iter().enumerate() {
        let normal: [f32; 3] = face.normal.into();
        for &vertex_idx in &face.vertices {
            let position: [f32; 3] = stl.vertices[vertex_idx].into();
            vertices.push(Vertex3d::new(position, normal, [0.0, 0.0]));
        }
        let base = (i * 3) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    Ok(MeshData::new(name, vertices, indices))
}
