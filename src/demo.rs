//! The two demo scenes.
//!
//! - [`aquarium`]: a bobbing figure circled by a school of ten fish under a
//!   sky sphere, lit by one point light.
//! - [`cubes`]: a pixel-art cube panned around by dragging, and a second cube
//!   orbiting it.
//!
//! Both load their meshes and textures through an [`AssetLoader`]. When the
//! asset root does not exist at all they fall back to procedural stand-ins so
//! the demos run from a bare checkout; a root that exists but lacks a file is
//! an error.

use crate::assets::{AssetLoader, Material, MeshId};
use crate::backend::{GraphicsBackend, SamplerMode, TextureHandle};
use crate::camera::Camera;
use crate::config::{AppConfig, RendererConfig};
use crate::error::Result;
use crate::light::Light;
use crate::mesh::{Mesh, MeshData};
use crate::scene::{DrawableNode, Scene};
use crate::texture::ImageAsset;
use glam::{Mat4, Vec3};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Fish circling in the aquarium.
pub const FISH_COUNT: usize = 10;

const SKY_RADIUS: f32 = 150.0;
const SKY_SEGMENTS: u32 = 20;

/// Window and renderer settings for [`aquarium`].
pub fn aquarium_config() -> AppConfig {
    AppConfig::new()
        .title("scenestack: aquarium")
        .renderer(RendererConfig::default())
}

/// Window and renderer settings for [`cubes`].
pub fn cubes_config() -> AppConfig {
    let camera = Camera::new()
        .at(Vec3::ZERO)
        .with_fov(85.0)
        .with_clip(0.01, 100.0);
    AppConfig::new()
        .title("scenestack: cubes")
        .renderer(RendererConfig::default().camera(camera))
}

/// Model matrix of fish `index` (1-based) at `time`.
///
/// Each fish rides a vertical circle of radius 0.8 whose centre sits 0.8 out
/// from the origin, with the circles fanned evenly around Y.
pub fn fish_transform(index: usize, time: f32) -> Mat4 {
    const PIVOT: Vec3 = Vec3::new(0.8, 0.0, 0.0);
    const ROTATION_OFFSET: Vec3 = Vec3::new(0.8, 0.0, 0.0);
    const ROTATION_SPEED: f32 = 0.3;

    let base = Mat4::from_rotation_z(-FRAC_PI_2)
        * Mat4::from_scale(Vec3::splat(0.25))
        * Mat4::from_rotation_y(-FRAC_PI_2);
    let horizontal_angle = 2.0 * PI / FISH_COUNT as f32 * index.saturating_sub(1) as f32;
    let rotation_angle = 2.0 * PI * ROTATION_SPEED * time + horizontal_angle;

    Mat4::from_rotation_y(horizontal_angle)
        * Mat4::from_translation(ROTATION_OFFSET)
        * Mat4::from_rotation_z(rotation_angle)
        * Mat4::from_translation(PIVOT)
        * base
}

/// Loads a named mesh, or uploads `fallback` when there is no asset root.
fn mesh_or(
    backend: &mut dyn GraphicsBackend,
    loader: &AssetLoader,
    scene: &mut Scene,
    name: &str,
    fallback: impl FnOnce() -> MeshData,
) -> Result<MeshId> {
    if loader.is_available() {
        return loader.load_mesh(backend, &mut scene.assets, name);
    }
    let mesh = Mesh::upload(backend, &fallback().with_label(name))?;
    Ok(scene.assets.add_mesh(mesh))
}

/// Loads a named texture, or uploads `fallback` when there is no asset root.
fn texture_or(
    backend: &mut dyn GraphicsBackend,
    loader: &AssetLoader,
    name: &str,
    fallback: impl FnOnce() -> ImageAsset,
) -> Result<TextureHandle> {
    if loader.is_available() {
        return loader.load_texture(backend, name);
    }
    backend.create_texture(&fallback())
}

/// Builds the aquarium scene.
pub fn aquarium(backend: &mut dyn GraphicsBackend, loader: &AssetLoader) -> Result<Scene> {
    if !loader.is_available() {
        log::info!(
            "Asset root {} not found, using procedural stand-ins",
            loader.root().display()
        );
    }

    let mut scene = Scene::new();
    scene.ambient_color = Vec3::splat(0.01);
    scene.add_light(Light::point(Vec3::splat(2.0), Vec3::ONE))?;

    let sky_mesh = Mesh::upload(
        backend,
        &MeshData::sphere(SKY_RADIUS, SKY_SEGMENTS, SKY_SEGMENTS, true).with_label("Sky"),
    )?;
    let sky_mesh = scene.assets.add_mesh(sky_mesh);
    let sky_texture = texture_or(backend, loader, "SkyMap", || {
        ImageAsset::gradient("SkyMap", 256, [10, 40, 90], [0, 8, 24])
    })?;
    let sky_material = scene.assets.add_material(Material::textured(sky_texture));
    scene.set_sky(
        DrawableNode::new("Skymap")
            .with_mesh(sky_mesh)
            .with_material(sky_material),
    );

    let root = scene.root();
    if let Some(node) = scene.node_mut(root) {
        node.set_animation(|stack, _, frame| stack.rotate(Vec3::Y, -frame.time / 2.0));
    }

    let bob_mesh = mesh_or(backend, loader, &mut scene, "bob", || {
        MeshData::sphere(0.3, 24, 16, false)
    })?;
    let bob_texture = texture_or(backend, loader, "bob_baseColor", || {
        ImageAsset::checkerboard("bob_baseColor", 64, 8, [230, 150, 60, 255], [250, 220, 120, 255])
    })?;
    let bob_material = scene.assets.add_material(
        Material::textured(bob_texture).with_specular(Vec3::splat(0.8), 100.0),
    );
    scene.add_child(
        root,
        DrawableNode::new("bob")
            .with_mesh(bob_mesh)
            .with_material(bob_material)
            .with_animation(|stack, _, frame| {
                stack.translate(Vec3::new(0.0, 0.15 * frame.time.sin(), 0.0));
            }),
    )?;

    let blub_mesh = mesh_or(backend, loader, &mut scene, "blub", MeshData::cube)?;
    let blub_texture = texture_or(backend, loader, "blub_baseColor", || {
        ImageAsset::noise(
            "blub_baseColor",
            64,
            7,
            &[[40, 120, 200], [60, 160, 220], [230, 230, 240]],
        )
    })?;
    let blub_material = scene.assets.add_material(
        Material::textured(blub_texture).with_specular(Vec3::splat(0.8), 40.0),
    );
    for index in 1..=FISH_COUNT {
        scene.add_child(
            root,
            DrawableNode::new(format!("blub {}", index))
                .with_mesh(blub_mesh)
                .with_material(blub_material)
                .with_animation(move |stack, _, frame| {
                    stack.set_matrix(fish_transform(index, frame.time));
                }),
        )?;
    }

    Ok(scene)
}

/// Builds the cubes scene.
pub fn cubes(backend: &mut dyn GraphicsBackend, loader: &AssetLoader) -> Result<Scene> {
    let mut scene = Scene::new();
    scene.add_light(Light::directional_default())?;

    let texture = texture_or(backend, loader, "cube", || {
        ImageAsset::checkerboard("cube", 16, 4, [200, 60, 60, 255], [240, 240, 240, 255])
    })?;
    let sampler = backend.create_sampler(SamplerMode::NearestClamp)?;
    let material = scene
        .assets
        .add_material(Material::textured(texture).with_sampler(sampler));
    let mesh = Mesh::upload(backend, &MeshData::atlas_cube().with_label("Cube"))?;
    let mesh = scene.assets.add_mesh(mesh);

    // The root carries the fixed world matrix both cubes live under.
    let root = scene.root();
    if let Some(node) = scene.node_mut(root) {
        node.local =
            Mat4::from_translation(Vec3::new(0.0, 0.0, -7.0)) * Mat4::from_rotation_x(FRAC_PI_4);
    }

    scene.add_child(
        root,
        DrawableNode::new("rotation cube")
            .with_mesh(mesh)
            .with_material(material)
            .with_animation(|stack, state, frame| {
                state.offset.z -= frame.pan_delta.y;
                state.offset.x -= frame.pan_delta.x;
                stack.translate(Vec3::new(state.offset.x, 0.0, state.offset.z));
                stack.scale(0.1);
                stack.in_sub_transform(|spin| {
                    state.rotation += 0.01;
                    spin.rotate(Vec3::Y, state.rotation);
                });
            }),
    )?;

    scene.add_child(
        root,
        DrawableNode::new("movement cube")
            .with_mesh(mesh)
            .with_material(material)
            .with_animation(|stack, state, frame| {
                stack.in_sub_transform(|moved| {
                    state.offset.z -= frame.pan_delta.y;
                    state.offset.x -= frame.pan_delta.x;
                    moved.translate(Vec3::new(state.offset.x, 0.0, state.offset.z));
                    moved.in_sub_transform(|orbit| {
                        state.rotation -= 0.01;
                        orbit.rotate(Vec3::Y, state.rotation);
                        orbit.in_sub_transform(|arm| arm.translate(Vec3::new(0.0, 0.0, 2.0)));
                    });
                });
            }),
    )?;

    Ok(scene)
}
