//! End-to-end exercise of the `Scene3D` frame API (§6, §8's seed
//! scenarios) against a fallback-adapter `wgpu` device, the same pattern
//! `src/scene3d.rs`'s own unit tests use.

use glam::{Affine3A, Vec3};
use scene3d::{Camera, Environment, Light, Material, Projection, Render3DConfig, Scene3D, Vertex};

fn test_scene() -> Scene3D {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::None,
        force_fallback_adapter: true,
        compatible_surface: None,
    }))
    .expect("fallback adapter");
    let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).expect("device");
    Scene3D::from_device(device, queue, 64, 64, Render3DConfig::default())
}

fn triangle_vertices(z: f32) -> [Vertex; 3] {
    [
        Vertex {
            position: Vec3::new(-0.5, -0.5, z),
            texcoord: glam::Vec2::ZERO,
            normal: Vec3::Z,
            tangent: glam::Vec4::new(1.0, 0.0, 0.0, 1.0),
            color: glam::Vec4::ONE,
            bone_ids: [0; 4],
            bone_weights: glam::Vec4::ZERO,
        },
        Vertex {
            position: Vec3::new(0.5, -0.5, z),
            texcoord: glam::Vec2::ZERO,
            normal: Vec3::Z,
            tangent: glam::Vec4::new(1.0, 0.0, 0.0, 1.0),
            color: glam::Vec4::ONE,
            bone_ids: [0; 4],
            bone_weights: glam::Vec4::ZERO,
        },
        Vertex {
            position: Vec3::new(0.0, 0.5, z),
            texcoord: glam::Vec2::ZERO,
            normal: Vec3::Z,
            tangent: glam::Vec4::new(1.0, 0.0, 0.0, 1.0),
            color: glam::Vec4::ONE,
            bone_ids: [0; 4],
            bone_weights: glam::Vec4::ZERO,
        },
    ]
}

/// Copies a render target's color attachment back to the host and decodes
/// one pixel as `Rgba16Float`, the format `Scene3D` always allocates its
/// render textures in (see `scene3d.rs`'s `COLOR_FORMAT`).
fn read_back_pixel(scene: &Scene3D, target: uuid::Uuid, x: u32, y: u32) -> [f32; 4] {
    let rt = scene.render_texture(target).expect("render target exists");
    let (width, height) = rt.size();
    let bytes_per_pixel = 8u64; // Rgba16Float
    let unpadded_bytes_per_row = width as u64 * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as u64;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

    let readback = scene.device().create_buffer(&wgpu::BufferDescriptor {
        label: Some("frame_lifecycle.readback"),
        size: padded_bytes_per_row * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = scene.device().create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    encoder.copy_texture_to_buffer(
        rt.color.raw().as_image_copy(),
        wgpu::TexelCopyBufferInfo {
            buffer: &readback,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bytes_per_row as u32),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
    );
    scene.queue().submit(std::iter::once(encoder.finish()));

    let slice = readback.slice(..);
    slice.map_async(wgpu::MapMode::Read, |result| result.expect("map readback buffer"));
    scene.device().poll(wgpu::PollType::Wait).expect("poll device");

    let data = slice.get_mapped_range();
    let row_start = (y as u64 * padded_bytes_per_row) as usize;
    let pixel_start = row_start + (x as u64 * bytes_per_pixel) as usize;
    let pixel = &data[pixel_start..pixel_start + bytes_per_pixel as usize];
    let channel = |i: usize| half::f16::from_le_bytes([pixel[i * 2], pixel[i * 2 + 1]]).to_f32();
    [channel(0), channel(1), channel(2), channel(3)]
}

fn camera_at(z: f32) -> Camera {
    Camera {
        position: Vec3::new(0.0, 0.0, z),
        forward: -Vec3::Z,
        up: Vec3::Y,
        projection: Projection::Perspective {
            fov_y_radians: std::f32::consts::FRAC_PI_2,
            aspect: 1.0,
        },
        near: 0.1,
        far: 100.0,
    }
}

/// Scenario 1 (§8): a frame with no submits completes without panicking
/// and leaves the scene ready for the next `begin_3d`.
#[test]
fn empty_frame_completes() {
    let mut scene = test_scene();
    scene.begin_3d(camera_at(2.0), Environment::default(), None);
    scene.end_3d();
}

/// Scenario 2 (§8): a single opaque triangle submitted in front of the
/// camera survives the full upload/cull/sort/draw pipeline and actually
/// rasterizes — the rendered pixel at its center differs from the
/// environment's clear color, not just "the mesh handle is still valid".
#[test]
fn single_opaque_triangle_round_trips_through_end_3d() {
    let mut scene = test_scene();
    let mesh = scene.create_mesh(&triangle_vertices(0.0), None);
    let mut material = Material::default();
    material.albedo_color = glam::Vec4::new(1.0, 0.0, 0.0, 1.0);
    let material = scene.create_material(material);

    let environment = Environment::default();
    let clear = environment.background_premultiplied();

    let target = scene.default_render_target();
    scene.begin_3d(camera_at(2.0), environment, None);
    scene.draw_mesh(mesh, material, Affine3A::IDENTITY);
    scene.end_3d();

    assert!(scene.mesh(mesh).is_some());

    let pixel = read_back_pixel(&scene, target, 32, 32);
    let distance = (pixel[0] - clear.x).abs() + (pixel[1] - clear.y).abs() + (pixel[2] - clear.z).abs();
    assert!(distance > 0.01, "triangle pixel {pixel:?} should differ from clear color {clear:?}");
}

/// A light created and destroyed mid-session does not leave the scene in
/// a state where drawing panics; a subsequent frame still completes.
#[test]
fn destroying_a_light_does_not_break_the_next_frame() {
    let mut scene = test_scene();
    let light = scene.create_light(Light::directional(Vec3::new(0.0, -1.0, 0.0)));
    assert!(scene.destroy_light(light));
    assert!(!scene.destroy_light(light));

    scene.begin_3d(camera_at(2.0), Environment::default(), None);
    scene.end_3d();
}

/// `end_3d` called without a matching `begin_3d` logs and returns rather
/// than panicking (§7's no-unwind propagation policy).
#[test]
fn end_3d_without_begin_3d_does_not_panic() {
    let mut scene = test_scene();
    scene.end_3d();
}

/// A frame aborted by the host (no `end_3d`) rolls its staging state over
/// cleanly: the next `begin_3d` still opens a fresh frame.
#[test]
fn aborted_frame_does_not_poison_the_next_begin_3d() {
    let mut scene = test_scene();
    let mesh = scene.create_mesh(&triangle_vertices(0.0), None);
    let material = scene.create_material(Material::default());

    scene.begin_3d(camera_at(2.0), Environment::default(), None);
    scene.draw_mesh(mesh, material, Affine3A::IDENTITY);
    // Host decides not to call end_3d this time.

    scene.begin_3d(camera_at(2.0), Environment::default(), None);
    scene.end_3d();
}

/// Creating and destroying an instance buffer, mesh, and material shader
/// round-trips cleanly and destroy stays idempotent on each handle kind
/// (§8's "create/destroy is safe, second destroy is a no-op" property).
#[test]
fn resource_destroy_is_idempotent_across_kinds() {
    let mut scene = test_scene();

    let mesh = scene.create_mesh(&triangle_vertices(0.0), None);
    assert!(scene.destroy_mesh(mesh));
    assert!(!scene.destroy_mesh(mesh));

    let instances = scene.create_instance_buffer();
    assert!(scene.destroy_instance_buffer(instances));
    assert!(!scene.destroy_instance_buffer(instances));

    let material = scene.create_material(Material::default());
    assert!(scene.destroy_material(material));
    assert!(!scene.destroy_material(material));
}
