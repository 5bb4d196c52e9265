//! The Frame API (§6): `Scene3D` ties every subsystem together behind the
//! `init`/`begin_3d`/`draw_*`/`end_3d`/`shutdown` lifecycle and the
//! resource create/destroy surface for every handle-addressed resource
//! kind. Per §7's propagation policy, no method here returns `Result` —
//! failures are logged and turned into the documented fallback (a dropped
//! draw, a null handle, a white texture) instead of unwinding.

use crate::bounds::Aabb;
use crate::camera::{Camera, CameraGpu, RenderCamera};
use crate::config::Render3DConfig;
use crate::context::GpuContext;
use crate::cubemap::{Cubemap, ReflectionProbe};
use crate::draw::{DrawCallManager, MeshSubmission};
use crate::environment::Environment;
use crate::gpu::{Buffer, Framebuffer, GpuPipeline, Texture};
use crate::handle::{Arena, Handle};
use crate::instance_buffer::InstanceBuffer;
use crate::light::{Light, LightManager};
use crate::material::Material;
use crate::mesh::{DynamicMesh, Mesh};
use crate::model::Model;
use crate::shader::{BuiltinPipelines, MaterialShader, SceneVariant};
use glam::Affine3A;
use rustc_hash::FxHashMap;
use uuid::Uuid;

/// Per-record byte stride used for the shadow pass's per-light camera
/// uniform. wgpu requires a uniform buffer binding's offset to be a
/// multiple of the device's `min_uniform_buffer_offset_alignment` (256 in
/// the common case, and this crate's own established stride for per-record
/// uniform offsets — see [`crate::shader::DynamicUniformBuffer`]), well
/// above `size_of::<CameraGpu>()`'s 96 bytes, so each light's record is
/// padded out to this stride rather than packed tightly.
const SHADOW_CAMERA_STRIDE: u64 = 256;

/// An off-screen color + depth render target, addressed by a process-wide
/// unique id rather than a generational handle — render textures are
/// referenced across frames by value (e.g. serialized into a save file or
/// shared with a UI layer) the way the teacher's `resource_manager.rs`
/// keys its own texture table by [`Uuid`], not by arena slot.
pub struct RenderTexture {
    pub color: Texture,
    pub depth: Texture,
    framebuffer: Framebuffer,
}

impl RenderTexture {
    fn new(device: &wgpu::Device, width: u32, height: u32, color_format: wgpu::TextureFormat) -> Self {
        let color = Texture::new(
            device,
            &wgpu::TextureDescriptor {
                label: None,
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: color_format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC
                    | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            "scene3d.render_texture.color",
        );
        let depth = Texture::new(
            device,
            &wgpu::TextureDescriptor {
                label: None,
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Depth32Float,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            "scene3d.render_texture.depth",
        );
        let framebuffer = Framebuffer::new(color.view().clone(), Some(depth.view().clone()), width, height);
        Self { color, depth, framebuffer }
    }

    pub fn size(&self) -> (u32, u32) {
        self.framebuffer.size()
    }
}

/// Snapshot captured at `begin_3d`, consumed and cleared by `end_3d`.
struct FrameState {
    camera: RenderCamera,
    environment: Environment,
    target: Uuid,
}

/// Owns every long-lived GPU resource arena, the per-frame draw queue, the
/// light/shadow manager, and the process-wide [`GpuContext`] singletons.
pub struct Scene3D {
    context: GpuContext,
    config: Render3DConfig,

    meshes: Arena<Mesh>,
    dynamic_meshes: Arena<DynamicMesh>,
    instance_buffers: Arena<InstanceBuffer>,
    materials: Arena<Material>,
    material_shaders: Arena<MaterialShader>,
    models: Arena<Model>,
    cubemaps: Arena<Cubemap>,
    reflection_probes: Arena<ReflectionProbe>,

    textures: FxHashMap<u64, Texture>,
    render_textures: FxHashMap<Uuid, RenderTexture>,
    default_target: Uuid,

    lights: LightManager,
    draw_calls: DrawCallManager,

    shared_buffer: Buffer,
    unique_buffer: Buffer,
    bone_buffer: Buffer,
    light_buffer: Buffer,
    shadow_buffer: Buffer,
    environment_buffer: Buffer,
    camera_buffer: Buffer,
    shadow_camera_buffer: Buffer,
    default_sampler: wgpu::Sampler,
    shadow_atlas_texture: Texture,
    builtin: BuiltinPipelines,

    frame: Option<FrameState>,
    last_frame_instant_dt: f32,
}

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

impl Scene3D {
    /// §6's `init`. `title` and windowing `flags` are out of this crate's
    /// scope (§1 Non-goal: the host owns window creation before this
    /// crate is ever constructed), so this signature takes the
    /// renderer-level parameters only: the off-screen default target's
    /// resolution and the host's [`Render3DConfig`]. Returns `None`
    /// (rather than the source's `bool`) on adapter/device request
    /// failure, logging the cause — idiomatic Rust's analogue of a
    /// boolean init failure.
    pub fn init(width: u32, height: u32, config: Render3DConfig) -> Option<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .inspect_err(|err| log::error!("no compatible GPU adapter: {err}"))
        .ok()?;
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))
            .inspect_err(|err| log::error!("device request failed: {err}"))
            .ok()?;
        Some(Self::from_device(device, queue, width, height, config))
    }

    /// Constructs directly from a host-supplied device/queue pair (the
    /// path test suites and embedding hosts with their own adapter
    /// selection use instead of `init`).
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue, width: u32, height: u32, config: Render3DConfig) -> Self {
        let default_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("scene3d.default_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let shadow_atlas_texture = Texture::new(
            &device,
            &wgpu::TextureDescriptor {
                label: None,
                size: wgpu::Extent3d {
                    width: config.shadow_map_resolution,
                    height: config.shadow_map_resolution,
                    depth_or_array_layers: config.shadow_atlas_capacity,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Depth32Float,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            "scene3d.shadow_atlas",
        );

        let mut render_textures = FxHashMap::default();
        let default_target = Uuid::new_v4();
        render_textures.insert(default_target, RenderTexture::new(&device, width, height, COLOR_FORMAT));

        let shared_buffer = Buffer::new(&device, 16, wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST, "scene3d.shared_draw");
        let unique_buffer = Buffer::new(&device, 16, wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST, "scene3d.unique_draw");
        let bone_buffer = Buffer::new(&device, 16, wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST, "scene3d.bone_matrix");
        let light_buffer = Buffer::new(&device, 16, wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST, "scene3d.light_array");
        let shadow_buffer = Buffer::new(&device, 16, wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST, "scene3d.shadow_array");
        let environment_buffer = Buffer::new(
            &device,
            std::mem::size_of::<crate::environment::EnvironmentGpu>() as u64,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            "scene3d.environment",
        );
        let camera_buffer = Buffer::new(
            &device,
            std::mem::size_of::<CameraGpu>() as u64,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            "scene3d.camera",
        );
        let shadow_camera_buffer = Buffer::new(
            &device,
            SHADOW_CAMERA_STRIDE,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            "scene3d.shadow_camera",
        );

        let builtin = BuiltinPipelines::build(&device, COLOR_FORMAT, wgpu::TextureFormat::Depth32Float);

        let shadow_atlas_capacity = config.shadow_atlas_capacity;
        let context = GpuContext::new(device, queue);

        Self {
            context,
            config,
            meshes: Arena::new(),
            dynamic_meshes: Arena::new(),
            instance_buffers: Arena::new(),
            materials: Arena::new(),
            material_shaders: Arena::new(),
            models: Arena::new(),
            cubemaps: Arena::new(),
            reflection_probes: Arena::new(),
            textures: FxHashMap::default(),
            render_textures,
            default_target,
            lights: LightManager::new(shadow_atlas_capacity),
            draw_calls: DrawCallManager::new(),
            shared_buffer,
            unique_buffer,
            bone_buffer,
            light_buffer,
            shadow_buffer,
            environment_buffer,
            camera_buffer,
            shadow_camera_buffer,
            default_sampler,
            shadow_atlas_texture,
            builtin,
            frame: None,
            last_frame_instant_dt: 1.0 / 60.0,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        self.context.device()
    }

    pub fn queue(&self) -> &wgpu::Queue {
        self.context.queue()
    }

    // ------------------------------------------------------------------
    // Resource API (§6): create/destroy for every resource kind. Create
    // calls return an opaque handle; destroy is idempotent on a stale or
    // already-destroyed handle (`Arena::destroy`'s own contract) and on
    // an id that was never valid (`FxHashMap::remove` on a missing key).
    // ------------------------------------------------------------------

    pub fn create_mesh(&mut self, vertices: &[crate::mesh::Vertex], indices: Option<&[u32]>) -> Handle<Mesh> {
        let mesh = Mesh::new(self.device(), self.queue(), vertices, indices);
        self.meshes.insert(mesh)
    }

    pub fn destroy_mesh(&mut self, handle: Handle<Mesh>) -> bool {
        self.meshes.destroy(handle)
    }

    pub fn mesh(&self, handle: Handle<Mesh>) -> Option<&Mesh> {
        self.meshes.get(handle)
    }

    pub fn create_dynamic_mesh(&mut self) -> Handle<DynamicMesh> {
        self.dynamic_meshes.insert(DynamicMesh::new())
    }

    pub fn destroy_dynamic_mesh(&mut self, handle: Handle<DynamicMesh>) -> bool {
        self.dynamic_meshes.destroy(handle)
    }

    pub fn dynamic_mesh_mut(&mut self, handle: Handle<DynamicMesh>) -> Option<&mut DynamicMesh> {
        self.dynamic_meshes.get_mut(handle)
    }

    pub fn create_instance_buffer(&mut self) -> Handle<InstanceBuffer> {
        self.instance_buffers.insert(InstanceBuffer::new())
    }

    pub fn destroy_instance_buffer(&mut self, handle: Handle<InstanceBuffer>) -> bool {
        self.instance_buffers.destroy(handle)
    }

    pub fn instance_buffer_mut(&mut self, handle: Handle<InstanceBuffer>) -> Option<&mut InstanceBuffer> {
        self.instance_buffers.get_mut(handle)
    }

    pub fn create_material(&mut self, material: Material) -> Handle<Material> {
        self.materials.insert(material)
    }

    pub fn destroy_material(&mut self, handle: Handle<Material>) -> bool {
        self.materials.destroy(handle)
    }

    pub fn material_mut(&mut self, handle: Handle<Material>) -> Option<&mut Material> {
        self.materials.get_mut(handle)
    }

    pub fn create_material_shader(&mut self, offset_alignment: u64, max_uniform_buffer_size: u64) -> Handle<MaterialShader> {
        self.material_shaders
            .insert(MaterialShader::new(offset_alignment, max_uniform_buffer_size))
    }

    pub fn destroy_material_shader(&mut self, handle: Handle<MaterialShader>) -> bool {
        self.material_shaders.destroy(handle)
    }

    pub fn material_shader_mut(&mut self, handle: Handle<MaterialShader>) -> Option<&mut MaterialShader> {
        self.material_shaders.get_mut(handle)
    }

    pub fn create_model(&mut self, model: Model) -> Handle<Model> {
        self.models.insert(model)
    }

    pub fn destroy_model(&mut self, handle: Handle<Model>) -> bool {
        self.models.destroy(handle)
    }

    /// Creates a raw 2D texture from already-decoded pixels (decoding is
    /// the host's job, per §1's Non-goals) and returns its process-wide
    /// resource id. `element_type` is the host's declared per-channel
    /// storage of `pixels`; when `format` is a 16-bit-float target and the
    /// host delivered `F32`/`U8` samples, the pixels are converted with
    /// [`crate::gpu::convert_to_f16`]'s clamp-then-narrow contract before
    /// upload.
    pub fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        element_type: crate::gpu::PixelElementType,
        pixels: &[u8],
    ) -> u64 {
        let texture = Texture::new(
            self.device(),
            &wgpu::TextureDescriptor {
                label: None,
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            "scene3d.texture",
        );
        let bytes_per_pixel = format.block_copy_size(None).unwrap_or(4);
        let converted;
        let upload_bytes = if is_f16_format(format) && element_type != crate::gpu::PixelElementType::F16 {
            converted = crate::gpu::convert_to_f16(pixels, element_type);
            converted.as_slice()
        } else {
            pixels
        };
        texture.upload(self.queue(), upload_bytes, width * bytes_per_pixel, 0);
        let id = texture.id();
        self.textures.insert(id, texture);
        id
    }

    pub fn destroy_texture(&mut self, id: u64) -> bool {
        self.textures.remove(&id).is_some()
    }

    pub fn create_cubemap(&mut self, cubemap: Cubemap) -> Handle<Cubemap> {
        self.cubemaps.insert(cubemap)
    }

    pub fn destroy_cubemap(&mut self, handle: Handle<Cubemap>) -> bool {
        self.cubemaps.destroy(handle)
    }

    pub fn create_reflection_probe(&mut self, probe: ReflectionProbe) -> Handle<ReflectionProbe> {
        self.reflection_probes.insert(probe)
    }

    pub fn destroy_reflection_probe(&mut self, handle: Handle<ReflectionProbe>) -> bool {
        self.reflection_probes.destroy(handle)
    }

    pub fn create_render_texture(&mut self, width: u32, height: u32) -> Uuid {
        let id = Uuid::new_v4();
        self.render_textures.insert(id, RenderTexture::new(self.device(), width, height, COLOR_FORMAT));
        id
    }

    pub fn destroy_render_texture(&mut self, id: Uuid) -> bool {
        if id == self.default_target {
            log::error!("refusing to destroy the default render target");
            return false;
        }
        self.render_textures.remove(&id).is_some()
    }

    pub fn render_texture(&self, id: Uuid) -> Option<&RenderTexture> {
        self.render_textures.get(&id)
    }

    /// The id `begin_3d(..., None)` resolves to.
    pub fn default_render_target(&self) -> Uuid {
        self.default_target
    }

    pub fn create_light(&mut self, light: Light) -> Handle<Light> {
        self.lights.create(light)
    }

    pub fn destroy_light(&mut self, handle: Handle<Light>) -> bool {
        self.lights.destroy(handle)
    }

    pub fn light_mut(&mut self, handle: Handle<Light>) -> Option<&mut Light> {
        self.lights.get_mut(handle)
    }

    // ------------------------------------------------------------------
    // Frame API (§6)
    // ------------------------------------------------------------------

    /// Begins a frame: snapshots `camera`/`environment`, resolves `target`
    /// to a render texture (the default off-screen target when `None`),
    /// and clears the draw queue for new submissions.
    pub fn begin_3d(&mut self, camera: Camera, environment: Environment, target: Option<Uuid>) {
        if self.frame.is_some() {
            log::error!("begin_3d called while a frame is already open, previous frame's draws are discarded");
        }
        let resolved_target = target.unwrap_or(self.default_target);
        if !self.render_textures.contains_key(&resolved_target) {
            log::error!("begin_3d target {resolved_target} does not exist, falling back to the default target");
        }
        let resolved_target = if self.render_textures.contains_key(&resolved_target) {
            resolved_target
        } else {
            self.default_target
        };

        self.draw_calls.begin_frame();
        self.frame = Some(FrameState {
            camera: camera.extract(),
            environment,
            target: resolved_target,
        });
    }

    /// §6's `draw_mesh`.
    pub fn draw_mesh(&mut self, mesh: Handle<Mesh>, material: Handle<Material>, transform: Affine3A) {
        let Some(material_value) = self.materials.get(material).copied() else {
            log::error!("draw_mesh referenced a stale material handle, draw dropped");
            return;
        };
        let Some(mesh_ref) = self.meshes.get(mesh) else {
            log::error!("draw_mesh referenced a stale mesh handle, draw dropped");
            return;
        };
        let submission = MeshSubmission {
            mesh: crate::draw::MeshVariant::Static(mesh),
            local_bounds: mesh_ref.bounds,
            material: material_value,
            texture_slots_exist: texture_slots_for(&material_value, &self.material_shaders),
            dynamic_range_index: None,
        };
        self.draw_calls.push_mesh(submission, transform, None, 0);
    }

    /// §6's `draw_mesh_instanced`.
    pub fn draw_mesh_instanced(
        &mut self,
        mesh: Handle<Mesh>,
        instances: Handle<InstanceBuffer>,
        instance_count: u32,
        material: Handle<Material>,
        transform: Affine3A,
    ) {
        let Some(material_value) = self.materials.get(material).copied() else {
            log::error!("draw_mesh_instanced referenced a stale material handle, draw dropped");
            return;
        };
        let Some(mesh_ref) = self.meshes.get(mesh) else {
            log::error!("draw_mesh_instanced referenced a stale mesh handle, draw dropped");
            return;
        };
        let Some(instance_buffer) = self.instance_buffers.get(instances) else {
            log::error!("draw_mesh_instanced referenced a stale instance buffer, draw dropped");
            return;
        };
        if !instance_buffer.supports_instance_count(instance_count as usize) {
            log::error!("instance_count {instance_count} exceeds an enabled instance channel's length, draw dropped");
            return;
        }
        let instances_id = instance_buffer.buffer_id(crate::instance_buffer::InstanceSlot::Transform);
        let submission = MeshSubmission {
            mesh: crate::draw::MeshVariant::Static(mesh),
            local_bounds: mesh_ref.bounds,
            material: material_value,
            texture_slots_exist: texture_slots_for(&material_value, &self.material_shaders),
            dynamic_range_index: None,
        };
        self.draw_calls.push_mesh(submission, transform, instances_id, instance_count);
    }

    /// §6's `draw_dynamic_mesh`: submits whatever geometry is currently
    /// staged in `mesh` (its last `DynamicMesh::end` upload). A dynamic
    /// mesh with no uploaded geometry yet (never `end()`-ed, or `end()`-ed
    /// with nothing staged) drops the draw.
    pub fn draw_dynamic_mesh(&mut self, mesh: Handle<DynamicMesh>, material: Handle<Material>, transform: Affine3A) {
        let Some(material_value) = self.materials.get(material).copied() else {
            log::error!("draw_dynamic_mesh referenced a stale material handle, draw dropped");
            return;
        };
        let Some(dynamic) = self.dynamic_meshes.get(mesh) else {
            log::error!("draw_dynamic_mesh referenced a stale dynamic mesh handle, draw dropped");
            return;
        };
        let Some(mesh_ref) = dynamic.mesh.as_ref() else {
            log::error!("draw_dynamic_mesh referenced a dynamic mesh with no uploaded geometry, draw dropped");
            return;
        };
        let submission = MeshSubmission {
            mesh: crate::draw::MeshVariant::Dynamic(mesh.to_bits()),
            local_bounds: mesh_ref.bounds,
            material: material_value,
            texture_slots_exist: texture_slots_for(&material_value, &self.material_shaders),
            dynamic_range_index: None,
        };
        self.draw_calls.push_mesh(submission, transform, None, 0);
    }

    /// §6's `draw_model`.
    pub fn draw_model(&mut self, model: Handle<Model>, transform: Affine3A) {
        self.draw_model_instanced(model, None, 0, transform);
    }

    /// §6's `draw_model_instanced`.
    pub fn draw_model_instanced(&mut self, model: Handle<Model>, instances: Option<Handle<InstanceBuffer>>, instance_count: u32, transform: Affine3A) {
        let Some(model_ref) = self.models.get(model) else {
            log::error!("draw_model(_instanced) referenced a stale model handle, draw dropped");
            return;
        };
        let mut per_mesh = Vec::with_capacity(model_ref.meshes.len());
        for (index, &mesh_handle) in model_ref.meshes.iter().enumerate() {
            let Some(mesh_ref) = self.meshes.get(mesh_handle) else {
                log::error!("model referenced a stale mesh handle at index {index}, that mesh is skipped");
                continue;
            };
            let material = *model_ref.material_for_mesh(index);
            per_mesh.push(MeshSubmission {
                mesh: crate::draw::MeshVariant::Static(mesh_handle),
                local_bounds: mesh_ref.bounds,
                material,
                texture_slots_exist: texture_slots_for(&material, &self.material_shaders),
                dynamic_range_index: None,
            });
        }
        if per_mesh.is_empty() {
            return;
        }

        let instances_id = instances.and_then(|h| self.instance_buffers.get(h)).and_then(|ib| ib.buffer_id(crate::instance_buffer::InstanceSlot::Transform));
        let world_pose = model_ref.override_pose.as_deref();
        let mesh_count = per_mesh.len();
        self.draw_calls.push_model(model_ref, per_mesh, transform, instances_id, instance_count.max(u32::from(mesh_count > 0)), world_pose);
    }

    /// §6's `end_3d`: uploads, culls, sorts, renders the shadow passes and
    /// the main color pass, and closes the frame.
    pub fn end_3d(&mut self) {
        let Some(frame) = self.frame.take() else {
            log::error!("end_3d called without a matching begin_3d, nothing to draw");
            return;
        };

        let mut environment = frame.environment;
        environment.scene_bounds = self.scene_bounds();

        let device = self.context.device();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scene3d.end_3d"),
        });

        let (light_records, shadow_records) = self.lights.prepare_frame(&environment.scene_bounds, self.last_frame_instant_dt);
        self.upload_lights(&mut encoder, &light_records, &shadow_records);

        let env_gpu = environment.gpu_data(self.config.bloom_max_mip_levels);
        self.environment_buffer.upload(self.context.queue(), 0, bytemuck::bytes_of(&env_gpu));

        let camera_gpu = CameraGpu::from_render_camera(&frame.camera);
        self.camera_buffer.upload(self.context.queue(), 0, bytemuck::bytes_of(&camera_gpu));

        let cull_mask = u32::MAX;
        {
            let device = self.context.device();
            let queue = self.context.queue();
            let shared_buffer = &mut self.shared_buffer;
            let unique_buffer = &mut self.unique_buffer;
            let bone_buffer = &mut self.bone_buffer;
            let meshes = &self.meshes;
            self.draw_calls.upload(device, &mut encoder, queue, shared_buffer, unique_buffer, bone_buffer, |u| {
                Self::mesh_layer_mask_for(meshes, u)
            });
        }
        if environment.view_frustum_culling() {
            let meshes = &self.meshes;
            self.draw_calls.cull(&frame.camera.frustum, cull_mask, |u| Self::mesh_layer_mask_for(meshes, u));
        } else {
            let meshes = &self.meshes;
            self.draw_calls.cull(&crate::bounds::Frustum::from_matrix(frame.camera.view_projection), u32::MAX, |_| u16::MAX);
            let _ = meshes;
        }
        self.draw_calls.sort(&environment, frame.camera.position.into());

        self.render_shadow_passes(&mut encoder);
        self.render_main_pass(&mut encoder, &frame, &environment);
        self.render_post_process(&mut encoder, frame.target);

        self.context.queue().submit(std::iter::once(encoder.finish()));

        for handle in self.lights.lights_needing_shadow_update() {
            self.lights.consume_shadow_update(handle);
        }
        for (_, shader) in self.material_shaders.iter_mut() {
            shader.clear_dynamic_buffer();
        }
    }

    fn mesh_layer_mask_for(meshes: &Arena<Mesh>, unique: &crate::draw::UniqueData) -> u16 {
        match unique.mesh {
            crate::draw::MeshVariant::Static(handle) => meshes.get(handle).map_or(u16::MAX, |m| m.layer_mask),
            crate::draw::MeshVariant::Dynamic(_) => u16::MAX,
        }
    }

    fn scene_bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for shared in self.draw_calls.shared() {
            bounds = bounds.union(&shared.bounding_sphere.transform(&Affine3A::IDENTITY).bounding_aabb());
        }
        bounds
    }

    fn upload_lights(&mut self, encoder: &mut wgpu::CommandEncoder, lights: &[crate::light::LightGpu], shadows: &[crate::light::ShadowGpu]) {
        let device = self.context.device();
        let queue = self.context.queue();
        let light_size = (lights.len() * std::mem::size_of::<crate::light::LightGpu>()).max(16) as u64;
        let shadow_size = (shadows.len() * std::mem::size_of::<crate::light::ShadowGpu>()).max(16) as u64;
        self.light_buffer.reserve(device, encoder, light_size, false);
        self.shadow_buffer.reserve(device, encoder, shadow_size, false);
        if !lights.is_empty() {
            self.light_buffer.upload(queue, 0, bytemuck::cast_slice(lights));
        }
        if !shadows.is_empty() {
            self.shadow_buffer.upload(queue, 0, bytemuck::cast_slice(shadows));
        }
    }

    /// Builds group 0 (§6's fixed frame bindings): lights, shadows, camera,
    /// the default sampler, and the environment uniform. Rebuilt once per
    /// pass rather than cached, since the buffers it references can be
    /// reallocated (and their `wgpu::Buffer` swapped out) by `Buffer::reserve`
    /// between frames.
    fn build_frame_bind_group(&self) -> wgpu::BindGroup {
        self.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene3d.frame_bind_group"),
            layout: &self.builtin.frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: crate::binding::LIGHT_ARRAY_BINDING,
                    resource: self.light_buffer.raw().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: crate::binding::SHADOW_ARRAY_BINDING,
                    resource: self.shadow_buffer.raw().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: crate::binding::CAMERA_BINDING,
                    resource: self.camera_buffer.raw().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: crate::binding::DEFAULT_SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&self.default_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: crate::binding::ENVIRONMENT_BINDING,
                    resource: self.environment_buffer.raw().as_entire_binding(),
                },
            ],
        })
    }

    /// Builds group 1 (§6's shared/unique draw bindings) as whole-buffer
    /// storage arrays; a draw selects its own record via
    /// `@builtin(instance_index)` rather than a per-draw bind group (see
    /// `src/shader/builtin.rs`'s doc comment), so this is built once per
    /// pass and reused across every draw in it.
    fn build_draw_bind_group(&self) -> wgpu::BindGroup {
        self.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene3d.draw_bind_group"),
            layout: &self.builtin.draw_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: crate::binding::SHARED_DRAW_BINDING,
                    resource: self.shared_buffer.raw().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: crate::binding::UNIQUE_DRAW_BINDING,
                    resource: self.unique_buffer.raw().as_entire_binding(),
                },
            ],
        })
    }

    /// Resolves a texture id to its view, falling back to the context's
    /// default white texture for an id this scene doesn't recognize (a
    /// stale/destroyed texture behaves like "no texture", per §7's
    /// fallback-over-panic propagation policy).
    fn resolve_texture_view(&self, id: u64) -> &wgpu::TextureView {
        if id == self.context.default_white_texture().id() {
            return self.context.default_white_texture().view();
        }
        match self.textures.get(&id) {
            Some(texture) => texture.view(),
            None => self.context.default_white_texture().view(),
        }
    }

    /// Builds group 2 (§6's material texture bindings) for one material's
    /// resolved four texture slots.
    fn build_material_bind_group(&self, material: &Material) -> wgpu::BindGroup {
        let white = self.context.default_white_texture().id();
        let albedo = Material::resolve_texture(material.textures.albedo, white);
        let emission = Material::resolve_texture(material.textures.emission, white);
        let orm = Material::resolve_texture(material.textures.orm, white);
        let normal = Material::resolve_texture(material.textures.normal, white);
        self.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene3d.material_bind_group"),
            layout: &self.builtin.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: crate::shader::TEXTURE_SAMPLER_BINDINGS[0],
                    resource: wgpu::BindingResource::TextureView(self.resolve_texture_view(albedo)),
                },
                wgpu::BindGroupEntry {
                    binding: crate::shader::TEXTURE_SAMPLER_BINDINGS[1],
                    resource: wgpu::BindingResource::TextureView(self.resolve_texture_view(emission)),
                },
                wgpu::BindGroupEntry {
                    binding: crate::shader::TEXTURE_SAMPLER_BINDINGS[2],
                    resource: wgpu::BindingResource::TextureView(self.resolve_texture_view(orm)),
                },
                wgpu::BindGroupEntry {
                    binding: crate::shader::TEXTURE_SAMPLER_BINDINGS[3],
                    resource: wgpu::BindingResource::TextureView(self.resolve_texture_view(normal)),
                },
            ],
        })
    }

    /// Resolves a unique record's mesh reference to the `Mesh` backing its
    /// geometry, covering both `MeshVariant` cases uniformly.
    fn resolve_draw_mesh(&self, variant: crate::draw::MeshVariant) -> Option<&Mesh> {
        match variant {
            crate::draw::MeshVariant::Static(handle) => self.meshes.get(handle),
            crate::draw::MeshVariant::Dynamic(bits) => self.dynamic_meshes.get(Handle::from_bits(bits)).and_then(|d| d.mesh.as_ref()),
        }
    }

    /// Draws one [`crate::draw::DrawCategory`] bucket's visible draws in
    /// already-sorted order. `variant`'s program is resolved from the
    /// material's own compiled `MaterialShader` first, falling back to the
    /// matching built-in program when the material has none (§6's lit
    /// fallback requirement) — a draw is only skipped when its mesh has no
    /// uploaded geometry, never for a missing program.
    fn draw_bucket(
        &self,
        pipeline: &mut GpuPipeline<'_>,
        category: crate::draw::DrawCategory,
        variant: SceneVariant,
        resolve_buffer: &dyn Fn(u64) -> Option<&wgpu::Buffer>,
        material_bind_groups: &FxHashMap<u32, wgpu::BindGroup>,
    ) {
        for &index in self.draw_calls.visible(category) {
            let unique = self.draw_calls.unique_at(index);

            let program = unique
                .material
                .shader
                .and_then(|h| self.material_shaders.get(h))
                .and_then(|s| s.program(variant))
                .unwrap_or_else(|| self.builtin.program_for(variant));

            let Some(mesh) = self.resolve_draw_mesh(unique.mesh) else {
                log::debug!("draw referenced a mesh with no uploaded geometry, draw skipped");
                continue;
            };

            pipeline.use_program(program);
            if let Some(material_bind_group) = material_bind_groups.get(&index) {
                pipeline.set_bind_group(2, material_bind_group);
            }
            pipeline.bind_vertex_array(&mesh.vertex_array, |id| resolve_buffer(id));
            pipeline.set_cull_mode(map_cull_mode(unique.material.cull));

            let index_count = mesh.index_count;
            if mesh.has_indices() {
                pipeline.draw_elements_instanced(0..index_count, index..index + 1);
            } else {
                pipeline.draw_instanced(0..index_count.max(3), index..index + 1);
            }
        }
    }

    fn render_main_pass(&mut self, encoder: &mut wgpu::CommandEncoder, frame: &FrameState, environment: &Environment) {
        let Some(target) = self.render_textures.get(&frame.target) else {
            log::error!("end_3d's resolved target vanished mid-frame, main pass skipped");
            return;
        };
        let (width, height) = target.size();
        let clear = environment.background_premultiplied();

        let frame_bind_group = self.build_frame_bind_group();
        let draw_bind_group = self.build_draw_bind_group();
        let mut material_bind_groups: FxHashMap<u32, wgpu::BindGroup> = FxHashMap::default();
        for category in [
            crate::draw::DrawCategory::Prepass,
            crate::draw::DrawCategory::Opaque,
            crate::draw::DrawCategory::Transparent,
        ] {
            for &index in self.draw_calls.visible(category) {
                if material_bind_groups.contains_key(&index) {
                    continue;
                }
                let unique = self.draw_calls.unique_at(index);
                let bind_group = self.build_material_bind_group(&unique.material);
                material_bind_groups.insert(index, bind_group);
            }
        }

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene3d.main_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color.view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: f64::from(clear.x),
                        g: f64::from(clear.y),
                        b: f64::from(clear.z),
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: target.depth.view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let dummy_id = self.context.dummy_vertex_buffer().id();
        let mut pipeline = GpuPipeline::new(pass, dummy_id);
        pipeline.set_viewport(0.0, 0.0, width as f32, height as f32);
        pipeline.set_scissor(0, 0, width, height);
        pipeline.set_bind_group(0, &frame_bind_group);
        pipeline.set_bind_group(1, &draw_bind_group);

        let resolve_buffer = |id: u64| self.resolve_vertex_buffer(id);
        self.draw_bucket(&mut pipeline, crate::draw::DrawCategory::Prepass, SceneVariant::Prepass, &resolve_buffer, &material_bind_groups);
        self.draw_bucket(&mut pipeline, crate::draw::DrawCategory::Opaque, SceneVariant::Lit, &resolve_buffer, &material_bind_groups);
        self.draw_bucket(&mut pipeline, crate::draw::DrawCategory::Transparent, SceneVariant::Lit, &resolve_buffer, &material_bind_groups);
        drop(pipeline);
    }

    /// §4's shadow pass: renders shadow-casting static geometry into each
    /// due-for-update light's atlas layer from that light's own view
    /// projection (§6's `Shadow` variant), then leaves `end_3d`'s existing
    /// `consume_shadow_update` loop to clear the due-for-update flags.
    /// Limited to `view_projection(0)`/`frustum(0)` — the single-face
    /// simplification `LightManager::prepare_frame` already applies to a
    /// light's own GPU shadow record — so an omni light's other five cube
    /// faces are not rendered this round (see DESIGN.md), and only
    /// `MeshVariant::Static` meshes cast shadows.
    fn render_shadow_passes(&mut self, encoder: &mut wgpu::CommandEncoder) {
        let pending = self.lights.lights_needing_shadow_update();
        if pending.is_empty() {
            return;
        }

        let total_size = SHADOW_CAMERA_STRIDE * pending.len() as u64;
        {
            let device = self.context.device();
            self.shadow_camera_buffer.reserve(device, encoder, total_size, false);
        }

        let mut slots = Vec::with_capacity(pending.len());
        for (slot_index, &handle) in pending.iter().enumerate() {
            let Some(light) = self.lights.get(handle) else { continue };
            let Some(map_slot) = light.shadow_map_slot else {
                log::error!("shadow update pending for a light with no atlas slot, skipped");
                continue;
            };
            let Some(vp) = light.view_projection(0) else { continue };
            let camera_gpu = CameraGpu {
                view_proj: vp.to_cols_array_2d(),
                position: [0.0; 3],
                near: 0.0,
                far: 0.0,
                _pad: [0.0; 3],
            };
            let offset = slot_index as u64 * SHADOW_CAMERA_STRIDE;
            self.shadow_camera_buffer.upload(self.context.queue(), offset, bytemuck::bytes_of(&camera_gpu));
            slots.push((handle, map_slot, offset));
        }

        let resolution = self.config.shadow_map_resolution;
        for (handle, map_slot, offset) in slots {
            let view = self.shadow_atlas_texture.raw().create_view(&wgpu::TextureViewDescriptor {
                base_array_layer: map_slot,
                array_layer_count: Some(1),
                dimension: Some(wgpu::TextureViewDimension::D2),
                ..Default::default()
            });

            let shadow_frame_bind_group = self.device().create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("scene3d.shadow_frame_bind_group"),
                layout: &self.builtin.shadow_frame_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: crate::binding::CAMERA_BINDING,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: self.shadow_camera_buffer.raw(),
                        offset,
                        size: std::num::NonZeroU64::new(std::mem::size_of::<CameraGpu>() as u64),
                    }),
                }],
            });
            let draw_bind_group = self.build_draw_bind_group();

            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene3d.shadow_pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let dummy_id = self.context.dummy_vertex_buffer().id();
            let mut pipeline = GpuPipeline::new(pass, dummy_id);
            pipeline.set_viewport(0.0, 0.0, resolution as f32, resolution as f32);
            pipeline.set_scissor(0, 0, resolution, resolution);
            pipeline.use_program(&self.builtin.shadow);
            pipeline.set_bind_group(0, &shadow_frame_bind_group);
            pipeline.set_bind_group(1, &draw_bind_group);

            for (index, unique) in self.draw_calls.unique().iter().enumerate() {
                let crate::draw::MeshVariant::Static(mesh_handle) = unique.mesh else {
                    continue;
                };
                let Some(mesh) = self.meshes.get(mesh_handle) else { continue };
                if mesh.shadow_cast == crate::mesh::ShadowCastMode::Disabled {
                    continue;
                }
                let faces = self.lights.shadow_faces_for_obb(handle, &unique.obb, mesh.shadow_cast);
                if !faces.contains(&0) {
                    continue;
                }
                let cull = LightManager::resolve_shadow_cull_mode(unique.material.cull, convert_shadow_face_mode(mesh.shadow_face));
                pipeline.bind_vertex_array(&mesh.vertex_array, |id| self.resolve_vertex_buffer(id));
                pipeline.set_cull_mode(map_cull_mode(cull));
                let index_u32 = index as u32;
                if mesh.has_indices() {
                    pipeline.draw_elements_instanced(0..mesh.index_count, index_u32..index_u32 + 1);
                } else {
                    pipeline.draw_instanced(0..mesh.index_count.max(3), index_u32..index_u32 + 1);
                }
            }
            drop(pipeline);
        }
    }

    /// §4.8's post-process stage: consumes the environment uniform already
    /// written this frame (SSAO, bloom, tonemap, color grading) against the
    /// main pass's own color+depth attachments, copying the graded result
    /// back into the target.
    fn render_post_process(&mut self, encoder: &mut wgpu::CommandEncoder, target_id: Uuid) {
        let Some(target) = self.render_textures.get(&target_id) else {
            log::error!("end_3d's resolved target vanished mid-frame, post-process skipped");
            return;
        };
        let (width, height) = target.size();
        let color_format = target.color.format();

        let scratch = Texture::new(
            self.device(),
            &wgpu::TextureDescriptor {
                label: None,
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: color_format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            "scene3d.post_process.scratch",
        );

        let bind_group = self.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene3d.post_process_bind_group"),
            layout: &self.builtin.post_process_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(target.color.view()) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(target.depth.view()) },
                wgpu::BindGroupEntry { binding: 2, resource: self.environment_buffer.raw().as_entire_binding() },
            ],
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene3d.post_process_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: scratch.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(self.builtin.post_process.pipeline());
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: scratch.raw(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: target.color.raw(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
    }

    fn resolve_vertex_buffer(&self, id: u64) -> Option<&wgpu::Buffer> {
        if id == self.context.dummy_vertex_buffer().id() {
            return Some(self.context.dummy_vertex_buffer().raw());
        }
        for (_, mesh) in self.meshes.iter() {
            if mesh.vertex_buffer.id() == id {
                return Some(mesh.vertex_buffer.raw());
            }
        }
        for (_, dynamic) in self.dynamic_meshes.iter() {
            if let Some(mesh) = dynamic.mesh.as_ref() {
                if mesh.vertex_buffer.id() == id {
                    return Some(mesh.vertex_buffer.raw());
                }
            }
        }
        None
    }

    /// §6's `shutdown`: drops every GPU resource. Consuming `self` is the
    /// Rust analogue of the source's explicit teardown call — there is no
    /// further method to call afterward.
    pub fn shutdown(self) {
        log::info!("scene3d shutdown: releasing {} meshes, {} models, {} material shaders", self.meshes.len(), self.models.len(), self.material_shaders.len());
    }
}

/// Resolves which of the four fixed texture slots a material's compiled
/// shader actually declares, falling back to "none" for a material with
/// no custom shader (the built-in lit shader's own slot usage is fixed
/// and known at compile time, not introspected here).
fn texture_slots_for(material: &Material, shaders: &Arena<MaterialShader>) -> [bool; 4] {
    material
        .shader
        .and_then(|h| shaders.get(h))
        .map_or([false; 4], |s| std::array::from_fn(|i| s.texture_slot_exists(i)))
}

/// Whether `format` stores its channels as 16-bit floats, i.e. needs the
/// host's declared element type narrowed via [`crate::gpu::convert_to_f16`]
/// before upload.
fn is_f16_format(format: wgpu::TextureFormat) -> bool {
    matches!(
        format,
        wgpu::TextureFormat::R16Float | wgpu::TextureFormat::Rg16Float | wgpu::TextureFormat::Rgba16Float
    )
}

fn map_cull_mode(mode: crate::material::CullMode) -> crate::gpu::CullMode {
    match mode {
        crate::material::CullMode::None => crate::gpu::CullMode::None,
        crate::material::CullMode::Front => crate::gpu::CullMode::Front,
        crate::material::CullMode::Back => crate::gpu::CullMode::Back,
    }
}

/// Bridges a mesh's own `ShadowFaceMode` to the light module's identically
/// named type (§4's shadow-face resolution operates in terms of the
/// latter).
fn convert_shadow_face_mode(mode: crate::mesh::ShadowFaceMode) -> crate::light::ShadowFaceMode {
    match mode {
        crate::mesh::ShadowFaceMode::Auto => crate::light::ShadowFaceMode::Auto,
        crate::mesh::ShadowFaceMode::Front => crate::light::ShadowFaceMode::Front,
        crate::mesh::ShadowFaceMode::Back => crate::light::ShadowFaceMode::Back,
        crate::mesh::ShadowFaceMode::Both => crate::light::ShadowFaceMode::Both,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;

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

    #[test]
    fn destroying_a_stale_mesh_handle_is_idempotent() {
        let mut scene = test_scene();
        let mesh = scene.create_mesh(
            &[crate::mesh::Vertex {
                position: glam::Vec3::ZERO,
                texcoord: glam::Vec2::ZERO,
                normal: glam::Vec3::Z,
                tangent: glam::Vec4::new(1.0, 0.0, 0.0, 1.0),
                color: glam::Vec4::ONE,
                bone_ids: [0; 4],
                bone_weights: glam::Vec4::ZERO,
            }; 3],
            None,
        );
        assert!(scene.destroy_mesh(mesh));
        assert!(!scene.destroy_mesh(mesh));
    }

    #[test]
    fn draw_mesh_with_stale_handle_does_not_panic() {
        let mut scene = test_scene();
        let material = scene.create_material(Material::default());
        let bogus_mesh_scene = test_scene();
        let bogus_mesh = bogus_mesh_scene
            .meshes
            .iter()
            .next()
            .map(|(h, _)| h)
            .unwrap_or_else(|| {
                let mut s = test_scene();
                let h = s.create_mesh(
                    &[crate::mesh::Vertex {
                        position: glam::Vec3::ZERO,
                        texcoord: glam::Vec2::ZERO,
                        normal: glam::Vec3::Z,
                        tangent: glam::Vec4::new(1.0, 0.0, 0.0, 1.0),
                        color: glam::Vec4::ONE,
                        bone_ids: [0; 4],
                        bone_weights: glam::Vec4::ZERO,
                    }; 3],
                    None,
                );
                s.destroy_mesh(h);
                h
            });
        scene.draw_mesh(bogus_mesh, material, Affine3A::IDENTITY);
    }

    #[test]
    fn begin_3d_without_target_resolves_to_default() {
        let mut scene = test_scene();
        scene.begin_3d(
            Camera {
                position: glam::Vec3::new(0.0, 0.0, 5.0),
                forward: -glam::Vec3::Z,
                up: glam::Vec3::Y,
                projection: crate::camera::Projection::Perspective {
                    fov_y_radians: 1.0,
                    aspect: 1.0,
                },
                near: 0.1,
                far: 100.0,
            },
            Environment::default(),
            None,
        );
        assert_eq!(scene.frame.as_ref().unwrap().target, scene.default_target);
        scene.end_3d();
        assert!(scene.frame.is_none());
    }
}
