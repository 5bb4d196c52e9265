//! Built-in fallback shader variants.
//!
//! Every [`super::MaterialShader`] is optional — a [`crate::material::Material`]
//! with `shader: None`, or whose `MaterialShader` hasn't compiled a program
//! for the variant currently being drawn, falls back to these. The built-in
//! programs cover the fixed per-draw bind groups ([`crate::binding`]) and the
//! standard vertex layout ([`crate::mesh::Mesh::new`]'s attribute order) but
//! skip skinning and per-material blend-mode selection: they always blend,
//! and `SharedDrawGpu::bone_offset`/`BONE_MATRIX_BINDING` are not bound to
//! this pipeline's draw group. A material that needs either must supply its
//! own compiled `MaterialShader`.
//!
//! `shared_draws`/`unique_draws` are bound once per pass as whole-buffer
//! storage arrays; a draw selects its own record by issuing exactly one
//! instance at `@builtin(instance_index) == unique_index` (mirroring how
//! `lights`/`shadows` are already indexed), so GPU instancing through the
//! separate per-instance-buffer path is not honored by these fallbacks —
//! each draw renders its one record regardless of `SharedDrawGpu::instancing`.

use crate::binding::{
    CAMERA_BINDING, DEFAULT_SAMPLER_BINDING, ENVIRONMENT_BINDING, LIGHT_ARRAY_BINDING,
    SHADOW_ARRAY_BINDING, SHARED_DRAW_BINDING, UNIQUE_DRAW_BINDING,
};
use crate::context::FULLSCREEN_VERTEX_WGSL;
use crate::gpu::Program;
use crate::mesh::Vertex;
use crate::shader::SceneVariant;
use std::mem::offset_of;

// Mirrors every GPU-facing struct in this crate with no explicit padding
// fields: WGSL aligns `vec3<f32>` to 16 bytes (packing the following scalar
// into the trailing 4 bytes) and rounds a struct's size up to its largest
// member's alignment, which reproduces the same offsets/size as the
// hand-padded Rust `bytemuck` records without restating the padding here.
const COMMON_STRUCTS_WGSL: &str = r"
struct LightRecord {
    color: vec3<f32>,
    energy: f32,
    position: vec3<f32>,
    range: f32,
    direction: vec3<f32>,
    spot_angle_cos: f32,
    specular: f32,
    kind: i32,
    shadow_index: i32,
    layer_mask: u32,
}

struct ShadowRecord {
    view_proj: mat4x4<f32>,
    bleeding_bias: f32,
    softness: f32,
    lambda: f32,
    map_index: u32,
}

struct CameraUniform {
    view_proj: mat4x4<f32>,
    position: vec3<f32>,
    near: f32,
    far: f32,
}

struct SharedDraw {
    mat_model: mat4x4<f32>,
    mat_normal: mat4x4<f32>,
    bone_offset: i32,
    instancing: i32,
    skinning: i32,
}

struct UniqueDraw {
    albedo: vec4<f32>,
    emission: vec3<f32>,
    emission_energy: f32,
    ao_light_affect: f32,
    occlusion: f32,
    roughness: f32,
    metalness: f32,
    normal_scale: f32,
    alpha_cutoff: f32,
    depth_offset: f32,
    depth_scale: f32,
    tex_offset: vec2<f32>,
    tex_scale: vec2<f32>,
    billboard: i32,
    layer_mask: u32,
    shared_index: u32,
}

struct EnvironmentUniform {
    ambient_color: vec3<f32>,
    sky_rotation: vec4<f32>,
    fog_color: vec3<f32>,
    bloom_prefilter: vec4<f32>,
    sky_intensity: f32,
    sky_specular: f32,
    sky_diffuse: f32,
    fog_density: f32,
    fog_start: f32,
    fog_end: f32,
    fog_sky_affect: f32,
    fog_mode: i32,
    ssao_intensity: f32,
    ssao_radius: f32,
    ssao_power: f32,
    ssao_bias: f32,
    ssao_enabled: i32,
    bloom_filter_radius: f32,
    bloom_strength: f32,
    bloom_mode: i32,
    adjust_brightness: f32,
    adjust_contrast: f32,
    adjust_saturation: f32,
    tonemap_exposure: f32,
    tonemap_white: f32,
    tonemap_mode: i32,
}
";

const FRAME_BINDINGS_WGSL: &str = r"
@group(0) @binding(3) var<storage, read> lights: array<LightRecord>;
@group(0) @binding(4) var<storage, read> shadows: array<ShadowRecord>;
@group(0) @binding(5) var<uniform> camera: CameraUniform;
@group(0) @binding(12) var default_sampler: sampler;
@group(0) @binding(13) var<uniform> environment: EnvironmentUniform;
";

const SHADOW_FRAME_BINDINGS_WGSL: &str = r"
@group(0) @binding(5) var<uniform> camera: CameraUniform;
";

// Both buffers are bound whole, for the entire pass, rather than rebuilt
// per draw: each draw call instead carries its own record's index as its
// `@builtin(instance_index)` (see `vs_main`/`vs_shadow`), the same pattern
// already used for indexing `lights`/`shadows`. This sidesteps wgpu's
// buffer-offset alignment rules entirely instead of needing one bind group
// per draw.
const DRAW_BINDINGS_WGSL: &str = r"
@group(1) @binding(0) var<storage, read> shared_draws: array<SharedDraw>;
@group(1) @binding(1) var<storage, read> unique_draws: array<UniqueDraw>;
";

const MATERIAL_BINDINGS_WGSL: &str = r"
@group(2) @binding(31) var tex_albedo: texture_2d<f32>;
@group(2) @binding(30) var tex_emission: texture_2d<f32>;
@group(2) @binding(29) var tex_orm: texture_2d<f32>;
@group(2) @binding(28) var tex_normal: texture_2d<f32>;
";

const VERTEX_IO_WGSL: &str = r"
struct VertexInput {
    @builtin(instance_index) instance_index: u32,
    @location(0) position: vec3<f32>,
    @location(1) texcoord: vec2<f32>,
    @location(2) normal: vec3<f32>,
    @location(3) tangent: vec4<f32>,
    @location(4) color: vec4<f32>,
    @location(5) bone_ids: vec4<i32>,
    @location(6) bone_weights: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) texcoord: vec2<f32>,
    @location(3) color: vec4<f32>,
    @location(4) @interpolate(flat) unique_index: u32,
}
";

const VS_MAIN_WGSL: &str = r"
@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let unique = unique_draws[input.instance_index];
    let shared = shared_draws[unique.shared_index];
    let world = shared.mat_model * vec4<f32>(input.position, 1.0);
    out.world_position = world.xyz;
    out.clip_position = camera.view_proj * world;
    let normal_mat = mat3x3<f32>(
        shared.mat_normal[0].xyz,
        shared.mat_normal[1].xyz,
        shared.mat_normal[2].xyz,
    );
    out.world_normal = normalize(normal_mat * input.normal);
    out.texcoord = input.texcoord * unique.tex_scale + unique.tex_offset;
    out.color = input.color;
    out.unique_index = input.instance_index;
    return out;
}
";

const VS_SHADOW_WGSL: &str = r"
@vertex
fn vs_shadow(input: VertexInput) -> @builtin(position) vec4<f32> {
    let unique = unique_draws[input.instance_index];
    let shared = shared_draws[unique.shared_index];
    let world = shared.mat_model * vec4<f32>(input.position, 1.0);
    return camera.view_proj * world;
}
";

const FS_UNLIT_WGSL: &str = r"
@fragment
fn fs_unlit(in: VertexOutput) -> @location(0) vec4<f32> {
    let unique = unique_draws[in.unique_index];
    let sampled = textureSample(tex_albedo, default_sampler, in.texcoord);
    let base_color = sampled * unique.albedo * in.color;
    if base_color.a < unique.alpha_cutoff {
        discard;
    }
    return base_color;
}
";

const FS_LIT_WGSL: &str = r"
@fragment
fn fs_lit(in: VertexOutput) -> @location(0) vec4<f32> {
    let unique = unique_draws[in.unique_index];
    let sampled = textureSample(tex_albedo, default_sampler, in.texcoord);
    let base_color = sampled * unique.albedo * in.color;
    if base_color.a < unique.alpha_cutoff {
        discard;
    }

    var lit = environment.ambient_color * base_color.rgb;
    let light_count = arrayLength(&lights);
    var i: u32 = 0u;
    loop {
        if i >= light_count {
            break;
        }
        let light = lights[i];
        var light_dir = normalize(-light.direction);
        var attenuation = 1.0;
        if light.kind != 0 {
            let to_light = light.position - in.world_position;
            let dist = length(to_light);
            light_dir = to_light / max(dist, 1e-4);
            let falloff = clamp(1.0 - dist / max(light.range, 1e-4), 0.0, 1.0);
            attenuation = falloff * falloff;
        }
        let ndotl = max(dot(in.world_normal, light_dir), 0.0);
        lit += base_color.rgb * light.color * (light.energy * ndotl * attenuation);
        i = i + 1u;
    }

    let emission = unique.emission * unique.emission_energy;
    return vec4<f32>(lit + emission, base_color.a);
}
";

const FS_POST_WGSL: &str = r"
@group(0) @binding(0) var hdr_color: texture_2d<f32>;
@group(0) @binding(1) var hdr_depth: texture_depth_2d;
@group(0) @binding(2) var<uniform> environment: EnvironmentUniform;

fn luminance(c: vec3<f32>) -> f32 {
    return dot(c, vec3<f32>(0.299, 0.587, 0.114));
}

fn tonemap(c: vec3<f32>) -> vec3<f32> {
    let exposed = c * environment.tonemap_exposure;
    if environment.tonemap_mode == 0 {
        return exposed;
    } else if environment.tonemap_mode == 1 {
        return exposed / (exposed + vec3<f32>(1.0));
    } else {
        let a = 2.51;
        let b = 0.03;
        let cc = 2.43;
        let d = 0.59;
        let e = 0.14;
        return clamp((exposed * (a * exposed + b)) / (exposed * (cc * exposed + d) + e), vec3<f32>(0.0), vec3<f32>(1.0));
    }
}

@fragment
fn fs_post(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {
    let coord = vec2<i32>(frag_coord.xy);
    var color = textureLoad(hdr_color, coord, 0).rgb;

    if environment.ssao_enabled != 0 {
        let center_depth = textureLoad(hdr_depth, coord, 0);
        var occlusion = 0.0;
        let offsets = array<vec2<i32>, 4>(
            vec2<i32>(1, 0), vec2<i32>(-1, 0), vec2<i32>(0, 1), vec2<i32>(0, -1),
        );
        for (var k = 0; k < 4; k = k + 1) {
            let sample_depth = textureLoad(hdr_depth, coord + offsets[k], 0);
            if sample_depth > center_depth {
                occlusion += environment.ssao_intensity;
            }
        }
        let ao = clamp(1.0 - occlusion * environment.ssao_bias * environment.ssao_power, 0.0, 1.0);
        color *= ao;
    }

    if environment.bloom_mode != 0 {
        let threshold = environment.bloom_prefilter.x;
        let bright = max(luminance(color) - threshold, 0.0);
        color += color * bright * environment.bloom_strength;
    }

    color = tonemap(color);

    let gray = vec3<f32>(luminance(color));
    color = mix(gray, color, environment.adjust_saturation);
    color = (color - vec3<f32>(0.5)) * environment.adjust_contrast + vec3<f32>(0.5);
    color += vec3<f32>(environment.adjust_brightness);

    return vec4<f32>(clamp(color, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}
";

fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 7] = [
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: offset_of!(Vertex, position) as u64,
            shader_location: 0,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: offset_of!(Vertex, texcoord) as u64,
            shader_location: 1,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: offset_of!(Vertex, normal) as u64,
            shader_location: 2,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: offset_of!(Vertex, tangent) as u64,
            shader_location: 3,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: offset_of!(Vertex, color) as u64,
            shader_location: 4,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Sint32x4,
            offset: offset_of!(Vertex, bone_ids) as u64,
            shader_location: 5,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x4,
            offset: offset_of!(Vertex, bone_weights) as u64,
            shader_location: 6,
        },
    ];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

fn storage_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, sample_type: wgpu::TextureSampleType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn build_frame_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("scene3d-builtin-frame-layout"),
        entries: &[
            storage_entry(LIGHT_ARRAY_BINDING, wgpu::ShaderStages::FRAGMENT),
            storage_entry(SHADOW_ARRAY_BINDING, wgpu::ShaderStages::FRAGMENT),
            uniform_entry(
                CAMERA_BINDING,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
            ),
            wgpu::BindGroupLayoutEntry {
                binding: DEFAULT_SAMPLER_BINDING,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            uniform_entry(ENVIRONMENT_BINDING, wgpu::ShaderStages::FRAGMENT),
        ],
    })
}

fn build_shadow_frame_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("scene3d-builtin-shadow-frame-layout"),
        entries: &[uniform_entry(CAMERA_BINDING, wgpu::ShaderStages::VERTEX)],
    })
}

fn build_draw_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("scene3d-builtin-draw-layout"),
        entries: &[
            storage_entry(SHARED_DRAW_BINDING, wgpu::ShaderStages::VERTEX_FRAGMENT),
            storage_entry(UNIQUE_DRAW_BINDING, wgpu::ShaderStages::VERTEX_FRAGMENT),
        ],
    })
}

fn build_material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let float_filterable = wgpu::TextureSampleType::Float { filterable: true };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("scene3d-builtin-material-layout"),
        entries: &[
            texture_entry(31, float_filterable),
            texture_entry(30, float_filterable),
            texture_entry(29, float_filterable),
            texture_entry(28, float_filterable),
        ],
    })
}

fn build_post_process_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("scene3d-builtin-post-process-layout"),
        entries: &[
            texture_entry(0, wgpu::TextureSampleType::Float { filterable: false }),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            uniform_entry(2, wgpu::ShaderStages::FRAGMENT),
        ],
    })
}

fn compile_main_program(
    device: &wgpu::Device,
    label: &str,
    fragment_entry: &str,
    fragment_source_extra: &str,
    frame_layout: &wgpu::BindGroupLayout,
    draw_layout: &wgpu::BindGroupLayout,
    material_layout: &wgpu::BindGroupLayout,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    write_color: bool,
) -> Program {
    let source = format!(
        "{COMMON_STRUCTS_WGSL}{FRAME_BINDINGS_WGSL}{DRAW_BINDINGS_WGSL}{MATERIAL_BINDINGS_WGSL}{VERTEX_IO_WGSL}{VS_MAIN_WGSL}{fragment_source_extra}"
    );
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[frame_layout, draw_layout, material_layout],
        push_constant_ranges: &[],
    });
    let vertex_layout = vertex_buffer_layout();
    let write_mask = if write_color {
        wgpu::ColorWrites::ALL
    } else {
        wgpu::ColorWrites::empty()
    };
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: if write_color {
                    Some(wgpu::BlendState::ALPHA_BLENDING)
                } else {
                    None
                },
                write_mask,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::GreaterEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });
    Program::new(pipeline, label)
}

fn compile_shadow_program(
    device: &wgpu::Device,
    shadow_frame_layout: &wgpu::BindGroupLayout,
    draw_layout: &wgpu::BindGroupLayout,
    depth_format: wgpu::TextureFormat,
) -> Program {
    let source = format!(
        "{COMMON_STRUCTS_WGSL}{SHADOW_FRAME_BINDINGS_WGSL}{DRAW_BINDINGS_WGSL}{VS_SHADOW_WGSL}"
    );
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("scene3d-builtin-shadow"),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("scene3d-builtin-shadow"),
        bind_group_layouts: &[shadow_frame_layout, draw_layout],
        push_constant_ranges: &[],
    });
    let vertex_layout = vertex_buffer_layout();
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scene3d-builtin-shadow"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_shadow"),
            buffers: &[vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: None,
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });
    Program::new(pipeline, "scene3d-builtin-shadow")
}

fn compile_post_process_program(
    device: &wgpu::Device,
    post_process_layout: &wgpu::BindGroupLayout,
    color_format: wgpu::TextureFormat,
) -> Program {
    let vertex_source = format!("{FULLSCREEN_VERTEX_WGSL}");
    let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("scene3d-builtin-post-process-vertex"),
        source: wgpu::ShaderSource::Wgsl(vertex_source.into()),
    });
    let fragment_source = format!("{COMMON_STRUCTS_WGSL}{FS_POST_WGSL}");
    let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("scene3d-builtin-post-process-fragment"),
        source: wgpu::ShaderSource::Wgsl(fragment_source.into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("scene3d-builtin-post-process"),
        bind_group_layouts: &[post_process_layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("scene3d-builtin-post-process"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &vertex_module,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some("fs_post"),
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
    Program::new(pipeline, "scene3d-builtin-post-process")
}

/// The six always-available programs used when a material has no shader of
/// its own (or the shader lacks that variant's program), plus the bind
/// group layouts every draw call in the crate is built against.
pub struct BuiltinPipelines {
    pub frame_layout: wgpu::BindGroupLayout,
    pub shadow_frame_layout: wgpu::BindGroupLayout,
    pub draw_layout: wgpu::BindGroupLayout,
    pub material_layout: wgpu::BindGroupLayout,
    pub post_process_layout: wgpu::BindGroupLayout,
    pub lit: Program,
    pub unlit: Program,
    pub wireframe: Program,
    pub prepass: Program,
    pub shadow: Program,
    pub post_process: Program,
}

impl BuiltinPipelines {
    pub fn build(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let frame_layout = build_frame_layout(device);
        let shadow_frame_layout = build_shadow_frame_layout(device);
        let draw_layout = build_draw_layout(device);
        let material_layout = build_material_layout(device);
        let post_process_layout = build_post_process_layout(device);

        let lit = compile_main_program(
            device,
            "scene3d-builtin-lit",
            "fs_lit",
            FS_LIT_WGSL,
            &frame_layout,
            &draw_layout,
            &material_layout,
            color_format,
            depth_format,
            true,
        );
        let unlit = compile_main_program(
            device,
            "scene3d-builtin-unlit",
            "fs_unlit",
            FS_UNLIT_WGSL,
            &frame_layout,
            &draw_layout,
            &material_layout,
            color_format,
            depth_format,
            true,
        );
        // No hardware wireframe (PolygonMode::Line is a native-only wgpu
        // feature); wireframe materials fall back to the unlit shading model.
        let wireframe = compile_main_program(
            device,
            "scene3d-builtin-wireframe",
            "fs_unlit",
            FS_UNLIT_WGSL,
            &frame_layout,
            &draw_layout,
            &material_layout,
            color_format,
            depth_format,
            true,
        );
        let prepass = compile_main_program(
            device,
            "scene3d-builtin-prepass",
            "fs_unlit",
            FS_UNLIT_WGSL,
            &frame_layout,
            &draw_layout,
            &material_layout,
            color_format,
            depth_format,
            false,
        );
        let shadow = compile_shadow_program(device, &shadow_frame_layout, &draw_layout, depth_format);
        let post_process = compile_post_process_program(device, &post_process_layout, color_format);

        Self {
            frame_layout,
            shadow_frame_layout,
            draw_layout,
            material_layout,
            post_process_layout,
            lit,
            unlit,
            wireframe,
            prepass,
            shadow,
            post_process,
        }
    }

    pub fn program_for(&self, variant: SceneVariant) -> &Program {
        match variant {
            SceneVariant::Lit => &self.lit,
            SceneVariant::Unlit => &self.unlit,
            SceneVariant::Wireframe => &self.wireframe,
            SceneVariant::Prepass => &self.prepass,
            SceneVariant::Shadow => &self.shadow,
        }
    }
}
