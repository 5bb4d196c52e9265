//! Mesh and DynamicMesh (§3).

use crate::bounds::Aabb;
use crate::gpu::{AttributeDescriptor, Buffer, VertexArray};
use glam::{Vec2, Vec3, Vec4};

/// Per-mesh shadow-casting behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowCastMode {
    Enabled,
    ShadowOnly,
    Disabled,
}

/// Which winding rasterizes into a shadow map for this mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowFaceMode {
    Auto,
    Front,
    Back,
    Both,
}

/// CPU-side vertex, matching the fixed attribute set §3 names.
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub position: Vec3,
    pub texcoord: Vec2,
    pub normal: Vec3,
    pub tangent: Vec4,
    pub color: Vec4,
    pub bone_ids: [i32; 4],
    pub bone_weights: Vec4,
}

/// An immutable GPU vertex buffer with an optional index buffer. Owns both
/// `Buffer`s directly (§9's move-only RAII ownership note) rather than
/// indirecting through a separate resource table.
pub struct Mesh {
    pub vertex_buffer: Buffer,
    pub index_buffer: Option<Buffer>,
    pub index_count: u32,
    pub vertex_array: VertexArray,
    pub bounds: Aabb,
    pub shadow_cast: ShadowCastMode,
    pub shadow_face: ShadowFaceMode,
    pub layer_mask: u16,
}

impl Mesh {
    /// Invariant: `vertices` non-empty; `indices`, if present, has a
    /// length divisible by 3.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        vertices: &[Vertex],
        indices: Option<&[u32]>,
    ) -> Self {
        assert!(!vertices.is_empty(), "mesh vertex buffer must be non-empty");
        if let Some(indices) = indices {
            assert!(
                indices.len() % 3 == 0,
                "mesh index buffer length must be divisible by 3"
            );
        }

        let _ = queue;
        let vertex_buffer = Buffer::new_init(
            device,
            bytemuck::cast_slice(vertices),
            wgpu::BufferUsages::VERTEX,
            "mesh.vertices",
        );

        let (index_buffer, index_count) = match indices {
            Some(indices) => {
                let buffer = Buffer::new_init(device, bytemuck::cast_slice(indices), wgpu::BufferUsages::INDEX, "mesh.indices");
                (Some(buffer), indices.len() as u32)
            }
            None => (None, 0),
        };

        let bounds = Aabb::from_points(vertices.iter().map(|v| v.position));

        let mut vertex_array = VertexArray::new();
        let slot = vertex_array.add_slot();
        for (location, components, offset, is_int) in standard_attribute_layout() {
            let format = match (components, is_int) {
                (2, false) => wgpu::VertexFormat::Float32x2,
                (3, false) => wgpu::VertexFormat::Float32x3,
                (4, true) => wgpu::VertexFormat::Sint32x4,
                _ => wgpu::VertexFormat::Float32x4,
            };
            vertex_array.add_attribute(
                slot,
                AttributeDescriptor {
                    location,
                    components,
                    format,
                    normalized: false,
                    stride: std::mem::size_of::<Vertex>() as u64,
                    offset,
                    divisor: 0,
                    default_value: [0.0, 0.0, 0.0, 1.0],
                },
            );
        }

        let vertex_buffer_id = vertex_buffer.id();
        // Slot 0 (the vertex attributes above) is bound to the buffer we
        // just allocated; `vertex_array.bind_vertex_buffer` stamps this id
        // onto the descriptor so `GpuPipeline::bind_vertex_array`'s
        // `resolve_buffer` lookup (supplied by the draw-time caller, which
        // owns this `Mesh`) finds it by identity.
        vertex_array.bind_vertex_buffer(slot, vertex_buffer_id);

        Self {
            vertex_buffer,
            index_buffer,
            index_count,
            vertex_array,
            bounds,
            shadow_cast: ShadowCastMode::Enabled,
            shadow_face: ShadowFaceMode::Auto,
            layer_mask: u16::MAX,
        }
    }

    pub fn has_indices(&self) -> bool {
        self.index_buffer.is_some()
    }
}

fn standard_attribute_layout() -> [(u32, u8, u64, bool); 7] {
    [
        (0, 3, std::mem::offset_of!(Vertex, position) as u64, false),
        (1, 2, std::mem::offset_of!(Vertex, texcoord) as u64, false),
        (2, 3, std::mem::offset_of!(Vertex, normal) as u64, false),
        (3, 4, std::mem::offset_of!(Vertex, tangent) as u64, false),
        (4, 4, std::mem::offset_of!(Vertex, color) as u64, false),
        (5, 4, std::mem::offset_of!(Vertex, bone_ids) as u64, true),
        (6, 4, std::mem::offset_of!(Vertex, bone_weights) as u64, false),
    ]
}

/// Primitive topology for immediate-mode building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
    TriangleStrip,
    Lines,
}

/// A mutable mesh built via an immediate-mode `begin`/`set*`/`addVertex*`/
/// `end` sequence. Between `begin` and `end`, draw submissions referencing
/// this mesh are undefined (the spec's own invariant — not enforced here
/// beyond documentation, since enforcing it would require tracking every
/// outstanding draw-call reference).
pub struct DynamicMesh {
    primitive: Primitive,
    building: bool,
    cursor_texcoord: Vec2,
    cursor_normal: Vec3,
    cursor_tangent: Vec4,
    cursor_color: Vec4,
    staged: Vec<Vertex>,
    pub mesh: Option<Mesh>,
}

impl DynamicMesh {
    pub fn new() -> Self {
        Self {
            primitive: Primitive::Triangles,
            building: false,
            cursor_texcoord: Vec2::ZERO,
            cursor_normal: Vec3::Z,
            cursor_tangent: Vec4::new(1.0, 0.0, 0.0, 1.0),
            cursor_color: Vec4::ONE,
            staged: Vec::new(),
            mesh: None,
        }
    }

    pub fn begin(&mut self, primitive: Primitive) {
        self.primitive = primitive;
        self.building = true;
        self.staged.clear();
    }

    pub fn set_texcoord(&mut self, uv: Vec2) {
        self.cursor_texcoord = uv;
    }

    pub fn set_normal(&mut self, n: Vec3) {
        self.cursor_normal = n;
    }

    pub fn set_tangent(&mut self, t: Vec4) {
        self.cursor_tangent = t;
    }

    pub fn set_color(&mut self, c: Vec4) {
        self.cursor_color = c;
    }

    pub fn add_vertex(&mut self, position: Vec3) {
        self.staged.push(Vertex {
            position,
            texcoord: self.cursor_texcoord,
            normal: self.cursor_normal,
            tangent: self.cursor_tangent,
            color: self.cursor_color,
            bone_ids: [0; 4],
            bone_weights: Vec4::ZERO,
        });
    }

    /// Uploads the staged CPU vertex array to GPU and recomputes the AABB.
    pub fn end(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        self.building = false;
        if self.staged.is_empty() {
            self.mesh = None;
            return;
        }
        self.mesh = Some(Mesh::new(device, queue, &self.staged, None));
    }

    pub fn is_building(&self) -> bool {
        self.building
    }

    pub fn primitive(&self) -> Primitive {
        self.primitive
    }
}

impl Default for DynamicMesh {
    fn default() -> Self {
        Self::new()
    }
}
