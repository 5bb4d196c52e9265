//! The stateful GPU pipeline wrapper (§4.1): every draw call goes through
//! here so two consecutive draws requesting the same bind state never
//! reissue a redundant bind.
//!
//! `wgpu` bakes blend mode, depth-test mode, cull mode, and color/depth
//! write masks into the `RenderPipeline` object itself rather than exposing
//! them as dynamic GL-style state; `Program` selection (`use_program`)
//! therefore already encodes those, and `set_blend`/`set_depth_test`/
//! `set_cull_mode`/`set_color_mask`/`set_depth_mask` below only update the
//! *requested* state used to pick the next `Program` — they do not bind
//! anything themselves. Viewport, scissor, vertex buffers, and bind groups
//! remain genuinely dynamic and are cached here.

use super::{Buffer, Program, VertexArray};
use std::ops::Range;

/// Cull-mode request, baked into the next `Program` lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Blend-mode request, baked into the next `Program` lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Opaque,
    Alpha,
    Add,
    Multiply,
}

/// Depth-test request, baked into the next `Program` lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthTest {
    Disabled,
    Less,
    LessEqual,
    Always,
}

/// Dirty-tracked GPU state cache, driving one `wgpu::RenderPass` for the
/// duration of a pass.
pub struct GpuPipeline<'pass> {
    pass: wgpu::RenderPass<'pass>,
    bound_program: Option<u64>,
    bound_vertex_array: Option<u64>,
    bound_textures: [Option<u64>; 32],
    bound_uniform_buffers: [Option<(u64, Range<u64>)>; 16],
    bound_storage_buffers: [Option<(u64, Range<u64>)>; 8],
    dummy_vertex_buffer: u64,
    cull_mode: CullMode,
    blend_mode: BlendMode,
    depth_test: DepthTest,
    color_mask: bool,
    depth_mask: bool,
}

impl<'pass> GpuPipeline<'pass> {
    pub fn new(pass: wgpu::RenderPass<'pass>, dummy_vertex_buffer: u64) -> Self {
        Self {
            pass,
            bound_program: None,
            bound_vertex_array: None,
            bound_textures: [None; 32],
            bound_uniform_buffers: std::array::from_fn(|_| None),
            bound_storage_buffers: std::array::from_fn(|_| None),
            dummy_vertex_buffer,
            cull_mode: CullMode::Back,
            blend_mode: BlendMode::Opaque,
            depth_test: DepthTest::Less,
            color_mask: true,
            depth_mask: true,
        }
    }

    /// Binds `program` and issues the underlying `set_pipeline` only if it
    /// differs from the last-bound program (elided redundant bind).
    pub fn use_program(&mut self, program: &Program) {
        if self.bound_program != Some(program.id()) {
            self.pass.set_pipeline(program.pipeline());
            self.bound_program = Some(program.id());
        }
    }

    /// Binds a vertex array's slots. Any slot left unbound (buffer is
    /// `None`) falls back to the process-wide dummy vertex buffer so the
    /// draw always has a valid vertex stage, per §4.1's dummy-VAO
    /// requirement; the shader still reads each attribute's
    /// `default_value` because the dummy buffer is zero-filled and the
    /// per-attribute default is applied as a push-constant-style override
    /// by the caller before the draw (see `mesh.rs`/`instance_buffer.rs`).
    pub fn bind_vertex_array(
        &mut self,
        vertex_array: &VertexArray,
        resolve_buffer: impl Fn(u64) -> Option<&'pass wgpu::Buffer>,
    ) {
        if self.bound_vertex_array == Some(vertex_array.id()) {
            return;
        }
        for (slot_index, slot) in vertex_array.slots().iter().enumerate() {
            if let Some(buffer_id) = slot.buffer_id {
                if let Some(buf) = resolve_buffer(buffer_id) {
                    self.pass.set_vertex_buffer(slot_index as u32, buf.slice(..));
                    continue;
                }
            }
            if let Some(dummy) = resolve_buffer(self.dummy_vertex_buffer) {
                self.pass.set_vertex_buffer(slot_index as u32, dummy.slice(..));
            }
        }
        self.bound_vertex_array = Some(vertex_array.id());
    }

    pub fn bind_texture(&mut self, unit: u32, texture_id: u64) -> bool {
        let slot = &mut self.bound_textures[unit as usize];
        if *slot == Some(texture_id) {
            return false;
        }
        *slot = Some(texture_id);
        true
    }

    pub fn bind_uniform(&mut self, binding: u32, buffer: &Buffer, range: Range<u64>) -> bool {
        let slot = &mut self.bound_uniform_buffers[binding as usize];
        let key = (buffer.id(), range.clone());
        if *slot == Some(key.clone()) {
            return false;
        }
        *slot = Some(key);
        true
    }

    pub fn bind_storage(&mut self, binding: u32, buffer: &Buffer, range: Range<u64>) -> bool {
        let slot = &mut self.bound_storage_buffers[binding as usize];
        let key = (buffer.id(), range.clone());
        if *slot == Some(key.clone()) {
            return false;
        }
        *slot = Some(key);
        true
    }

    pub fn set_viewport(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.pass.set_viewport(x, y, w, h, 0.0, 1.0);
    }

    pub fn set_scissor(&mut self, x: u32, y: u32, w: u32, h: u32) {
        self.pass.set_scissor_rect(x, y, w, h);
    }

    pub fn set_cull_mode(&mut self, mode: CullMode) {
        self.cull_mode = mode;
    }

    pub fn set_blend(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    pub fn set_depth_test(&mut self, mode: DepthTest) {
        self.depth_test = mode;
    }

    pub fn set_color_mask(&mut self, enabled: bool) {
        self.color_mask = enabled;
    }

    pub fn set_depth_mask(&mut self, enabled: bool) {
        self.depth_mask = enabled;
    }

    pub fn requested_cull_mode(&self) -> CullMode {
        self.cull_mode
    }

    /// Issues the actual `wgpu::RenderPass::set_bind_group` call. Building
    /// the `wgpu::BindGroup` itself (which fixed-binding-table entries go
    /// into it) is the caller's job — `bind_texture`/`bind_uniform`/
    /// `bind_storage` above only tell the caller whether a slot actually
    /// changed since the last draw, so a bind group gets rebuilt no more
    /// often than necessary.
    pub fn set_bind_group(&mut self, index: u32, bind_group: &'pass wgpu::BindGroup) {
        self.pass.set_bind_group(index, bind_group, &[]);
    }

    pub fn draw(&mut self, vertices: Range<u32>) {
        self.pass.draw(vertices, 0..1);
    }

    pub fn draw_instanced(&mut self, vertices: Range<u32>, instances: Range<u32>) {
        self.pass.draw(vertices, instances);
    }

    pub fn draw_elements(&mut self, indices: Range<u32>) {
        self.pass.draw_indexed(indices, 0, 0..1);
    }

    pub fn draw_elements_instanced(&mut self, indices: Range<u32>, instances: Range<u32>) {
        self.pass.draw_indexed(indices, 0, instances);
    }
}
