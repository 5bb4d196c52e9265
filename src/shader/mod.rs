//! Shader-variant system (§4.8): a fixed set of `vertex()`/`fragment()`
//! override points across five render passes, shared static/dynamic
//! uniform buffers, and texture-slot introspection.

mod builtin;
mod uniform_buffer;
mod variant;

pub use builtin::BuiltinPipelines;
pub use uniform_buffer::{DynamicRange, DynamicUniformBuffer, StaticUniformBuffer, DYNAMIC_UNIFORM_BINDING, STATIC_UNIFORM_BINDING};
pub use variant::{splice_user_code, SceneVariant, FRAGMENT_MARKER, SCENE_VARIANT_COUNT, VERTEX_MARKER};

use crate::gpu::Program;

/// Fixed texture unit bindings, highest slot first (§6): `Texture0` binds
/// to unit 31, `Texture1` to 30, and so on down to `Texture3` at 28.
pub const TEXTURE_SAMPLER_BINDINGS: [u32; 4] = [31, 30, 29, 28];
pub const TEXTURE_SAMPLER_NAMES: [&str; 4] = ["Texture0", "Texture1", "Texture2", "Texture3"];

/// A user-overridable shader covering all five scene render passes,
/// sharing one static and one dynamic uniform buffer and up to four
/// texture slots across every variant it compiles. Compiling a custom
/// `MaterialShader` splices the host's vertex/fragment code into each
/// variant's built-in template at the `vertex()`/`fragment()` marker
/// before the host hands the spliced source to [`MaterialShader::set_program`].
pub struct MaterialShader {
    programs: [Option<Program>; SCENE_VARIANT_COUNT],
    texture_slots_exist: [bool; 4],
    static_buffer: StaticUniformBuffer,
    dynamic_buffer: DynamicUniformBuffer,
}

impl MaterialShader {
    pub fn new(offset_alignment: u64, max_uniform_buffer_size: u64) -> Self {
        Self {
            programs: [None, None, None, None, None],
            texture_slots_exist: [false; 4],
            static_buffer: StaticUniformBuffer::new(),
            dynamic_buffer: DynamicUniformBuffer::new(offset_alignment, max_uniform_buffer_size),
        }
    }

    pub fn program(&self, variant: SceneVariant) -> Option<&Program> {
        self.programs[variant.index()].as_ref()
    }

    /// Installs the compiled program for one variant. Compiling the
    /// `wgpu::RenderPipeline` itself is the host's job (it alone knows the
    /// target formats and vertex-buffer layout); this crate only owns the
    /// result and the uniform/texture plumbing around it.
    pub fn set_program(&mut self, variant: SceneVariant, program: Program) {
        self.programs[variant.index()] = Some(program);
    }

    /// Splices `vertex_code`/`fragment_code` into the built-in `template`
    /// at the stage's override marker. `None` leaves the corresponding
    /// stage untouched (the material falls back to the default
    /// implementation for that half of the pipeline).
    pub fn splice(template_vertex: &str, template_fragment: &str, vertex_code: Option<&str>, fragment_code: Option<&str>) -> (String, String) {
        (
            splice_user_code(template_vertex, VERTEX_MARKER, vertex_code),
            splice_user_code(template_fragment, FRAGMENT_MARKER, fragment_code),
        )
    }

    /// Marks which of the four fixed texture slots this shader actually
    /// declares, based on a plain substring search for each sampler's
    /// name in the (already spliced) fragment source — the wgpu analogue
    /// of the original's `getUniformLocation` introspection, since naga
    /// reflection isn't needed for a yes/no existence check.
    pub fn detect_texture_slots(&mut self, fragment_source: &str) {
        for (slot, name) in TEXTURE_SAMPLER_NAMES.iter().enumerate() {
            if fragment_source.contains(name) {
                self.texture_slots_exist[slot] = true;
            }
        }
    }

    pub fn texture_slot_exists(&self, slot: usize) -> bool {
        self.texture_slots_exist[slot]
    }

    pub fn allocate_static_buffer(&mut self, device: &wgpu::Device, size: u64) {
        self.static_buffer.allocate(device, size);
    }

    pub fn allocate_dynamic_buffer(&mut self, device: &wgpu::Device, element_size: u64) {
        self.dynamic_buffer.allocate(device, element_size);
    }

    pub fn update_static_buffer(&mut self, queue: &wgpu::Queue, offset: u64, data: &[u8]) {
        self.static_buffer.update(queue, offset, data);
    }

    pub fn push_dynamic_buffer(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        data: &[u8],
    ) -> Option<usize> {
        self.dynamic_buffer.push(device, encoder, queue, data)
    }

    pub fn dynamic_range(&self, index: usize) -> Option<DynamicRange> {
        self.dynamic_buffer.range(index)
    }

    /// Resets the dynamic buffer's range bookkeeping; called once per
    /// frame after the last draw referencing this shader has issued.
    pub fn clear_dynamic_buffer(&mut self) {
        self.dynamic_buffer.clear();
    }

    pub fn static_buffer(&self) -> &StaticUniformBuffer {
        &self.static_buffer
    }

    pub fn dynamic_buffer(&self) -> &DynamicUniformBuffer {
        &self.dynamic_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_only_referenced_texture_slots() {
        let mut shader = MaterialShader::new(256, 1 << 16);
        shader.detect_texture_slots("fn fs() { return textureSample(Texture0, sampler0, uv); }");
        assert!(shader.texture_slot_exists(0));
        assert!(!shader.texture_slot_exists(1));
    }

    #[test]
    fn splice_touches_only_the_matching_stage() {
        let (vs, fs) = MaterialShader::splice(
            "#define vertex()",
            "#define fragment()",
            Some("// vertex override"),
            None,
        );
        assert_eq!(vs, "// vertex override");
        assert_eq!(fs, "#define fragment()");
    }
}
