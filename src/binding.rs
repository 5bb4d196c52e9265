//! Fixed binding-point table shared by every shader variant (§6). Unlike
//! GL's per-program uniform-location lookup, `wgpu` bind groups are
//! addressed by a fixed numeric slot the pipeline layout and the shader's
//! `@binding` attributes must agree on; these constants are that shared
//! contract.

/// SSBO: shared per-draw records (`SharedDrawGpu`).
pub const SHARED_DRAW_BINDING: u32 = 0;
/// SSBO: unique per-draw records (`UniqueDrawGpu`).
pub const UNIQUE_DRAW_BINDING: u32 = 1;
/// SSBO: posed bone matrices, indexed by `SharedDrawGpu::bone_offset`.
pub const BONE_MATRIX_BINDING: u32 = 2;
/// SSBO: dense active-light records (`LightGpu`).
pub const LIGHT_ARRAY_BINDING: u32 = 3;
/// SSBO: dense active-shadow records (`ShadowGpu`).
pub const SHADOW_ARRAY_BINDING: u32 = 4;

/// UBO: per-frame [`crate::camera::CameraGpu`].
pub const CAMERA_BINDING: u32 = 5;

/// UBO: per-frame [`crate::environment::EnvironmentGpu`].
pub const ENVIRONMENT_BINDING: u32 = 13;

/// Sampler shared by every built-in and user texture slot. The fixed
/// binding-point table only enumerates texture bindings (GL historically
/// bound a sampler per texture unit implicitly); `wgpu` needs the sampler
/// as its own bind-group entry, so this crate reserves one slot in the
/// unused `6..=12` gap between the draw SSBOs/camera and the environment UBO.
pub const DEFAULT_SAMPLER_BINDING: u32 = 12;

pub use crate::shader::{DYNAMIC_UNIFORM_BINDING, STATIC_UNIFORM_BINDING};
pub use crate::shader::TEXTURE_SAMPLER_BINDINGS;

/// First built-in texture binding (albedo, ORM, normal, sky, irradiance,
/// prefiltered specular, BRDF LUT, shadow atlas, ...); built-ins occupy
/// `16..=27`, leaving `28..=31` to the four user `Texture0..3` slots
/// exposed via [`TEXTURE_SAMPLER_BINDINGS`].
pub const BUILTIN_TEXTURE_BINDING_BASE: u32 = 16;
pub const BUILTIN_TEXTURE_BINDING_COUNT: u32 = 12;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_and_user_texture_ranges_do_not_overlap() {
        let builtin_end = BUILTIN_TEXTURE_BINDING_BASE + BUILTIN_TEXTURE_BINDING_COUNT;
        assert!(TEXTURE_SAMPLER_BINDINGS.iter().all(|&b| b >= builtin_end));
    }
}
