//! Material (§3): a value-type struct of texture references, PBR scalars,
//! and the shading/blend/cull modes draws are bucketed and drawn by.

use crate::handle::Handle;
use crate::shader::MaterialShader;
use glam::{Vec2, Vec3, Vec4};

/// Depth-test behavior a material requests from the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthTestMode {
    Disabled,
    Less,
    LessEqual,
    Always,
}

/// Shading path a material is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingMode {
    Lit,
    Unlit,
    Wireframe,
}

/// Blend mode; also the primary signal `DrawCallManager` uses to bucket a
/// draw (§4.4's category promotion rules).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Opaque,
    Alpha,
    Add,
    Multiply,
}

/// Triangle-winding culling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// How a mesh orients itself toward the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillboardMode {
    Disabled,
    FullCamera,
    YAxisOnly,
}

/// Per-material texcoord offset + scale (`uv' = uv * scale + offset`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TexCoordTransform {
    pub offset: Vec2,
    pub scale: Vec2,
}

impl Default for TexCoordTransform {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: Vec2::ONE,
        }
    }
}

/// Depth-related material flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthState {
    pub test: DepthTestMode,
    /// If set, this material is additionally drawn in the depth-only
    /// prepass bucket regardless of its blend mode (§4.4).
    pub pre_pass: bool,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test: DepthTestMode::LessEqual,
            pre_pass: false,
        }
    }
}

/// The four texture slots a `Material` carries. A `None` reference
/// resolves to the process-wide default white texture (§3 invariant);
/// resolution happens at draw time via [`Material::albedo_or_white`] etc.
/// so the material value type itself stays `Option`-based and cheap to
/// copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialTextures {
    pub albedo: Option<u64>,
    pub emission: Option<u64>,
    pub orm: Option<u64>,
    pub normal: Option<u64>,
}

/// Value-type material. Cheap to `Copy` and store once per unique draw
/// record (§3's `UniqueData`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub textures: MaterialTextures,
    pub albedo_color: Vec4,
    pub emission_color: Vec3,
    pub emission_energy: f32,
    pub occlusion: f32,
    pub roughness: f32,
    pub metalness: f32,
    pub ao_light_affect: f32,
    pub normal_scale: f32,
    pub depth: DepthState,
    pub alpha_cutoff: f32,
    pub texcoord: TexCoordTransform,
    pub billboard: BillboardMode,
    pub shading: ShadingMode,
    pub blend: BlendMode,
    pub cull: CullMode,
    pub shader: Option<Handle<MaterialShader>>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            textures: MaterialTextures::default(),
            albedo_color: Vec4::ONE,
            emission_color: Vec3::ZERO,
            emission_energy: 1.0,
            occlusion: 1.0,
            roughness: 1.0,
            metalness: 0.0,
            ao_light_affect: 0.0,
            normal_scale: 1.0,
            depth: DepthState::default(),
            alpha_cutoff: 0.5,
            texcoord: TexCoordTransform::default(),
            billboard: BillboardMode::Disabled,
            shading: ShadingMode::Lit,
            blend: BlendMode::Opaque,
            cull: CullMode::Back,
            shader: None,
        }
    }
}

impl Material {
    /// Resolves a texture slot to its id, falling back to
    /// `default_white_texture` per §3's null-texture invariant.
    pub fn resolve_texture(slot: Option<u64>, default_white_texture: u64) -> u64 {
        slot.unwrap_or(default_white_texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_texture_resolves_to_white() {
        assert_eq!(Material::resolve_texture(None, 7), 7);
        assert_eq!(Material::resolve_texture(Some(3), 7), 3);
    }

    #[test]
    fn default_material_is_opaque_lit() {
        let m = Material::default();
        assert_eq!(m.blend, BlendMode::Opaque);
        assert_eq!(m.shading, ShadingMode::Lit);
        assert!(!m.depth.pre_pass);
    }
}
