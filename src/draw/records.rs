//! Frame-transient draw records (§3's `SharedData`/`UniqueData`) and their
//! GPU-facing packed counterparts (§6's `SharedDraw`/`UniqueDraw` layout).

use crate::bounds::{Aabb, Obb, Sphere};
use crate::handle::Handle;
use crate::material::Material;
use crate::mesh::Mesh;
use bytemuck::{Pod, Zeroable};
use glam::{Affine3A, Mat4};

/// The two handles a unique record's mesh reference can resolve to.
/// Dynamic meshes are referenced by the CPU-staged buffer they were last
/// `end()`-ed into rather than a long-lived arena handle.
#[derive(Debug, Clone, Copy)]
pub enum MeshVariant {
    Static(Handle<Mesh>),
    Dynamic(u64),
}

/// Which bucket a unique record belongs to; also the `BucketArray`
/// category index (§4.4's promotion rules).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCategory {
    Opaque = 0,
    Prepass = 1,
    Transparent = 2,
}

pub const DRAW_CATEGORY_COUNT: usize = 3;

impl DrawCategory {
    /// §4.4 bucket promotion: prepass flag wins regardless of blend mode,
    /// then opaque-vs-everything-else by blend mode.
    pub fn classify(material: &Material) -> Self {
        use crate::material::BlendMode;
        if material.depth.pre_pass {
            DrawCategory::Prepass
        } else if material.blend == BlendMode::Opaque {
            DrawCategory::Opaque
        } else {
            DrawCategory::Transparent
        }
    }
}

/// One submitted draw call's shared (per-submit) data.
pub struct SharedData {
    pub transform: Affine3A,
    pub bounding_sphere: Sphere,
    pub instances: Option<u64>,
    pub instance_count: u32,
    pub bone_offset: Option<u32>,
    pub unique_start: u32,
    pub unique_count: u32,
}

/// One unique (per-mesh-within-submit) draw record.
pub struct UniqueData {
    pub mesh: MeshVariant,
    pub material: Material,
    pub obb: Obb,
    pub texture_slots_exist: [bool; 4],
    pub dynamic_range_index: Option<u32>,
    pub shared_index: u32,
    pub category: DrawCategory,
}

impl UniqueData {
    pub fn world_aabb(&self) -> Aabb {
        self.obb.bounding_aabb()
    }
}

/// §6 `SharedDraw`: std430-compatible, 16-byte aligned.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct SharedDrawGpu {
    pub mat_model: [[f32; 4]; 4],
    pub mat_normal: [[f32; 4]; 4],
    pub bone_offset: i32,
    pub instancing: i32,
    pub skinning: i32,
    pub _pad: i32,
}

const _: () = assert!(std::mem::size_of::<SharedDrawGpu>() % 16 == 0);

impl SharedDrawGpu {
    pub fn from_shared(shared: &SharedData) -> Self {
        let model = Mat4::from(shared.transform);
        let normal = Mat4::from(shared.transform.matrix3.inverse().transpose());
        Self {
            mat_model: model.to_cols_array_2d(),
            mat_normal: normal.to_cols_array_2d(),
            bone_offset: shared.bone_offset.map_or(-1, |o| o as i32),
            instancing: i32::from(shared.instance_count > 0),
            skinning: i32::from(shared.bone_offset.is_some()),
            _pad: 0,
        }
    }
}

/// §6 `UniqueDraw`: std430-compatible, 16-byte aligned.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct UniqueDrawGpu {
    pub albedo: [f32; 4],
    pub emission: [f32; 3],
    pub emission_energy: f32,
    pub ao_light_affect: f32,
    pub occlusion: f32,
    pub roughness: f32,
    pub metalness: f32,
    pub normal_scale: f32,
    pub alpha_cutoff: f32,
    pub depth_offset: f32,
    pub depth_scale: f32,
    pub tex_offset: [f32; 2],
    pub tex_scale: [f32; 2],
    pub billboard: i32,
    pub layer_mask: u32,
    /// Index into the shared-draw array this unique record's transform
    /// lives at; lets the built-in shader resolve both records from a
    /// single `@builtin(instance_index)` (§6's draw-binding convention).
    pub shared_index: u32,
    pub _pad: u32,
}

const _: () = assert!(std::mem::size_of::<UniqueDrawGpu>() % 16 == 0);

impl UniqueDrawGpu {
    pub fn from_unique(unique: &UniqueData, layer_mask: u32) -> Self {
        let m = &unique.material;
        Self {
            albedo: m.albedo_color.into(),
            emission: m.emission_color.into(),
            emission_energy: m.emission_energy,
            ao_light_affect: m.ao_light_affect,
            occlusion: m.occlusion,
            roughness: m.roughness,
            metalness: m.metalness,
            normal_scale: m.normal_scale,
            alpha_cutoff: m.alpha_cutoff,
            depth_offset: 0.0,
            depth_scale: 1.0,
            tex_offset: m.texcoord.offset.into(),
            tex_scale: m.texcoord.scale.into(),
            billboard: m.billboard as i32,
            layer_mask,
            shared_index: unique.shared_index,
            _pad: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;

    #[test]
    fn gpu_record_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<SharedDrawGpu>() % 16, 0);
        assert_eq!(std::mem::size_of::<UniqueDrawGpu>() % 16, 0);
    }

    #[test]
    fn prepass_flag_wins_over_blend_mode() {
        let mut material = Material::default();
        material.blend = crate::material::BlendMode::Alpha;
        material.depth.pre_pass = true;
        assert_eq!(DrawCategory::classify(&material), DrawCategory::Prepass);
    }

    #[test]
    fn opaque_blend_without_prepass_is_opaque_bucket() {
        let material = Material::default();
        assert_eq!(DrawCategory::classify(&material), DrawCategory::Opaque);
    }
}
