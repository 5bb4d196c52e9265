//! GPU-facing light/shadow records (§6's `Light`/`Shadow` layout table),
//! std430-compatible with explicit padding, 16-byte aligned.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// One dense GPU light record, written by `LightManager::upload`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightGpu {
    pub position: [f32; 3],
    pub _pad0: f32,
    pub direction: [f32; 3],
    pub _pad1: f32,
    pub color: [f32; 3],
    pub energy: f32,
    pub specular: f32,
    pub range: f32,
    pub attenuation: f32,
    pub inner_cutoff: f32,
    pub outer_cutoff: f32,
    pub layer_mask: u32,
    pub cull_mask: u32,
    pub shadow_index: i32,
    pub kind: i32,
    pub _pad2: [f32; 3],
}

const _: () = assert!(std::mem::size_of::<LightGpu>() % 16 == 0);

impl LightGpu {
    pub fn new(
        position: Vec3,
        direction: Vec3,
        color: Vec3,
        energy: f32,
        specular: f32,
        range: f32,
        attenuation: f32,
        inner_cutoff: f32,
        outer_cutoff: f32,
        layer_mask: u32,
        cull_mask: u32,
        shadow_index: i32,
        kind: i32,
    ) -> Self {
        Self {
            position: position.into(),
            _pad0: 0.0,
            direction: direction.into(),
            _pad1: 0.0,
            color: color.into(),
            energy,
            specular,
            range,
            attenuation,
            inner_cutoff,
            outer_cutoff,
            layer_mask,
            cull_mask,
            shadow_index,
            kind,
            _pad2: [0.0; 3],
        }
    }
}

/// One dense GPU shadow record. `view_proj` is unused (identity) for omni
/// lights, whose six face matrices live in a separate per-face buffer
/// indexed by `map_index * 6 + face`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ShadowGpu {
    pub view_proj: [[f32; 4]; 4],
    pub bleeding_bias: f32,
    pub softness: f32,
    pub lambda: f32,
    pub map_index: u32,
}

const _: () = assert!(std::mem::size_of::<ShadowGpu>() % 16 == 0);

impl ShadowGpu {
    pub fn new(view_proj: Mat4, bleeding_bias: f32, softness: f32, lambda: f32, map_index: u32) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            bleeding_bias,
            softness,
            lambda,
            map_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<LightGpu>() % 16, 0);
        assert_eq!(std::mem::size_of::<ShadowGpu>() % 16, 0);
    }
}
