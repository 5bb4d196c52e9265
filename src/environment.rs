//! Per-frame environment snapshot and its packed GPU uniform block (§4.6).

use bytemuck::{Pod, Zeroable};
use bitflags::bitflags;
use glam::{Quat, Vec3, Vec4};

bitflags! {
    /// Gates which draw-call buckets get sorted and which culling passes
    /// run; carried on the environment snapshot rather than as global
    /// renderer state so it can change frame-to-frame with the scene.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EnvironmentFlags: u32 {
        const SORT_OPAQUE = 1 << 0;
        const SORT_TRANSPARENT = 1 << 1;
        const VIEW_FRUSTUM_CULLING = 1 << 2;
        const SHADOW_FRUSTUM_CULLING = 1 << 3;
    }
}

impl Default for EnvironmentFlags {
    fn default() -> Self {
        Self::SORT_OPAQUE | Self::SORT_TRANSPARENT | Self::VIEW_FRUSTUM_CULLING | Self::SHADOW_FRUSTUM_CULLING
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FogMode {
    Disabled,
    Linear,
    Exponential,
    ExponentialSquared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomMode {
    Disabled,
    Additive,
    Mix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TonemapMode {
    Linear,
    Reinhard,
    Aces,
    Agx,
}

#[derive(Debug, Clone, Copy)]
pub struct Sky {
    pub cubemap: Option<u64>,
    pub probe: Option<u64>,
    pub rotation: Quat,
    pub intensity: f32,
    pub specular: f32,
    pub diffuse: f32,
}

impl Default for Sky {
    fn default() -> Self {
        Self {
            cubemap: None,
            probe: None,
            rotation: Quat::IDENTITY,
            intensity: 1.0,
            specular: 1.0,
            diffuse: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Fog {
    pub mode: FogMode,
    pub density: f32,
    pub start: f32,
    pub end: f32,
    pub color: Vec3,
    pub sky_affect: f32,
}

impl Default for Fog {
    fn default() -> Self {
        Self {
            mode: FogMode::Disabled,
            density: 0.0,
            start: 0.0,
            end: 100.0,
            color: Vec3::ONE,
            sky_affect: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Ssao {
    pub enabled: bool,
    pub intensity: f32,
    pub radius: f32,
    pub power: f32,
    pub bias: f32,
}

impl Default for Ssao {
    fn default() -> Self {
        Self {
            enabled: false,
            intensity: 1.0,
            radius: 0.5,
            power: 1.0,
            bias: 0.025,
        }
    }
}

/// User-authored bloom parameters, including the fixed-cardinality
/// per-level weight array the original format exposes (see
/// `Bloom::levels` doc comment for the resampling this feeds).
#[derive(Debug, Clone, Copy)]
pub struct Bloom {
    pub mode: BloomMode,
    pub threshold: f32,
    pub soft_threshold: f32,
    pub filter_radius: f32,
    pub strength: f32,
    /// Authored weight per bloom level, at a fixed cardinality independent
    /// of the runtime mip chain depth; resampled by
    /// [`Environment::update`] to whatever `bloom_mip_count` the render
    /// target actually produces.
    pub levels: [f32; 8],
}

impl Default for Bloom {
    fn default() -> Self {
        Self {
            mode: BloomMode::Disabled,
            threshold: 1.0,
            soft_threshold: 0.5,
            filter_radius: 0.005,
            strength: 0.1,
            levels: [1.0; 8],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColorAdjustment {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl Default for ColorAdjustment {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Tonemap {
    pub mode: TonemapMode,
    pub exposure: f32,
    pub white: f32,
}

impl Default for Tonemap {
    fn default() -> Self {
        Self {
            mode: TonemapMode::Aces,
            exposure: 1.0,
            white: 1.0,
        }
    }
}

/// Per-frame environment snapshot taken at `begin_3d` (§4.6). Mirrors the
/// host-authored `NX_Environment` value, plus the scene-bounds AABB used
/// to fit directional shadow frusta.
#[derive(Debug, Clone, Copy)]
pub struct Environment {
    pub scene_bounds: crate::bounds::Aabb,
    pub background: Vec3,
    pub ambient: Vec3,
    pub sky: Sky,
    pub fog: Fog,
    pub ssao: Ssao,
    pub bloom: Bloom,
    pub adjustment: ColorAdjustment,
    pub tonemap: Tonemap,
    pub flags: EnvironmentFlags,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            scene_bounds: crate::bounds::Aabb::EMPTY,
            background: Vec3::ZERO,
            ambient: Vec3::ZERO,
            sky: Sky::default(),
            fog: Fog::default(),
            ssao: Ssao::default(),
            bloom: Bloom::default(),
            adjustment: ColorAdjustment::default(),
            tonemap: Tonemap::default(),
            flags: EnvironmentFlags::default(),
        }
    }
}

impl Environment {
    pub fn sort_opaque(&self) -> bool {
        self.flags.contains(EnvironmentFlags::SORT_OPAQUE)
    }

    pub fn sort_transparent(&self) -> bool {
        self.flags.contains(EnvironmentFlags::SORT_TRANSPARENT)
    }

    pub fn view_frustum_culling(&self) -> bool {
        self.flags.contains(EnvironmentFlags::VIEW_FRUSTUM_CULLING)
    }

    pub fn shadow_frustum_culling(&self) -> bool {
        self.flags.contains(EnvironmentFlags::SHADOW_FRUSTUM_CULLING)
    }

    /// Fog-premultiplied background: when fog is active, blends the
    /// background toward the fog color by `skyAffect` so sky pixels read
    /// correctly without a second fog pass on the clear color.
    pub fn background_premultiplied(&self) -> Vec3 {
        if self.fog.mode == FogMode::Disabled {
            self.background
        } else {
            self.background.lerp(self.fog.color, self.fog.sky_affect)
        }
    }

    /// Resamples the 8 user-authored bloom weights to `bloom_mip_count`
    /// entries via piecewise-linear interpolation — the runtime bloom
    /// chain's actual mip depth rarely matches the authored cardinality.
    pub fn resampled_bloom_levels(&self, bloom_mip_count: u32) -> Vec<f32> {
        if self.bloom.mode == BloomMode::Disabled || bloom_mip_count == 0 {
            return Vec::new();
        }
        if bloom_mip_count == 1 {
            return vec![self.bloom.levels[0]];
        }
        let source_len = self.bloom.levels.len();
        (0..bloom_mip_count)
            .map(|i| {
                let t = i as f32 / (bloom_mip_count - 1) as f32;
                let mapped = t * (source_len - 1) as f32;
                let idx0 = mapped as usize;
                let idx1 = (idx0 + 1).min(source_len - 1);
                let frac = mapped - idx0 as f32;
                self.bloom.levels[idx0] * (1.0 - frac) + self.bloom.levels[idx1] * frac
            })
            .collect()
    }

    /// Karis-style soft-knee bloom prefilter: `(threshold, threshold -
    /// knee, 2*knee, 0.25/knee)`, matching the standard bloom-threshold
    /// formula the original's missing `getBloomPrefilter` body almost
    /// certainly implements (its declaration and call site are present in
    /// the retrieval pack; its body is not, so this follows the widely
    /// used Unity/Karis soft-threshold derivation rather than a literal
    /// port).
    pub fn bloom_prefilter(&self) -> Vec4 {
        let threshold = self.bloom.threshold;
        let knee = (threshold * self.bloom.soft_threshold).max(1e-5);
        Vec4::new(threshold, threshold - knee, 2.0 * knee, 0.25 / knee)
    }

    pub fn gpu_data(&self, bloom_mip_count: u32) -> EnvironmentGpu {
        EnvironmentGpu::from_environment(self, bloom_mip_count)
    }
}

/// §6's `environment` UBO (binding 13): std140-compatible, 16-byte
/// aligned, matching `Environment::GPUData` field-for-field.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct EnvironmentGpu {
    pub ambient_color: [f32; 3],
    pub _pad0: f32,
    pub sky_rotation: [f32; 4],
    pub fog_color: [f32; 3],
    pub _pad1: f32,
    pub bloom_prefilter: [f32; 4],
    pub sky_intensity: f32,
    pub sky_specular: f32,
    pub sky_diffuse: f32,
    pub fog_density: f32,
    pub fog_start: f32,
    pub fog_end: f32,
    pub fog_sky_affect: f32,
    pub fog_mode: i32,
    pub ssao_intensity: f32,
    pub ssao_radius: f32,
    pub ssao_power: f32,
    pub ssao_bias: f32,
    pub ssao_enabled: i32,
    pub bloom_filter_radius: f32,
    pub bloom_strength: f32,
    pub bloom_mode: i32,
    pub adjust_brightness: f32,
    pub adjust_contrast: f32,
    pub adjust_saturation: f32,
    pub tonemap_exposure: f32,
    pub tonemap_white: f32,
    pub tonemap_mode: i32,
    pub _pad2: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<EnvironmentGpu>() % 16 == 0);

impl EnvironmentGpu {
    pub fn from_environment(env: &Environment, bloom_mip_count: u32) -> Self {
        // Per-mip bloom weights are consumed directly by the bloom pass via
        // `Environment::resampled_bloom_levels`, not carried in this block.
        let _ = bloom_mip_count;
        Self {
            ambient_color: env.ambient.into(),
            _pad0: 0.0,
            sky_rotation: env.sky.rotation.into(),
            fog_color: env.fog.color.into(),
            _pad1: 0.0,
            bloom_prefilter: env.bloom_prefilter().into(),
            sky_intensity: env.sky.intensity,
            sky_specular: env.sky.specular * env.sky.intensity,
            sky_diffuse: env.sky.diffuse * env.sky.intensity,
            fog_density: env.fog.density,
            fog_start: env.fog.start,
            fog_end: env.fog.end,
            fog_sky_affect: if env.fog.mode == FogMode::Disabled { 0.0 } else { env.fog.sky_affect },
            fog_mode: env.fog.mode as i32,
            ssao_intensity: env.ssao.intensity,
            ssao_radius: env.ssao.radius,
            ssao_power: env.ssao.power,
            ssao_bias: env.ssao.bias,
            ssao_enabled: i32::from(env.ssao.enabled),
            bloom_filter_radius: env.bloom.filter_radius,
            bloom_strength: env.bloom.strength,
            bloom_mode: env.bloom.mode as i32,
            adjust_brightness: env.adjustment.brightness,
            adjust_contrast: env.adjustment.contrast,
            adjust_saturation: env.adjustment.saturation,
            tonemap_exposure: env.tonemap.exposure,
            tonemap_white: env.tonemap.white,
            tonemap_mode: env.tonemap.mode as i32,
            _pad2: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_record_size_is_16_byte_multiple() {
        assert_eq!(std::mem::size_of::<EnvironmentGpu>() % 16, 0);
    }

    #[test]
    fn background_unaffected_when_fog_disabled() {
        let env = Environment {
            background: Vec3::new(0.1, 0.2, 0.3),
            ..Environment::default()
        };
        assert_eq!(env.background_premultiplied(), env.background);
    }

    #[test]
    fn background_blends_toward_fog_color_when_enabled() {
        let mut env = Environment {
            background: Vec3::ZERO,
            ..Environment::default()
        };
        env.fog.mode = FogMode::Linear;
        env.fog.color = Vec3::ONE;
        env.fog.sky_affect = 0.5;
        assert_eq!(env.background_premultiplied(), Vec3::splat(0.5));
    }

    #[test]
    fn bloom_resample_matches_single_mip_shortcut() {
        let mut env = Environment::default();
        env.bloom.mode = BloomMode::Additive;
        env.bloom.levels = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let resampled = env.resampled_bloom_levels(4);
        assert_eq!(resampled.len(), 4);
        assert_eq!(resampled[0], 0.0);
        assert_eq!(resampled[3], 7.0);
    }

    #[test]
    fn bloom_resample_empty_when_disabled() {
        let env = Environment::default();
        assert!(env.resampled_bloom_levels(6).is_empty());
    }
}
