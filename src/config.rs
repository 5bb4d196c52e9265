//! Renderer configuration.
//!
//! `Render3DConfig` is the host-supplied description passed to
//! [`crate::scene3d::Scene3D::init`]. It has no file-based loading layer —
//! a host that wants persisted settings reads its own TOML/JSON and builds
//! this struct, the same way the source's `HP_AppDesc`/`HP_RenderConfig`
//! are plain structs with no serialization of their own.

use glam::Vec3;

/// Host-supplied renderer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Render3DConfig {
    /// Square resolution, in texels, of a single shadow-atlas slot.
    pub shadow_map_resolution: u32,
    /// Number of slots the shadow atlas reserves up front.
    pub shadow_atlas_capacity: u32,
    /// Upper bound on bloom mip-chain length.
    pub bloom_max_mip_levels: u32,
    /// MSAA sample count for the main color target (1 disables MSAA).
    pub msaa_samples: u32,
    /// Clear color used when no environment background is set.
    pub clear_color: Vec3,
}

impl Default for Render3DConfig {
    fn default() -> Self {
        Self {
            shadow_map_resolution: 2048,
            shadow_atlas_capacity: 16,
            bloom_max_mip_levels: 6,
            msaa_samples: 1,
            clear_color: Vec3::new(0.0, 0.0, 0.0),
        }
    }
}
