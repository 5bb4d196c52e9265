//! Light and shadow management (§4.5).
//!
//! A [`Light`] is a tagged union over the three topologies plus shared
//! shadow state; [`LightManager`] owns every live light, assigns GPU
//! storage indices each frame, and drives shadow-map lifecycle and
//! view/projection derivation.

mod manager;
mod records;
mod shadow;

pub use manager::LightManager;
pub use records::{LightGpu, ShadowGpu};
pub use shadow::{ShadowAtlas, ShadowFaceMode, ShadowState, ShadowUpdateMode};

use crate::bounds::{Aabb, Frustum};
use glam::{Mat4, Vec3};
use smallvec::SmallVec;

/// Directional-light-specific fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Directional {
    pub direction: Vec3,
}

/// Spot-light-specific fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spot {
    pub position: Vec3,
    pub direction: Vec3,
    pub range: f32,
    pub attenuation: f32,
    pub inner_cutoff_cos: f32,
    pub outer_cutoff_cos: f32,
}

/// Omni (point) light specific fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Omni {
    pub position: Vec3,
    pub range: f32,
    pub attenuation: f32,
}

/// The three light topologies, each carrying its own geometric fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional(Directional),
    Spot(Spot),
    Omni(Omni),
}

impl LightKind {
    pub fn type_index(&self) -> i32 {
        match self {
            LightKind::Directional(_) => 0,
            LightKind::Spot(_) => 1,
            LightKind::Omni(_) => 2,
        }
    }

    /// Default shadow lambda (cascade/PCF blend weight), matching the
    /// original source's per-type default (60 for directional, 40 for
    /// spot/omni).
    pub fn default_shadow_lambda(&self) -> f32 {
        match self {
            LightKind::Directional(_) => 60.0,
            _ => 40.0,
        }
    }

    /// Number of shadow view-projection matrices this light needs: 1 for
    /// directional/spot, 6 for omni (one per cube face).
    pub fn shadow_face_count(&self) -> usize {
        match self {
            LightKind::Omni(_) => 6,
            _ => 1,
        }
    }
}

/// A light: shared attributes plus its topology-specific [`LightKind`] and
/// shadow state.
#[derive(Debug, Clone)]
pub struct Light {
    pub kind: LightKind,
    pub active: bool,
    /// Which cameras/passes see this light.
    pub layer_mask: u32,
    /// Which meshes this light illuminates.
    pub cull_mask: u32,
    /// Which meshes cast shadows for this light.
    pub shadow_cull_mask: u32,
    pub color: Vec3,
    pub energy: f32,
    pub specular: f32,

    pub shadow: ShadowState,
    /// View-projection matrices: 1 entry for directional/spot, 6 for omni.
    pub(crate) view_projections: SmallVec<[Mat4; 6]>,
    pub(crate) frustums: SmallVec<[Frustum; 6]>,

    /// Index into the GPU light array, assigned each frame by the manager.
    pub(crate) storage_index: u32,
    /// Index into the GPU shadow array, or `-1` if this light has no
    /// shadow.
    pub(crate) shadow_storage_index: i32,
    /// Shadow-atlas slot, assigned on first activation of shadows.
    pub(crate) shadow_map_slot: Option<u32>,
}

impl Light {
    pub fn new(kind: LightKind) -> Self {
        let lambda = kind.default_shadow_lambda();
        Self {
            kind,
            active: true,
            layer_mask: 1,
            cull_mask: u32::MAX,
            shadow_cull_mask: u32::MAX,
            color: Vec3::ONE,
            energy: 1.0,
            specular: 0.5,
            shadow: ShadowState::new(lambda),
            view_projections: SmallVec::new(),
            frustums: SmallVec::new(),
            storage_index: 0,
            shadow_storage_index: -1,
            shadow_map_slot: None,
        }
    }

    pub fn directional(direction: Vec3) -> Self {
        Self::new(LightKind::Directional(Directional {
            direction: direction.normalize_or_zero(),
        }))
    }

    pub fn spot(position: Vec3, direction: Vec3, range: f32) -> Self {
        Self::new(LightKind::Spot(Spot {
            position,
            direction: direction.normalize_or_zero(),
            range,
            attenuation: 1.0,
            inner_cutoff_cos: 0.707_1,
            outer_cutoff_cos: 1e-6,
        }))
    }

    pub fn omni(position: Vec3, range: f32) -> Self {
        Self::new(LightKind::Omni(Omni {
            position,
            range,
            attenuation: 1.0,
        }))
    }

    pub fn has_shadow(&self) -> bool {
        self.shadow.enabled
    }

    pub fn shadow_storage_index(&self) -> i32 {
        self.shadow_storage_index
    }

    pub fn view_projection(&self, face: usize) -> Option<Mat4> {
        self.view_projections.get(face).copied()
    }

    pub fn frustum(&self, face: usize) -> Option<&Frustum> {
        self.frustums.get(face)
    }

    /// Derives this light's view-projection matrix/matrices and frustum(s)
    /// from the current scene bounds (only meaningful for directional
    /// lights, whose projection depends on the scene) or from the light's
    /// own position/range (spot/omni). Called by the manager whenever the
    /// light's `vp_dirty` flag is set.
    pub fn update_view_projections(&mut self, scene_bounds: &Aabb) {
        self.view_projections.clear();
        self.frustums.clear();
        match self.kind {
            LightKind::Directional(d) => {
                let (vp, range) = directional_view_projection(d.direction, scene_bounds);
                self.view_projections.push(vp);
                self.frustums.push(Frustum::from_matrix(vp));
                self.shadow.derived_range = range;
            }
            LightKind::Spot(s) => {
                let view = Mat4::look_at_rh(s.position, s.position + s.direction, stable_up(s.direction));
                let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.05, s.range.max(0.05));
                let vp = proj * view;
                self.view_projections.push(vp);
                self.frustums.push(Frustum::from_matrix(vp));
            }
            LightKind::Omni(o) => {
                for face in 0..6 {
                    let view = cube_face_view(face, o.position);
                    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, 0.05, o.range.max(0.05));
                    let vp = proj * view;
                    self.view_projections.push(vp);
                    self.frustums.push(Frustum::from_matrix(vp));
                }
            }
        }
    }
}

/// World-up unless the direction is near-vertical (|y| > 0.99), in which
/// case world-forward — avoids a degenerate `look_at` basis. Follows the
/// original source (`HP_VEC3_FORWARD` in the near-vertical branch), not a
/// Y-up/world-up convention swap.
fn stable_up(direction: Vec3) -> Vec3 {
    if direction.y.abs() > 0.99 {
        Vec3::NEG_Z // world-forward
    } else {
        Vec3::Y
    }
}

/// Six canonical per-face view matrices for omni shadow cube faces, in
/// the order +X, -X, +Y, -Y, +Z, -Z.
fn cube_face_view(face: usize, position: Vec3) -> Mat4 {
    let (target, up) = match face {
        0 => (Vec3::X, Vec3::NEG_Y),
        1 => (Vec3::NEG_X, Vec3::NEG_Y),
        2 => (Vec3::Y, Vec3::Z),
        3 => (Vec3::NEG_Y, Vec3::NEG_Z),
        4 => (Vec3::Z, Vec3::NEG_Y),
        _ => (Vec3::NEG_Z, Vec3::NEG_Y),
    };
    Mat4::look_at_rh(position, position + target, up)
}

/// Directional shadow view-projection derivation: scene AABB → 10%-expanded
/// half-extent → light placed `2 * max_extent` behind the scene center →
/// orthographic projection fit to the scene's light-space bounding box.
/// Returns the view-projection matrix and the derived shadow range
/// (`-min_z`, stored so the light's reported `range` matches the source).
fn directional_view_projection(direction: Vec3, scene_bounds: &Aabb) -> (Mat4, f32) {
    const SCENE_MARGIN: f32 = 1.1;
    let center = scene_bounds.center();
    let half_extent = scene_bounds.half_extent() * SCENE_MARGIN;
    let max_extent = half_extent.x.max(half_extent.y).max(half_extent.z);
    let distance = 2.0 * max_extent;
    let position = center - direction * distance;

    let up = stable_up(direction);
    let view = Mat4::look_at_rh(position, center, up);

    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for corner in scene_bounds.corners() {
        let p = view.transform_point3(corner);
        min = min.min(p);
        max = max.max(p);
    }

    // Camera space has negative Z in front of the eye: maxZ is the nearest
    // plane, minZ the farthest. near = -maxZ, far = -minZ keeps near < far.
    let proj = Mat4::orthographic_rh(min.x, max.x, min.y, max.y, -max.z, -min.z);
    (proj * view, -min.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directional_shadow_maps_scene_extent_to_near_and_far() {
        let bounds = Aabb {
            min: Vec3::splat(-10.0),
            max: Vec3::splat(10.0),
        };
        let mut light = Light::directional(Vec3::new(0.0, -1.0, 0.0));
        light.shadow.enabled = true;
        light.update_view_projections(&bounds);
        let vp = light.view_projection(0).unwrap();

        let top = vp.project_point3(Vec3::new(0.0, 10.0, 0.0));
        let bottom = vp.project_point3(Vec3::new(0.0, -10.0, 0.0));
        // The light looks down (-Y): the top of the scene is nearest the
        // light (small NDC depth), the bottom is farthest (near 1).
        assert!(top.z < 0.2, "expected near-zero NDC depth, got {}", top.z);
        assert!(bottom.z > 0.8, "expected near-one NDC depth, got {}", bottom.z);
    }

    #[test]
    fn near_vertical_direction_uses_world_forward_up() {
        assert_eq!(stable_up(Vec3::new(0.0, -1.0, 0.0)), Vec3::NEG_Z);
        assert_eq!(stable_up(Vec3::new(1.0, 0.0, 0.0)), Vec3::Y);
    }

    #[test]
    fn omni_produces_six_distinct_view_projections() {
        let mut light = Light::omni(Vec3::ZERO, 10.0);
        light.shadow.enabled = true;
        light.update_view_projections(&Aabb::default());
        for face in 0..6 {
            assert!(light.view_projection(face).is_some());
        }
        assert!(light.view_projection(6).is_none());
    }
}
