//! Owns every live light, assigns per-frame GPU storage indices, and
//! drives the shadow-map lifecycle (§4.5).

use super::records::{LightGpu, ShadowGpu};
use super::shadow::{ShadowAtlas, ShadowFaceMode};
use super::{Light, LightKind};
use crate::bounds::{Aabb, Obb};
use crate::handle::{Arena, Handle};
use crate::material::CullMode;
use crate::mesh::ShadowCastMode;
use smallvec::SmallVec;

pub struct LightManager {
    lights: Arena<Light>,
    atlas: ShadowAtlas,
}

impl LightManager {
    pub fn new(shadow_atlas_capacity: u32) -> Self {
        Self {
            lights: Arena::new(),
            atlas: ShadowAtlas::new(shadow_atlas_capacity),
        }
    }

    pub fn create(&mut self, light: Light) -> Handle<Light> {
        self.lights.insert(light)
    }

    /// Destroys a light, freeing its shadow-atlas slot if it had one.
    /// Idempotent on an already-destroyed or stale handle.
    pub fn destroy(&mut self, handle: Handle<Light>) -> bool {
        if let Some(light) = self.lights.get(handle) {
            if let Some(slot) = light.shadow_map_slot {
                self.atlas.free(slot);
            }
        }
        self.lights.destroy(handle)
    }

    pub fn get(&self, handle: Handle<Light>) -> Option<&Light> {
        self.lights.get(handle)
    }

    pub fn get_mut(&mut self, handle: Handle<Light>) -> Option<&mut Light> {
        self.lights.get_mut(handle)
    }

    /// Enables or disables shadows for a light, allocating/freeing its
    /// atlas slot accordingly. Enabling when the atlas is exhausted logs
    /// and leaves shadows disabled for this light (§7 resource-exhaustion
    /// policy: the call is dropped, not fatal).
    pub fn set_shadow_active(&mut self, handle: Handle<Light>, active: bool) {
        let Some(light) = self.lights.get_mut(handle) else {
            return;
        };
        if active == light.shadow.enabled {
            return;
        }
        if active {
            match self.atlas.allocate() {
                Some(slot) => {
                    light.shadow_map_slot = Some(slot);
                    light.shadow.enabled = true;
                    light.shadow.vp_dirty = true;
                    light.shadow.needs_update = true;
                }
                None => {
                    log::error!(
                        "shadow atlas exhausted: all {} slots in use, shadows stay disabled for this light",
                        self.atlas.capacity()
                    );
                }
            }
        } else {
            if let Some(slot) = light.shadow_map_slot.take() {
                self.atlas.free(slot);
            }
            light.shadow.enabled = false;
            light.shadow_storage_index = -1;
        }
    }

    /// Per-frame update: advances shadow timers, re-derives view
    /// projections for lights whose geometry changed, and assigns dense
    /// GPU storage indices to every active light. Returns the packed
    /// light and shadow GPU records ready for upload.
    pub fn prepare_frame(&mut self, scene_bounds: &Aabb, dt: f32) -> (Vec<LightGpu>, Vec<ShadowGpu>) {
        let mut light_records = Vec::new();
        let mut shadow_records = Vec::new();

        let mut entries: Vec<Handle<Light>> = self
            .lights
            .iter()
            .filter(|(_, l)| l.active)
            .map(|(h, _)| h)
            .collect();
        // Stable order by handle insertion isn't guaranteed by slotmap
        // iteration across destroy/insert cycles; sorting keeps frame-to-
        // frame GPU index assignment deterministic for equal light sets.
        entries.sort_by_key(|h| format!("{h:?}"));

        for handle in entries {
            let light = self.lights.get_mut(handle).expect("collected from live arena");

            if light.shadow.enabled {
                if light.shadow.vp_dirty {
                    light.update_view_projections(scene_bounds);
                    light.shadow.vp_dirty = false;
                }
                light.shadow.advance(dt);
            }

            let storage_index = light_records.len() as u32;
            light.storage_index = storage_index;

            let shadow_index = if light.shadow.enabled {
                let idx = shadow_records.len() as i32;
                light.shadow_storage_index = idx;
                let map_index = light.shadow_map_slot.unwrap_or(0);
                let vp = light.view_projection(0).unwrap_or(glam::Mat4::IDENTITY);
                shadow_records.push(ShadowGpu::new(
                    vp,
                    light.shadow.bleeding_bias,
                    light.shadow.softness,
                    light.shadow.lambda,
                    map_index,
                ));
                idx
            } else {
                light.shadow_storage_index = -1;
                -1
            };

            light_records.push(light_gpu_record(light, shadow_index));
        }

        (light_records, shadow_records)
    }

    /// Lights whose shadow map must be re-rendered this frame, in
    /// ascending storage-index order.
    pub fn lights_needing_shadow_update(&self) -> Vec<Handle<Light>> {
        self.lights
            .iter()
            .filter(|(_, l)| l.active && l.shadow.enabled && l.shadow.needs_update)
            .map(|(h, _)| h)
            .collect()
    }

    /// Marks a shadow pass as complete for `handle`, clearing its one-shot
    /// `needs_update` flag (continuous mode re-arms itself next frame).
    pub fn consume_shadow_update(&mut self, handle: Handle<Light>) {
        if let Some(light) = self.lights.get_mut(handle) {
            light.shadow.consume_update();
        }
    }

    /// Manual-mode trigger exposed to the host (`updateShadowMap` in §4.5).
    pub fn request_shadow_update(&mut self, handle: Handle<Light>) {
        if let Some(light) = self.lights.get_mut(handle) {
            light.shadow.request_manual_update();
        }
    }

    /// Shadow-cast classification for one draw call against one light
    /// (§4.5): empty if the mesh opts out, every contained omni face for
    /// an omni light, or the single frustum for directional/spot.
    pub fn shadow_faces_for_obb(
        &self,
        handle: Handle<Light>,
        obb: &Obb,
        shadow_cast_mode: ShadowCastMode,
    ) -> SmallVec<[usize; 6]> {
        let mut faces = SmallVec::new();
        if shadow_cast_mode == ShadowCastMode::Disabled {
            return faces;
        }
        let Some(light) = self.lights.get(handle) else {
            return faces;
        };
        if !light.shadow.enabled {
            return faces;
        }
        match light.kind {
            LightKind::Omni(_) => {
                for face in 0..6 {
                    if let Some(frustum) = light.frustum(face) {
                        if frustum.test_obb(obb) {
                            faces.push(face);
                        }
                    }
                }
            }
            _ => {
                if let Some(frustum) = light.frustum(0) {
                    if frustum.test_obb(obb) {
                        faces.push(0);
                    }
                }
            }
        }
        faces
    }

    /// Resolves the effective cull mode for rasterizing a draw into a
    /// shadow map: `Auto` keeps the material's own cull mode, otherwise
    /// the mesh's shadow-face mode overrides it (§4.5).
    pub fn resolve_shadow_cull_mode(material_cull: CullMode, shadow_face: ShadowFaceMode) -> CullMode {
        match shadow_face {
            ShadowFaceMode::Auto => material_cull,
            ShadowFaceMode::Front => CullMode::Back,
            ShadowFaceMode::Back => CullMode::Front,
            ShadowFaceMode::Both => CullMode::None,
        }
    }
}

fn light_gpu_record(light: &Light, shadow_index: i32) -> LightGpu {
    match light.kind {
        LightKind::Directional(d) => LightGpu::new(
            d.direction * -light.shadow.derived_range,
            d.direction,
            light.color,
            light.energy,
            light.specular,
            0.0,
            0.0,
            0.0,
            0.0,
            light.layer_mask,
            light.cull_mask,
            shadow_index,
            light.kind.type_index(),
        ),
        LightKind::Spot(s) => LightGpu::new(
            s.position,
            s.direction,
            light.color,
            light.energy,
            light.specular,
            s.range,
            s.attenuation,
            s.inner_cutoff_cos,
            s.outer_cutoff_cos,
            light.layer_mask,
            light.cull_mask,
            shadow_index,
            light.kind.type_index(),
        ),
        LightKind::Omni(o) => LightGpu::new(
            o.position,
            glam::Vec3::ZERO,
            light.color,
            light.energy,
            light.specular,
            o.range,
            o.attenuation,
            0.0,
            0.0,
            light.layer_mask,
            light.cull_mask,
            shadow_index,
            light.kind.type_index(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn active_lights_get_contiguous_storage_indices() {
        let mut manager = LightManager::new(4);
        manager.create(Light::directional(Vec3::NEG_Y));
        manager.create(Light::omni(Vec3::ZERO, 5.0));
        let (lights, shadows) = manager.prepare_frame(&Aabb::default(), 1.0 / 60.0);
        assert_eq!(lights.len(), 2);
        assert!(shadows.is_empty());
    }

    #[test]
    fn shadow_activation_respects_atlas_capacity() {
        let mut manager = LightManager::new(1);
        let a = manager.create(Light::omni(Vec3::ZERO, 5.0));
        let b = manager.create(Light::omni(Vec3::ONE, 5.0));
        manager.set_shadow_active(a, true);
        manager.set_shadow_active(b, true);
        assert!(manager.get(a).unwrap().has_shadow());
        assert!(!manager.get(b).unwrap().has_shadow());
    }

    #[test]
    fn destroying_a_shadowed_light_frees_its_slot() {
        let mut manager = LightManager::new(1);
        let a = manager.create(Light::omni(Vec3::ZERO, 5.0));
        manager.set_shadow_active(a, true);
        manager.destroy(a);
        let b = manager.create(Light::omni(Vec3::ONE, 5.0));
        manager.set_shadow_active(b, true);
        assert!(manager.get(b).unwrap().has_shadow());
    }

    #[test]
    fn zero_range_light_has_degenerate_shadow_volume() {
        let mut light = Light::spot(Vec3::ZERO, Vec3::NEG_Z, 0.0);
        light.shadow.enabled = true;
        light.update_view_projections(&Aabb::default());
        // Range is clamped to a minimal epsilon so the projection stays
        // finite; a zero-range light still must not illuminate anything,
        // which is enforced at shading time by the light's own `range`
        // field reaching the shader as `0.0`.
        assert!(light.view_projection(0).unwrap().is_finite());
    }
}
