//! `DrawCallManager` (§4.4): owns the per-frame draw queue end-to-end —
//! submit, upload, cull, sort, issue.

use super::culling::cull;
use super::records::{
    DrawCategory, MeshVariant, SharedData, SharedDrawGpu, UniqueData, UniqueDrawGpu, DRAW_CATEGORY_COUNT,
};
use super::sort::sort_bucket;
use crate::bounds::{Aabb, Frustum, Sphere};
use crate::container::BucketArray;
use crate::environment::Environment;
use crate::gpu::Buffer;
use crate::material::Material;
use crate::model::Model;
use glam::{Affine3A, Mat4, Vec3};

/// Owns every draw call submitted between `begin_3d` and `end_3d`.
/// Cleared at `begin_3d`; culled, sorted and consumed during `end_3d`.
#[derive(Default)]
pub struct DrawCallManager {
    shared: Vec<SharedData>,
    unique: BucketArray<UniqueData, DRAW_CATEGORY_COUNT>,
    bone_staging: Vec<Mat4>,
    visible: [Vec<u32>; DRAW_CATEGORY_COUNT],
}

/// One mesh's worth of submission data, shared by `push_mesh` and the
/// per-mesh expansion inside `push_model`.
pub struct MeshSubmission {
    pub mesh: MeshVariant,
    pub local_bounds: Aabb,
    pub material: Material,
    pub texture_slots_exist: [bool; 4],
    pub dynamic_range_index: Option<u32>,
}

impl DrawCallManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every per-frame record. Called at `begin_3d`.
    pub fn begin_frame(&mut self) {
        self.shared.clear();
        self.unique.clear();
        self.bone_staging.clear();
        for bucket in &mut self.visible {
            bucket.clear();
        }
    }

    /// Appends one shared record and one unique record for a single mesh
    /// submission (`draw_mesh`/`draw_mesh_instanced`).
    pub fn push_mesh(
        &mut self,
        submission: MeshSubmission,
        transform: Affine3A,
        instances: Option<u64>,
        instance_count: u32,
    ) {
        let shared_index = self.shared.len() as u32;
        let obb = submission.local_bounds.transform(&transform);
        let bounding_sphere = Sphere::from_aabb(&submission.local_bounds).transform(&transform);

        self.shared.push(SharedData {
            transform,
            bounding_sphere,
            instances,
            instance_count,
            bone_offset: None,
            unique_start: self.unique.len() as u32,
            unique_count: 1,
        });

        let category = DrawCategory::classify(&submission.material);
        let unique_index = self.unique.push(UniqueData {
            mesh: submission.mesh,
            material: submission.material,
            obb,
            texture_slots_exist: submission.texture_slots_exist,
            dynamic_range_index: submission.dynamic_range_index,
            shared_index,
            category,
        });
        self.unique.bucket(category as usize, unique_index);
    }

    /// Appends one shared record and one unique record per mesh in
    /// `model`. If the model is skinned and carries a pose (override or
    /// animation), the posed bone matrices are staged to the per-frame
    /// bone buffer first and the claimed range's first offset is recorded
    /// on the shared record; `world_pose[i]` is the caller-supplied posed
    /// matrix for bone `i` (already resolved by the host's animation
    /// system — this crate only consumes it).
    pub fn push_model(
        &mut self,
        model: &Model,
        per_mesh: Vec<MeshSubmission>,
        transform: Affine3A,
        instances: Option<u64>,
        instance_count: u32,
        world_pose: Option<&[Mat4]>,
    ) {
        debug_assert_eq!(per_mesh.len(), model.meshes.len());

        let bone_offset = if let (Some(skeleton), Some(pose)) = (&model.skeleton, world_pose) {
            let offset = self.bone_staging.len() as u32;
            for (bone_offset_matrix, world) in skeleton.offsets.iter().zip(pose.iter()) {
                self.bone_staging.push(*world * *bone_offset_matrix);
            }
            Some(offset)
        } else {
            None
        };

        let shared_index = self.shared.len() as u32;
        let unique_start = self.unique.len() as u32;

        let mut combined_bounds = Aabb::EMPTY;
        for submission in &per_mesh {
            combined_bounds = combined_bounds.union(&submission.local_bounds);
        }
        let bounding_sphere = Sphere::from_aabb(&combined_bounds).transform(&transform);

        self.shared.push(SharedData {
            transform,
            bounding_sphere,
            instances,
            instance_count,
            bone_offset,
            unique_start,
            unique_count: per_mesh.len() as u32,
        });

        for submission in per_mesh {
            let obb = submission.local_bounds.transform(&transform);
            let category = DrawCategory::classify(&submission.material);
            let unique_index = self.unique.push(UniqueData {
                mesh: submission.mesh,
                material: submission.material,
                obb,
                texture_slots_exist: submission.texture_slots_exist,
                dynamic_range_index: submission.dynamic_range_index,
                shared_index,
                category,
            });
            self.unique.bucket(category as usize, unique_index);
        }
    }

    /// Maps the shared/unique/bone GPU buffers with an `INVALIDATE_RANGE |
    /// WRITE`-style write and packs every record into its GPU layout.
    /// Buffers are grown (without preserving content — per-frame staging
    /// is fully repopulated) to fit this frame's record counts.
    pub fn upload(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        shared_buffer: &mut Buffer,
        unique_buffer: &mut Buffer,
        bone_buffer: &mut Buffer,
        mesh_layer_mask: impl Fn(&UniqueData) -> u16,
    ) {
        let shared_bytes: Vec<SharedDrawGpu> = self.shared.iter().map(SharedDrawGpu::from_shared).collect();
        let unique_bytes: Vec<UniqueDrawGpu> = self
            .unique
            .data()
            .iter()
            .map(|u| UniqueDrawGpu::from_unique(u, u32::from(mesh_layer_mask(u))))
            .collect();

        let shared_size = (shared_bytes.len() * std::mem::size_of::<SharedDrawGpu>()).max(16) as u64;
        let unique_size = (unique_bytes.len() * std::mem::size_of::<UniqueDrawGpu>()).max(16) as u64;
        let bone_size = (self.bone_staging.len() * std::mem::size_of::<Mat4>()).max(16) as u64;

        shared_buffer.reserve(device, encoder, shared_size, false);
        unique_buffer.reserve(device, encoder, unique_size, false);
        bone_buffer.reserve(device, encoder, bone_size, false);

        if !shared_bytes.is_empty() {
            shared_buffer.upload(queue, 0, bytemuck::cast_slice(&shared_bytes));
        }
        if !unique_bytes.is_empty() {
            unique_buffer.upload(queue, 0, bytemuck::cast_slice(&unique_bytes));
        }
        if !self.bone_staging.is_empty() {
            bone_buffer.upload(queue, 0, bytemuck::cast_slice(&self.bone_staging));
        }
    }

    /// §4.4's `culling` operation: classifies every unique record against
    /// `frustum`/`cull_mask` and stores the surviving indices per bucket.
    /// `mesh_layer_mask` resolves a unique record's mesh reference to its
    /// per-mesh layer mask; the caller (`Scene3D`) looks this up against
    /// the mesh arena for `MeshVariant::Static` and reports the full mask
    /// for `MeshVariant::Dynamic`, which carries no layer mask of its own.
    pub fn cull(&mut self, frustum: &Frustum, cull_mask: u32, mesh_layer_mask: impl Fn(&UniqueData) -> u16) {
        self.visible = cull(&self.shared, &self.unique, frustum, cull_mask, mesh_layer_mask);
    }

    /// §4.4's `sorting` operation: sorts each bucket's visible indices in
    /// place, gated by the environment's sort flags.
    pub fn sort(&mut self, environment: &Environment, camera_position: Vec3) {
        let data = self.unique.data();
        if environment.sort_opaque() {
            sort_bucket(DrawCategory::Opaque, &mut self.visible[0], &|i| &data[i as usize], camera_position);
            sort_bucket(DrawCategory::Prepass, &mut self.visible[1], &|i| &data[i as usize], camera_position);
        }
        if environment.sort_transparent() {
            sort_bucket(
                DrawCategory::Transparent,
                &mut self.visible[2],
                &|i| &data[i as usize],
                camera_position,
            );
        }
    }

    pub fn visible(&self, category: DrawCategory) -> &[u32] {
        &self.visible[category as usize]
    }

    pub fn shared(&self) -> &[SharedData] {
        &self.shared
    }

    pub fn unique(&self) -> &[UniqueData] {
        self.unique.data()
    }

    pub fn unique_at(&self, index: u32) -> &UniqueData {
        self.unique.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Aabb;

    fn submission(z_offset: f32, blend: crate::material::BlendMode) -> MeshSubmission {
        let mut material = Material::default();
        material.blend = blend;
        MeshSubmission {
            mesh: MeshVariant::Dynamic(0),
            local_bounds: Aabb {
                min: Vec3::new(-0.5, -0.5, -0.5 + z_offset),
                max: Vec3::new(0.5, 0.5, 0.5 + z_offset),
            },
            material,
            texture_slots_exist: [false; 4],
            dynamic_range_index: None,
        }
    }

    #[test]
    fn begin_frame_clears_everything() {
        let mut manager = DrawCallManager::new();
        manager.push_mesh(
            submission(0.0, crate::material::BlendMode::Opaque),
            Affine3A::IDENTITY,
            None,
            0,
        );
        assert_eq!(manager.shared().len(), 1);
        manager.begin_frame();
        assert!(manager.shared().is_empty());
        assert!(manager.unique().is_empty());
    }

    #[test]
    fn shared_index_on_unique_record_stays_in_range() {
        let mut manager = DrawCallManager::new();
        manager.push_mesh(
            submission(0.0, crate::material::BlendMode::Opaque),
            Affine3A::IDENTITY,
            None,
            0,
        );
        for unique in manager.unique() {
            assert!((unique.shared_index as usize) < manager.shared().len());
        }
    }
}
