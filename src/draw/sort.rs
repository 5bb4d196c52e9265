//! Per-bucket sort-key computation (§4.4's `sorting` operation).

use super::records::{DrawCategory, UniqueData};
use glam::Vec3;

/// Sorts `indices` in place against `unique`, front-to-back for the
/// opaque/prepass buckets (distance² from the camera to the AABB center)
/// and back-to-front for the transparent bucket (distance² from the
/// camera to the AABB's farthest point).
pub fn sort_bucket(
    category: DrawCategory,
    indices: &mut [u32],
    unique: &dyn Fn(u32) -> &UniqueData,
    camera_position: Vec3,
) {
    match category {
        DrawCategory::Opaque | DrawCategory::Prepass => {
            indices.sort_by(|&a, &b| {
                let da = unique(a).world_aabb().center().distance_squared(camera_position);
                let db = unique(b).world_aabb().center().distance_squared(camera_position);
                da.total_cmp(&db)
            });
        }
        DrawCategory::Transparent => {
            indices.sort_by(|&a, &b| {
                let da = unique(a).obb.max_distance_squared(camera_position);
                let db = unique(b).obb.max_distance_squared(camera_position);
                db.total_cmp(&da)
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Aabb;
    use crate::draw::records::MeshVariant;
    use crate::material::Material;
    use glam::Affine3A;

    fn unique_box(center: Vec3) -> UniqueData {
        UniqueData {
            mesh: MeshVariant::Dynamic(0),
            material: Material::default(),
            obb: Aabb {
                min: center - Vec3::splat(0.5),
                max: center + Vec3::splat(0.5),
            }
            .transform(&Affine3A::IDENTITY),
            texture_slots_exist: [false; 4],
            dynamic_range_index: None,
            shared_index: 0,
            category: DrawCategory::Opaque,
        }
    }

    #[test]
    fn opaque_bucket_sorts_front_to_back() {
        let records = vec![unique_box(Vec3::new(0.0, 0.0, 5.0)), unique_box(Vec3::new(0.0, 0.0, 2.0))];
        let mut indices = vec![0u32, 1u32];
        sort_bucket(DrawCategory::Opaque, &mut indices, &|i| &records[i as usize], Vec3::ZERO);
        assert_eq!(indices[0], 1); // distance-2 mesh first
    }

    #[test]
    fn transparent_bucket_sorts_back_to_front() {
        let records = vec![unique_box(Vec3::new(0.0, 0.0, 2.0)), unique_box(Vec3::new(0.0, 0.0, 5.0))];
        let mut indices = vec![0u32, 1u32];
        sort_bucket(DrawCategory::Transparent, &mut indices, &|i| &records[i as usize], Vec3::ZERO);
        assert_eq!(indices[0], 1); // distance-5 mesh first
    }
}
