//! View/shadow-frustum culling (§4.4's `culling` operation).

use super::records::{DrawCategory, SharedData, UniqueData, DRAW_CATEGORY_COUNT};
use crate::bounds::{Frustum, FrustumTest};
use crate::container::BucketArray;

/// Classifies every unique record against `frustum`, filtered by
/// `cull_mask`, and appends the survivors' dense indices into `buckets`
/// (one bucket per [`DrawCategory`]).
///
/// Per §4.4: a shared record's bounding sphere is tested first. `Outside`
/// discards every unique record it contains; `Inside` includes all of
/// them without further testing; `Intersect` falls through to a precise
/// per-unique OBB test. Records whose shared data carries
/// `instance_count > 0` bypass the sphere test entirely (instance
/// positions are unknown at submission time) and are included whenever
/// they pass the cull mask.
pub fn cull(
    shared: &[SharedData],
    unique: &BucketArray<UniqueData, DRAW_CATEGORY_COUNT>,
    frustum: &Frustum,
    cull_mask: u32,
    mesh_layer_mask: impl Fn(&UniqueData) -> u16,
) -> [Vec<u32>; DRAW_CATEGORY_COUNT] {
    let mut visible: [Vec<u32>; DRAW_CATEGORY_COUNT] = Default::default();

    if cull_mask == 0 {
        return visible;
    }

    for shared_entry in shared {
        let range = shared_entry.unique_start..shared_entry.unique_start + shared_entry.unique_count;

        let test = if shared_entry.instance_count > 0 {
            FrustumTest::Intersect
        } else {
            frustum.test_sphere(shared_entry.bounding_sphere)
        };

        if test == FrustumTest::Outside {
            continue;
        }

        for index in range {
            let record = unique.get(index);
            if (u32::from(mesh_layer_mask(record)) & cull_mask) == 0 {
                continue;
            }
            let visible_here = match test {
                FrustumTest::Outside => false,
                FrustumTest::Inside => true,
                FrustumTest::Intersect => frustum.test_obb(&record.obb),
            };
            if visible_here {
                visible[record.category as usize].push(index);
            }
        }
    }

    visible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{Aabb, Obb, Sphere};
    use crate::draw::records::MeshVariant;
    use crate::handle::Arena;
    use crate::material::Material;
    use crate::mesh::Mesh;
    use glam::{Affine3A, Mat4, Vec3};

    fn frustum_looking_down_z() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        Frustum::from_matrix(proj * view)
    }

    fn shared_at(z: f32, instance_count: u32, unique_start: u32) -> SharedData {
        SharedData {
            transform: Affine3A::from_translation(Vec3::new(0.0, 0.0, z)),
            bounding_sphere: Sphere {
                center: Vec3::new(0.0, 0.0, z),
                radius: 0.5,
            },
            instances: None,
            instance_count,
            bone_offset: None,
            unique_start,
            unique_count: 1,
        }
    }

    fn unique_at(z: f32) -> UniqueData {
        let arena: Arena<Mesh> = Arena::new();
        let _ = arena;
        UniqueData {
            mesh: MeshVariant::Dynamic(0),
            material: Material::default(),
            obb: Aabb {
                min: Vec3::new(-0.5, -0.5, z - 0.5),
                max: Vec3::new(0.5, 0.5, z + 0.5),
            }
            .transform(&Affine3A::IDENTITY),
            texture_slots_exist: [false; 4],
            dynamic_range_index: None,
            shared_index: 0,
            category: DrawCategory::Opaque,
        }
    }

    #[test]
    fn zero_cull_mask_yields_no_visible_draws() {
        let mut unique = BucketArray::<UniqueData, DRAW_CATEGORY_COUNT>::new();
        let idx = unique.push(unique_at(0.0));
        unique.bucket(0, idx);
        let shared = vec![shared_at(0.0, 0, 0)];
        let result = cull(&shared, &unique, &frustum_looking_down_z(), 0, |_| 1);
        assert!(result.iter().all(Vec::is_empty));
    }

    #[test]
    fn far_away_sphere_is_culled_outside() {
        let mut unique = BucketArray::<UniqueData, DRAW_CATEGORY_COUNT>::new();
        let idx = unique.push(unique_at(1000.0));
        unique.bucket(0, idx);
        let shared = vec![shared_at(1000.0, 0, 0)];
        let result = cull(&shared, &unique, &frustum_looking_down_z(), u32::MAX, |_| 1);
        assert!(result[0].is_empty());
    }

    #[test]
    fn instanced_draw_bypasses_sphere_test() {
        let mut unique = BucketArray::<UniqueData, DRAW_CATEGORY_COUNT>::new();
        let idx = unique.push(unique_at(1000.0));
        unique.bucket(0, idx);
        // instance_count > 0 means the sphere test is skipped; OBB test
        // still applies and the far-away OBB is genuinely outside.
        let shared = vec![shared_at(1000.0, 4, 0)];
        let result = cull(&shared, &unique, &frustum_looking_down_z(), u32::MAX, |_| 1);
        assert!(result[0].is_empty());
    }
}
