//! Bounding volumes shared by culling, sorting, and shadow VP derivation.

use glam::{Affine3A, Mat4, Vec3, Vec3A};

/// Axis-aligned bounding box in some consistent space (local or world).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut aabb = Self::EMPTY;
        for p in points {
            aabb.min = aabb.min.min(p);
            aabb.max = aabb.max.max(p);
        }
        aabb
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extent(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn radius(&self) -> f32 {
        self.half_extent().length()
    }

    /// The eight corner points of this box.
    pub fn corners(&self) -> [Vec3; 8] {
        let Self { min, max } = *self;
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
        ]
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Transforms this local-space AABB by `transform`, producing an
    /// oriented bounding box (the eight transformed corners).
    pub fn transform(&self, transform: &Affine3A) -> Obb {
        let corners = self.corners().map(|c| (*transform * Vec3A::from(c)).into());
        Obb { corners }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Oriented bounding box: an AABB after a rigid-plus-scale transform,
/// stored as its eight world-space corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    pub corners: [Vec3; 8],
}

impl Obb {
    /// Conservative world-space AABB enclosing this OBB.
    pub fn bounding_aabb(&self) -> Aabb {
        Aabb::from_points(self.corners)
    }

    /// Farthest corner distance² from `point` — used for back-to-front
    /// transparent sorting.
    pub fn max_distance_squared(&self, point: Vec3) -> f32 {
        self.corners
            .iter()
            .map(|c| c.distance_squared(point))
            .fold(0.0_f32, f32::max)
    }
}

/// A bounding sphere, used for the cheap first-pass frustum classification
/// in `DrawCallManager::culling`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn from_aabb(aabb: &Aabb) -> Self {
        Self {
            center: aabb.center(),
            radius: aabb.radius(),
        }
    }

    /// Transforms this sphere by `transform`, scaling the radius by the
    /// largest per-axis basis-vector length (a conservative bound under
    /// non-uniform scale).
    pub fn transform(&self, transform: &Affine3A) -> Sphere {
        let scale = transform
            .matrix3
            .x_axis
            .length()
            .max(transform.matrix3.y_axis.length())
            .max(transform.matrix3.z_axis.length());
        Sphere {
            center: transform.transform_point3(self.center),
            radius: self.radius * scale,
        }
    }
}

/// Six-plane view frustum, planes stored as `(a, b, c, d)` with the
/// interior on the positive side: `a*x + b*y + c*z + d >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [glam::Vec4; 6],
}

/// Outcome of testing a sphere or OBB against a [`Frustum`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumTest {
    Outside,
    Inside,
    Intersect,
}

impl Frustum {
    /// Gribb-Hartmann plane extraction from a view-projection matrix.
    /// Plane order: Left, Right, Bottom, Top, Near, Far.
    pub fn from_matrix(view_proj: Mat4) -> Self {
        let m = view_proj.transpose();
        let row = |i: usize| m.row(i);
        let r0 = row(0);
        let r1 = row(1);
        let r2 = row(2);
        let r3 = row(3);

        let mut planes = [
            r3 + r0, // left
            r3 - r0, // right
            r3 + r1, // bottom
            r3 - r1, // top
            r3 + r2, // near
            r3 - r2, // far
        ];
        for plane in &mut planes {
            let len = Vec3::new(plane.x, plane.y, plane.z).length();
            if len > f32::EPSILON {
                *plane /= len;
            }
        }
        Self { planes }
    }

    fn plane_distance(plane: glam::Vec4, point: Vec3) -> f32 {
        plane.x * point.x + plane.y * point.y + plane.z * point.z + plane.w
    }

    /// Classifies a bounding sphere against the frustum.
    pub fn test_sphere(&self, sphere: Sphere) -> FrustumTest {
        let mut intersecting = false;
        for plane in self.planes {
            let d = Self::plane_distance(plane, sphere.center);
            if d < -sphere.radius {
                return FrustumTest::Outside;
            }
            if d < sphere.radius {
                intersecting = true;
            }
        }
        if intersecting {
            FrustumTest::Intersect
        } else {
            FrustumTest::Inside
        }
    }

    /// Precise OBB-against-frustum test: outside if every corner is
    /// outside any single plane.
    pub fn test_obb(&self, obb: &Obb) -> bool {
        for plane in self.planes {
            let all_outside = obb
                .corners
                .iter()
                .all(|&c| Self::plane_distance(plane, c) < 0.0);
            if all_outside {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_from_points_and_center() {
        let aabb = Aabb::from_points([Vec3::new(-1.0, -2.0, -3.0), Vec3::new(1.0, 2.0, 3.0)]);
        assert_eq!(aabb.center(), Vec3::ZERO);
        assert_eq!(aabb.half_extent(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn frustum_classifies_sphere_outside() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        let frustum = Frustum::from_matrix(proj * view);
        let far_away = Sphere {
            center: Vec3::new(1000.0, 0.0, 0.0),
            radius: 1.0,
        };
        assert_eq!(frustum.test_sphere(far_away), FrustumTest::Outside);
        let at_origin = Sphere {
            center: Vec3::ZERO,
            radius: 1.0,
        };
        assert_ne!(frustum.test_sphere(at_origin), FrustumTest::Outside);
    }
}
