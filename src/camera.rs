//! Render camera: view/projection derivation and the per-frame frustum
//! used for culling.
//!
//! Perspective projections use reverse-Z (`Mat4::perspective_infinite_reverse_rh`)
//! for the depth-precision benefits that motivate it everywhere else in the
//! pipeline (shadow and prepass depth targets included); orthographic
//! projections swap `near`/`far` to keep the same depth convention.

use crate::bounds::Frustum;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec3A};

/// Perspective vs. orthographic camera projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective { fov_y_radians: f32, aspect: f32 },
    Orthographic { half_width: f32, half_height: f32 },
}

/// A camera snapshot taken at `begin_3d` time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub projection: Projection,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective { fov_y_radians, aspect } => {
                Mat4::perspective_infinite_reverse_rh(fov_y_radians, aspect, self.near)
            }
            Projection::Orthographic {
                half_width,
                half_height,
            } => Mat4::orthographic_rh(
                -half_width,
                half_width,
                -half_height,
                half_height,
                self.far,
                self.near,
            ),
        }
    }

    /// Extracts the GPU-facing snapshot plus the frustum used for culling
    /// this frame.
    pub fn extract(&self) -> RenderCamera {
        let view = self.view_matrix();
        let projection = self.projection_matrix();
        let view_projection = projection * view;
        RenderCamera {
            view,
            projection,
            view_projection,
            position: Vec3A::from(self.position),
            frustum: Frustum::from_matrix(view_projection),
            near: self.near,
            far: self.far,
        }
    }
}

/// `#[repr(C)]`, `Copy` camera data cached for the duration of a frame.
#[derive(Debug, Clone, Copy)]
pub struct RenderCamera {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub position: Vec3A,
    pub frustum: Frustum,
    pub near: f32,
    pub far: f32,
}

/// GPU-facing camera uniform bound once per render pass at
/// [`crate::binding::CAMERA_BINDING`], std140-compatible.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraGpu {
    pub view_proj: [[f32; 4]; 4],
    pub position: [f32; 3],
    pub near: f32,
    pub far: f32,
    pub _pad: [f32; 3],
}

const _: () = assert!(std::mem::size_of::<CameraGpu>() % 16 == 0);

impl CameraGpu {
    pub fn from_render_camera(camera: &RenderCamera) -> Self {
        Self {
            view_proj: camera.view_projection.to_cols_array_2d(),
            position: camera.position.to_array(),
            near: camera.near,
            far: camera.far,
            _pad: [0.0; 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_gpu_record_is_16_byte_multiple() {
        assert_eq!(std::mem::size_of::<CameraGpu>() % 16, 0);
    }

    #[test]
    fn perspective_reverse_z_has_finite_matrix() {
        let camera = Camera {
            position: Vec3::new(0.0, 0.0, 2.0),
            forward: -Vec3::Z,
            up: Vec3::Y,
            projection: Projection::Perspective {
                fov_y_radians: std::f32::consts::FRAC_PI_2,
                aspect: 1.0,
            },
            near: 0.05,
            far: 1000.0,
        };
        let rc = camera.extract();
        assert!(rc.projection.is_finite());
        assert!(rc.view_projection.is_finite());
    }
}
