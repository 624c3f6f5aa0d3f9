//! Orbit camera controller for the flow viewer.

use std::f32::consts::PI;

use nalgebra::{Matrix4, Perspective3, Point3, Vector3};

/// Remaps clip-space depth from OpenGL's `[-1, 1]` to wgpu's `[0, 1]`.
#[rustfmt::skip]
fn opengl_to_wgpu() -> Matrix4<f32> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

const DEFAULT_ELEVATION: f32 = 0.3;

/// Orbit camera that rotates around a target point.
pub struct OrbitCamera {
    /// Target point to orbit around.
    pub target: Point3<f32>,
    /// Distance from target.
    pub distance: f32,
    /// Horizontal angle (radians).
    pub azimuth: f32,
    /// Vertical angle (radians), clamped short of the poles.
    pub elevation: f32,
    /// Vertical field of view in radians.
    pub fov: f32,
    /// Near clip plane.
    pub near: f32,
    /// Far clip plane.
    pub far: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Point3::origin(),
            distance: 3.0,
            azimuth: 0.0,
            elevation: DEFAULT_ELEVATION,
            fov: PI / 4.0,
            near: 0.01,
            far: 100.0,
        }
    }
}

impl OrbitCamera {
    /// Camera's eye position in world space.
    pub fn eye_position(&self) -> Point3<f32> {
        let (sin_elev, cos_elev) = self.elevation.sin_cos();
        let (sin_azim, cos_azim) = self.azimuth.sin_cos();
        self.target
            + self.distance * Vector3::new(cos_elev * sin_azim, sin_elev, cos_elev * cos_azim)
    }

    /// Unit vector from the eye towards the target.
    pub fn view_direction(&self) -> Vector3<f32> {
        (self.target - self.eye_position())
            .try_normalize(1e-10)
            .unwrap_or_else(|| -Vector3::z())
    }

    /// Combined view-projection matrix, column-major, ready for a uniform buffer.
    pub fn view_projection_matrix(&self, aspect: f32) -> [[f32; 4]; 4] {
        let view = Matrix4::look_at_rh(&self.eye_position(), &self.target, &Vector3::y());
        let proj = Perspective3::new(aspect.max(1e-6), self.fov, self.near, self.far);
        (opengl_to_wgpu() * proj.to_homogeneous() * view).into()
    }

    /// Rotate the camera by the given deltas (in radians).
    pub fn rotate(&mut self, delta_azimuth: f32, delta_elevation: f32) {
        self.azimuth += delta_azimuth;
        let limit = PI / 2.0 - 0.01;
        self.elevation = (self.elevation + delta_elevation).clamp(-limit, limit);
    }

    /// Zoom the camera by the given factor.
    ///
    /// The clip planes follow the distance so a shrinking mesh stays sharp.
    pub fn zoom(&mut self, factor: f32) {
        self.distance = (self.distance * factor).clamp(1e-3, 1e3);
        self.fit_clip_planes();
    }

    /// Frame a bounding sphere from the default angle.
    pub fn reset(&mut self, center: Point3<f32>, radius: f32) {
        let radius = if radius.is_finite() && radius > 0.0 { radius } else { 1.0 };
        self.target = center;
        self.distance = radius * 2.5;
        self.azimuth = 0.0;
        self.elevation = DEFAULT_ELEVATION;
        self.fit_clip_planes();
    }

    fn fit_clip_planes(&mut self) {
        self.near = self.distance * 0.01;
        self.far = self.distance * 100.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    fn project(camera: &OrbitCamera, p: Point3<f32>) -> Vector4<f32> {
        let m = Matrix4::from(camera.view_projection_matrix(1.0));
        m * p.to_homogeneous()
    }

    #[test]
    fn test_target_projects_to_screen_center() {
        let mut camera = OrbitCamera::default();
        camera.reset(Point3::new(1.0, 2.0, 3.0), 0.5);
        let clip = project(&camera, camera.target);
        assert!((clip.x / clip.w).abs() < 1e-5);
        assert!((clip.y / clip.w).abs() < 1e-5);
    }

    #[test]
    fn test_depth_in_wgpu_range() {
        let mut camera = OrbitCamera::default();
        camera.reset(Point3::origin(), 1.0);

        let near = camera.eye_position() + camera.view_direction() * camera.near;
        let far = camera.eye_position() + camera.view_direction() * camera.far;
        let near_clip = project(&camera, near);
        let far_clip = project(&camera, far);

        assert!((near_clip.z / near_clip.w).abs() < 1e-4);
        assert!((far_clip.z / far_clip.w - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_elevation_clamped() {
        let mut camera = OrbitCamera::default();
        camera.rotate(0.0, 10.0);
        assert!(camera.elevation < PI / 2.0);
        camera.rotate(0.0, -20.0);
        assert!(camera.elevation > -PI / 2.0);
    }

    #[test]
    fn test_reset_frames_radius() {
        let mut camera = OrbitCamera::default();
        camera.zoom(7.0);
        camera.reset(Point3::origin(), 2.0);
        assert_eq!(camera.distance, 5.0);
        assert!(((camera.eye_position() - camera.target).norm() - 5.0).abs() < 1e-5);

        camera.reset(Point3::origin(), 0.0);
        assert_eq!(camera.distance, 2.5);
    }
}
