use glam::{Mat4, Vec3};

use crate::viewport::Viewport;

/// A perspective camera looking at a target point.
///
/// The projection matrix is cached; call [`update_projection`](Self::update_projection)
/// after changing `fov`, `aspect`, `near`, or `far`.
#[derive(Clone, Debug)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov,
            aspect,
            near,
            far,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection();
        camera
    }

    /// The demo camera: 75° fov, near 0.1, far 100, placed up and to the left.
    pub fn for_viewport(viewport: Viewport) -> Self {
        let mut camera = Self::new(75.0, viewport.aspect(), 0.1, 100.0);
        camera.position = Vec3::new(-0.7, 0.8, 3.0);
        camera
    }

    pub fn update_projection(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_change_needs_projection_update() {
        let mut cam = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        let before = cam.projection_matrix();

        cam.aspect = 2.0;
        assert_eq!(cam.projection_matrix(), before);

        cam.update_projection();
        assert_ne!(cam.projection_matrix(), before);
        assert_eq!(
            cam.projection_matrix(),
            Mat4::perspective_rh(75f32.to_radians(), 2.0, 0.1, 100.0)
        );
    }

    #[test]
    fn viewport_camera_matches_demo_setup() {
        let cam = PerspectiveCamera::for_viewport(Viewport::new(800, 600).unwrap());
        assert_eq!(cam.aspect, 800.0 / 600.0);
        assert_eq!(cam.position, Vec3::new(-0.7, 0.8, 3.0));
        assert!(!cam.view_projection().col(0).x.is_nan());
    }
}
