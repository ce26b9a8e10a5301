use glam::{Vec2, Vec3};
use winit::event::MouseButton;

use crate::camera::PerspectiveCamera;
use crate::input::Input;

const MIN_POLAR: f32 = 0.01;
const MAX_POLAR: f32 = std::f32::consts::PI - 0.01;

/// Orbits the camera around a target point.
///
/// Left drag rotates, right drag pans, the wheel dollies. The spherical
/// coordinates are taken from the camera's placement when the controls are
/// created, so the initial view is preserved.
#[derive(Clone, Debug)]
pub struct OrbitControls {
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Distance from target.
    pub distance: f32,
    /// Horizontal angle around +Y, in radians.
    pub azimuth: f32,
    /// Angle from +Y, in radians; clamped away from the poles.
    pub polar: f32,
    /// When false, input is ignored.
    pub enabled: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitControls {
    /// Capture the camera's current placement around its target.
    pub fn new(camera: &PerspectiveCamera) -> Self {
        let offset = camera.position - camera.target;
        let distance = offset.length().max(f32::EPSILON);
        Self {
            target: camera.target,
            distance,
            azimuth: offset.x.atan2(offset.z),
            polar: (offset.y / distance).clamp(-1.0, 1.0).acos(),
            enabled: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
        }
    }

    /// Apply input to the orbit and write the result into the camera.
    ///
    /// `viewport_height` scales pointer motion so a full-height drag turns
    /// the view by one full revolution.
    pub fn update(&mut self, input: &Input, camera: &mut PerspectiveCamera, viewport_height: f32) {
        if !self.enabled {
            return;
        }

        let delta = input.mouse_delta();
        let height = viewport_height.max(1.0);

        if input.mouse_down(MouseButton::Left) && delta != Vec2::ZERO {
            let turn = std::f32::consts::TAU * self.rotate_speed / height;
            self.azimuth -= delta.x * turn;
            self.polar = (self.polar - delta.y * turn).clamp(MIN_POLAR, MAX_POLAR);
        }

        if input.mouse_down(MouseButton::Right) && delta != Vec2::ZERO {
            self.pan(delta, camera, height);
        }

        let scroll = input.scroll_delta().y;
        if scroll != 0.0 {
            let scale = 0.95f32.powf(self.zoom_speed * scroll.abs());
            self.distance = if scroll > 0.0 {
                self.distance * scale
            } else {
                self.distance / scale
            };
            self.distance = self.distance.clamp(self.min_distance, self.max_distance);
        }

        self.apply(camera);
    }

    /// Position the camera from the current spherical coordinates.
    pub fn apply(&self, camera: &mut PerspectiveCamera) {
        camera.position = self.target + self.offset();
        camera.target = self.target;
    }

    fn offset(&self) -> Vec3 {
        Vec3::new(
            self.distance * self.polar.sin() * self.azimuth.sin(),
            self.distance * self.polar.cos(),
            self.distance * self.polar.sin() * self.azimuth.cos(),
        )
    }

    fn pan(&mut self, delta: Vec2, camera: &PerspectiveCamera, height: f32) {
        // World units visible across the viewport height at the target depth.
        let visible = 2.0 * self.distance * (camera.fov.to_radians() * 0.5).tan();
        let per_pixel = visible / height * self.pan_speed;

        let forward = camera.forward();
        let right = forward.cross(camera.up).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();

        self.target += (-right * delta.x + up * delta.y) * per_pixel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        let mut cam = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        cam.position = Vec3::new(-0.7, 0.8, 3.0);
        cam
    }

    #[test]
    fn construction_preserves_camera_position() {
        let mut cam = camera();
        let controls = OrbitControls::new(&cam);
        let before = cam.position;
        controls.apply(&mut cam);
        assert!(cam.position.distance(before) < 1e-5);
    }

    #[test]
    fn drag_rotates_at_constant_distance() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam);
        let distance = cam.position.length();

        let mut input = Input::new();
        input.press_button(MouseButton::Left);
        input.move_cursor(Vec2::new(40.0, 0.0));
        controls.update(&input, &mut cam, 600.0);

        assert!((cam.position.length() - distance).abs() < 1e-4);
        assert!(cam.position.distance(Vec3::new(-0.7, 0.8, 3.0)) > 0.1);
    }

    #[test]
    fn disabled_controls_ignore_input() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam);
        controls.enabled = false;

        let mut input = Input::new();
        input.press_button(MouseButton::Left);
        input.move_cursor(Vec2::new(100.0, 50.0));
        input.scroll(Vec2::new(0.0, 3.0));
        controls.update(&input, &mut cam, 600.0);

        assert_eq!(cam.position, Vec3::new(-0.7, 0.8, 3.0));
    }

    #[test]
    fn scroll_up_dollies_in() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam);
        let before = controls.distance;

        let mut input = Input::new();
        input.scroll(Vec2::new(0.0, 1.0));
        controls.update(&input, &mut cam, 600.0);

        assert!(controls.distance < before);
    }
}
