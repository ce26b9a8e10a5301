use glam::{Quat, Vec3};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::camera::PerspectiveCamera;
use crate::input::Input;
use crate::mesh::{Geometry, Transform};
use crate::picking::Ray;
use crate::scene::{ObjectId, Scene};
use crate::viewport::Viewport;

/// What a gizmo drag does to the attached object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GizmoMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

/// Emitted when a drag starts (`true`) or ends (`false`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DraggingChanged(pub bool);

#[derive(Clone, Copy, Debug)]
struct Drag {
    plane_normal: Vec3,
    start_hit: Vec3,
    start: Transform,
}

/// Drag-to-edit gizmo attached to one scene object.
///
/// Pressing the left button over the object starts a drag on the plane
/// through the object facing the camera. `W`/`E`/`R` switch between
/// translate, rotate and scale.
#[derive(Clone, Debug, Default)]
pub struct TransformControls {
    attached: Option<ObjectId>,
    pub mode: GizmoMode,
    drag: Option<Drag>,
}

impl TransformControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, object: ObjectId) {
        self.attached = Some(object);
        self.drag = None;
    }

    pub fn detach(&mut self) {
        self.attached = None;
        self.drag = None;
    }

    pub fn attached(&self) -> Option<ObjectId> {
        self.attached
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Process input; returns a notification when the dragging state flips.
    pub fn update(
        &mut self,
        input: &Input,
        camera: &PerspectiveCamera,
        viewport: Viewport,
        scene: &mut Scene,
    ) -> Option<DraggingChanged> {
        let id = self.attached?;

        if input.key_pressed(KeyCode::KeyW) {
            self.mode = GizmoMode::Translate;
        } else if input.key_pressed(KeyCode::KeyE) {
            self.mode = GizmoMode::Rotate;
        } else if input.key_pressed(KeyCode::KeyR) {
            self.mode = GizmoMode::Scale;
        }

        let cursor = input.mouse_position();
        let ray = Ray::from_screen(
            cursor.x,
            cursor.y,
            viewport.width() as f32,
            viewport.height() as f32,
            camera.view_projection(),
        );
        let object = scene.get_mut(id);

        if self.drag.is_none() && input.mouse_pressed(MouseButton::Left) {
            let radius = pick_radius(&object.geometry) * object.transform.scale.max_element();
            if ray.intersect_sphere(object.transform.position, radius).is_some() {
                let plane_normal = -camera.forward();
                let start_hit = ray
                    .intersect_plane(object.transform.position, plane_normal)
                    .map(|t| ray.point_at(t))?;
                self.drag = Some(Drag {
                    plane_normal,
                    start_hit,
                    start: object.transform,
                });
                return Some(DraggingChanged(true));
            }
            return None;
        }

        let drag = self.drag?;

        if !input.mouse_down(MouseButton::Left) {
            self.drag = None;
            return Some(DraggingChanged(false));
        }

        if let Some(t) = ray.intersect_plane(drag.start.position, drag.plane_normal) {
            object.transform = drag.apply(self.mode, ray.point_at(t));
        }
        None
    }
}

impl Drag {
    fn apply(&self, mode: GizmoMode, hit: Vec3) -> Transform {
        let center = self.start.position;
        let mut next = self.start;
        match mode {
            GizmoMode::Translate => {
                next.position = center + (hit - self.start_hit);
            }
            GizmoMode::Rotate => {
                let from = (self.start_hit - center).normalize_or_zero();
                let to = (hit - center).normalize_or_zero();
                if from != Vec3::ZERO && to != Vec3::ZERO {
                    next.rotation = Quat::from_rotation_arc(from, to) * self.start.rotation;
                }
            }
            GizmoMode::Scale => {
                let from = (self.start_hit - center).length();
                if from > f32::EPSILON {
                    let factor = ((hit - center).length() / from).max(0.01);
                    next.scale = self.start.scale * factor;
                }
            }
        }
        next
    }
}

fn pick_radius(geometry: &Geometry) -> f32 {
    match *geometry {
        Geometry::Sphere { radius, .. } => radius,
        Geometry::Box {
            width,
            height,
            depth,
        } => Vec3::new(width, height, depth).length() * 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneObject;
    use glam::{Mat4, Vec2};

    fn setup() -> (Scene, ObjectId, PerspectiveCamera, Viewport) {
        let mut scene = Scene::new();
        let mut sphere = SceneObject::sphere();
        sphere.transform.position = Vec3::ZERO;
        let id = scene.add(sphere);

        let viewport = Viewport::new(800, 800).unwrap();
        let mut camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        camera.position = Vec3::new(0.0, 0.0, 5.0);
        (scene, id, camera, viewport)
    }

    fn screen_of(point: Vec3, camera: &PerspectiveCamera, viewport: Viewport) -> Vec2 {
        let clip = camera.view_projection() * point.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * viewport.width() as f32,
            (1.0 - ndc.y) * 0.5 * viewport.height() as f32,
        )
    }

    #[test]
    fn drag_translates_and_reports_state_changes() {
        let (mut scene, id, camera, viewport) = setup();
        let mut gizmo = TransformControls::new();
        gizmo.attach(id);

        let mut input = Input::new();
        input.move_cursor(Vec2::new(400.0, 400.0));
        input.press_button(MouseButton::Left);
        assert_eq!(
            gizmo.update(&input, &camera, viewport, &mut scene),
            Some(DraggingChanged(true))
        );
        input.end_update();

        let target = screen_of(Vec3::new(0.5, 0.0, 0.0), &camera, viewport);
        input.move_cursor(target);
        assert_eq!(gizmo.update(&input, &camera, viewport, &mut scene), None);
        assert!((scene.get(id).transform.position - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-3);
        input.end_update();

        input.release_button(MouseButton::Left);
        assert_eq!(
            gizmo.update(&input, &camera, viewport, &mut scene),
            Some(DraggingChanged(false))
        );
        assert!(!gizmo.is_dragging());
    }

    #[test]
    fn press_off_object_does_not_drag() {
        let (mut scene, id, camera, viewport) = setup();
        let mut gizmo = TransformControls::new();
        gizmo.attach(id);

        let mut input = Input::new();
        input.move_cursor(Vec2::new(5.0, 5.0));
        input.press_button(MouseButton::Left);
        assert_eq!(gizmo.update(&input, &camera, viewport, &mut scene), None);
        assert!(!gizmo.is_dragging());
    }

    #[test]
    fn scale_mode_scales_uniformly() {
        let drag = Drag {
            plane_normal: Vec3::Z,
            start_hit: Vec3::new(0.5, 0.0, 0.0),
            start: Transform::new(),
        };
        let next = drag.apply(GizmoMode::Scale, Vec3::new(1.0, 0.0, 0.0));
        assert!((next.scale - Vec3::splat(2.0)).length() < 1e-5);
    }

    #[test]
    fn rotate_mode_turns_about_view_axis() {
        let drag = Drag {
            plane_normal: Vec3::Z,
            start_hit: Vec3::X,
            start: Transform::new(),
        };
        let next = drag.apply(GizmoMode::Rotate, Vec3::Y);
        let rotated = Mat4::from_quat(next.rotation).transform_vector3(Vec3::X);
        assert!((rotated - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn mode_keys_switch_modes() {
        let (mut scene, id, camera, viewport) = setup();
        let mut gizmo = TransformControls::new();
        gizmo.attach(id);

        let mut input = Input::new();
        input.press_key(KeyCode::KeyE);
        gizmo.update(&input, &camera, viewport, &mut scene);
        assert_eq!(gizmo.mode, GizmoMode::Rotate);
    }
}
