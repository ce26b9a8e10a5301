//! Camera and object manipulation.
//!
//! [`OrbitControls`] move the camera; [`TransformControls`] edit the object
//! they are attached to. [`Controls`] wires the two together the way the
//! scene needs them: while the gizmo is dragging, orbiting is disabled.

mod orbit;
mod transform;

pub use orbit::OrbitControls;
pub use transform::{DraggingChanged, GizmoMode, TransformControls};

use crate::camera::PerspectiveCamera;
use crate::input::Input;
use crate::scene::Scene;
use crate::viewport::Viewport;

/// Orbit controls plus an optional transform gizmo.
#[derive(Clone, Debug)]
pub struct Controls {
    pub orbit: OrbitControls,
    pub transform: Option<TransformControls>,
}

impl Controls {
    pub fn new(orbit: OrbitControls) -> Self {
        Self {
            orbit,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: TransformControls) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Give the gizmo first claim on the pointer, then orbit with what's left.
    pub fn update(
        &mut self,
        input: &Input,
        camera: &mut PerspectiveCamera,
        viewport: Viewport,
        scene: &mut Scene,
    ) {
        if let Some(gizmo) = &mut self.transform {
            if let Some(DraggingChanged(dragging)) = gizmo.update(input, camera, viewport, scene) {
                tracing::trace!(dragging, "gizmo dragging changed");
                self.orbit.enabled = !dragging;
            }
        }
        self.orbit.update(input, camera, viewport.height() as f32);
    }
}
