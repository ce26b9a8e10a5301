//! Rendering: the [`Renderer`] seam and its wgpu implementation.
//!
//! The application talks to a `Renderer` only through three calls: size it,
//! hand it a [`FrameView`] per tick, and dispose of it. [`WgpuRenderer`] runs
//! the post-process composer (scene pass, then bloom) against the window
//! surface. Tests substitute a recording renderer.
//!
//! ```text
//! ScenePass ──► HDR target ──► BloomPass ──► surface
//!                                │
//!              threshold ─► blur mip 0..4 ─► composite
//! ```

mod bloom;
mod composer;
mod scene_pass;
mod target;
mod wgpu_renderer;

pub use bloom::BloomPass;
pub use composer::{Composer, Pass, PassContext};
pub use scene_pass::ScenePass;
pub use target::RenderTarget;
pub use wgpu_renderer::{WgpuRenderer, msaa_samples, render_scale};

use glam::Vec3;

use crate::camera::PerspectiveCamera;
use crate::controls::GizmoMode;
use crate::physics::BodyView;
use crate::postprocess::Postprocess;
use crate::scene::Scene;
use crate::viewport::Viewport;

/// Format of the offscreen scene and bloom targets.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Background colour, `0x121212`.
pub const CLEAR_COLOR: u32 = 0x121212;

/// Where the transform gizmo is drawn and what it is doing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GizmoView {
    pub origin: Vec3,
    pub mode: GizmoMode,
    pub dragging: bool,
}

/// Everything the renderer reads for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    pub scene: &'a Scene,
    pub camera: &'a PerspectiveCamera,
    pub postprocess: &'a Postprocess,
    pub bodies: &'a [BodyView],
    pub gizmo: Option<GizmoView>,
    pub time: f32,
}

/// Draws frames to the host's surface.
pub trait Renderer {
    /// Match the drawing surface to the viewport.
    fn set_size(&mut self, viewport: Viewport);

    /// Draw one frame through the post-process composer.
    fn render(&mut self, frame: &FrameView<'_>);

    /// Release GPU resources. Later calls to `render` do nothing.
    fn dispose(&mut self);
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn set_size(&mut self, viewport: Viewport) {
        (**self).set_size(viewport);
    }

    fn render(&mut self, frame: &FrameView<'_>) {
        (**self).render(frame);
    }

    fn dispose(&mut self) {
        (**self).dispose();
    }
}

/// Convert an 8-bit sRGB channel to linear.
pub fn srgb_to_linear(channel: u8) -> f64 {
    let c = channel as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// `0xRRGGBB` as an opaque linear clear colour, so it displays as written on
/// an sRGB surface.
pub fn clear_color(hex: u32) -> wgpu::Color {
    let [_, r, g, b] = hex.to_be_bytes();
    wgpu::Color {
        r: srgb_to_linear(r),
        g: srgb_to_linear(g),
        b: srgb_to_linear(b),
        a: 1.0,
    }
}
