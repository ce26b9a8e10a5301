use std::sync::Arc;

use winit::window::Window;

use crate::error::GpuError;
use crate::gpu::GpuContext;
use crate::render::{Composer, FrameView, Renderer};
use crate::viewport::Viewport;

/// Highest device pixel ratio the offscreen targets render at.
pub const MAX_PIXEL_RATIO: f64 = 1.5;

/// Scale from physical window pixels to offscreen render pixels.
///
/// The window already reports physical pixels (`logical * scale_factor`);
/// capping the effective ratio at 1.5 means rendering at
/// `min(1.5, scale_factor) / scale_factor` of that.
pub fn render_scale(scale_factor: f64) -> f32 {
    let dpr = scale_factor.max(f64::EPSILON);
    (dpr.min(MAX_PIXEL_RATIO) / dpr) as f32
}

/// Scene pass sample count for a display.
///
/// Standard-density displays get 4x MSAA; on high-density displays the extra
/// pixels already smooth edges, so the scene renders single-sampled.
pub fn msaa_samples(scale_factor: f64) -> u32 {
    if scale_factor <= 1.0 { 4 } else { 1 }
}

/// The window-backed renderer.
///
/// The composer is built on the first frame, from that frame's
/// post-process configuration.
pub struct WgpuRenderer {
    window: Arc<Window>,
    gpu: Option<GpuContext>,
    composer: Option<Composer>,
    render_size: (u32, u32),
}

impl WgpuRenderer {
    pub fn new(window: Arc<Window>) -> Result<Self, GpuError> {
        let gpu = GpuContext::new(Arc::clone(&window))?;
        let render_size = (gpu.width(), gpu.height());
        Ok(Self {
            window,
            gpu: Some(gpu),
            composer: None,
            render_size,
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.gpu.is_none()
    }
}

impl Renderer for WgpuRenderer {
    fn set_size(&mut self, viewport: Viewport) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        gpu.resize(viewport.width(), viewport.height());

        let scale = render_scale(self.window.scale_factor());
        self.render_size = viewport.scaled(scale);
        if let Some(composer) = &mut self.composer {
            composer.set_render_size(self.render_size);
        }
        tracing::debug!(
            width = viewport.width(),
            height = viewport.height(),
            render_size = ?self.render_size,
            "renderer resized"
        );
    }

    fn render(&mut self, frame: &FrameView<'_>) {
        let Some(gpu) = &self.gpu else {
            return;
        };
        let render_size = self.render_size;
        let window = &self.window;
        let composer = self.composer.get_or_insert_with(|| {
            let samples = msaa_samples(window.scale_factor());
            tracing::debug!(samples, ?render_size, "building composer");
            Composer::new(gpu, frame.postprocess, render_size, samples)
        });

        match composer.render(gpu, frame) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("surface lost or outdated; reconfiguring and skipping frame");
                gpu.reconfigure();
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to acquire surface texture; skipping frame");
            }
        }
    }

    fn dispose(&mut self) {
        if self.gpu.is_some() {
            self.composer = None;
            self.gpu = None;
            tracing::info!("renderer disposed");
        }
    }
}
