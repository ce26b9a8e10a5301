//! The effect composer: an ordered chain of passes with ping-pong targets.

use crate::gpu::GpuContext;
use crate::postprocess::{PassKind, Postprocess};
use crate::render::{BloomPass, FrameView, HDR_FORMAT, RenderTarget, ScenePass};

/// Per-pass execution context, rebuilt every frame.
pub struct PassContext<'a> {
    pub gpu: &'a GpuContext,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub frame: &'a FrameView<'a>,
    /// Pixel size of the target the pass is writing.
    pub target_size: (u32, u32),
}

/// One stage of the composer.
///
/// The first pass gets no input; every later pass samples the previous
/// pass's output. The last pass writes to the surface.
pub trait Pass {
    fn execute(
        &mut self,
        ctx: &mut PassContext<'_>,
        target: &wgpu::TextureView,
        input: Option<&wgpu::TextureView>,
    );
}

/// Runs passes in order, alternating between two offscreen targets.
///
/// ```text
/// Pass 0: None     → Target A
/// Pass 1: Target A → Surface
/// ```
pub struct Composer {
    passes: Vec<Box<dyn Pass>>,
    target_a: RenderTarget,
    target_b: RenderTarget,
    render_size: (u32, u32),
}

impl Composer {
    /// Build the passes named by `postprocess`, rendering offscreen at
    /// `render_size`. The scene pass draws with `samples` samples per pixel.
    pub fn new(
        gpu: &GpuContext,
        postprocess: &Postprocess,
        render_size: (u32, u32),
        samples: u32,
    ) -> Self {
        let count = postprocess.passes().len();
        let passes = postprocess
            .passes()
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let format = if i + 1 == count {
                    gpu.config.format
                } else {
                    HDR_FORMAT
                };
                match kind {
                    PassKind::Render => {
                        Box::new(ScenePass::new(gpu, format, samples)) as Box<dyn Pass>
                    }
                    PassKind::Bloom => Box::new(BloomPass::new(gpu, format)),
                }
            })
            .collect();

        Self {
            passes,
            target_a: RenderTarget::new(gpu, render_size, HDR_FORMAT, "Composer Target A"),
            target_b: RenderTarget::new(gpu, render_size, HDR_FORMAT, "Composer Target B"),
            render_size,
        }
    }

    pub fn render_size(&self) -> (u32, u32) {
        self.render_size
    }

    pub fn set_render_size(&mut self, size: (u32, u32)) {
        self.render_size = size;
    }

    /// Render one frame to the surface and present it.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        frame: &FrameView<'_>,
    ) -> Result<(), wgpu::SurfaceError> {
        self.target_a
            .ensure_size(gpu, self.render_size, "Composer Target A");
        self.target_b
            .ensure_size(gpu, self.render_size, "Composer Target B");

        let output = gpu.surface.get_current_texture()?;
        let screen_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Composer Encoder"),
            });

        let count = self.passes.len();
        let mut input: Option<&wgpu::TextureView> = None;
        for (i, pass) in self.passes.iter_mut().enumerate() {
            let is_last = i + 1 == count;
            let (target, size) = if is_last {
                (&screen_view, (gpu.width(), gpu.height()))
            } else if i % 2 == 0 {
                (&self.target_a.view, self.target_a.size())
            } else {
                (&self.target_b.view, self.target_b.size())
            };

            let mut ctx = PassContext {
                gpu,
                encoder: &mut encoder,
                frame,
                target_size: size,
            };
            pass.execute(&mut ctx, target, input);

            if !is_last {
                input = Some(target);
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
