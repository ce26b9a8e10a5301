use crate::gpu::GpuContext;

/// An offscreen texture that passes render into and sample from.
///
/// Sized independently of the surface so the composer can render below
/// native resolution; [`ensure_size`](Self::ensure_size) reallocates when the
/// requested size changes.
#[derive(Debug)]
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    samples: u32,
    width: u32,
    height: u32,
}

impl RenderTarget {
    pub fn new(
        gpu: &GpuContext,
        size: (u32, u32),
        format: wgpu::TextureFormat,
        label: &str,
    ) -> Self {
        Self::with_samples(gpu, size, format, 1, label)
    }

    /// A target with `samples` samples per pixel. Multisampled targets can
    /// only be rendered into and resolved, never sampled.
    pub fn with_samples(
        gpu: &GpuContext,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
        samples: u32,
        label: &str,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: target_usage(samples),
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            format,
            samples,
            width,
            height,
        }
    }

    /// Depth buffer for the scene pass, matching its colour sample count.
    pub fn depth(gpu: &GpuContext, size: (u32, u32), samples: u32, label: &str) -> Self {
        Self::with_samples(gpu, size, wgpu::TextureFormat::Depth32Float, samples, label)
    }

    pub fn ensure_size(&mut self, gpu: &GpuContext, size: (u32, u32), label: &str) {
        let size = (size.0.max(1), size.1.max(1));
        if (self.width, self.height) != size {
            *self = Self::with_samples(gpu, size, self.format, self.samples, label);
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }
}

fn target_usage(samples: u32) -> wgpu::TextureUsages {
    if samples > 1 {
        wgpu::TextureUsages::RENDER_ATTACHMENT
    } else {
        wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multisampled_targets_are_not_sampled() {
        assert!(!target_usage(4).contains(wgpu::TextureUsages::TEXTURE_BINDING));
        assert!(target_usage(1).contains(wgpu::TextureUsages::TEXTURE_BINDING));
        assert!(target_usage(4).contains(wgpu::TextureUsages::RENDER_ATTACHMENT));
    }
}
