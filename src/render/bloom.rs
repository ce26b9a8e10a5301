//! Unreal-style bloom.
//!
//! 1. High-pass the scene by luminance into a half-resolution target.
//! 2. For each of five mip levels, blur horizontally then vertically, each
//!    level at half the size of the previous and fed by it.
//! 3. Composite the scene plus the weighted mips into the output target.

use crate::gpu::GpuContext;
use crate::postprocess::BloomSettings;
use crate::render::{HDR_FORMAT, Pass, PassContext, RenderTarget};

pub const MIP_LEVELS: usize = 5;

/// Gaussian kernel radius per mip level, finest first.
const KERNEL_SIZES: [u32; MIP_LEVELS] = [3, 5, 7, 9, 11];

/// Luminance ramp width above the threshold.
const SMOOTH_WIDTH: f32 = 0.01;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct BloomParams {
    direction: [f32; 2],
    texel_size: [f32; 2],
    kernel_radius: f32,
    sigma: f32,
    threshold: f32,
    smooth_width: f32,
    weights_a: [f32; 4],
    weights_b: [f32; 4],
}

impl BloomParams {
    fn threshold(settings: &BloomSettings) -> Self {
        Self {
            threshold: settings.threshold,
            smooth_width: SMOOTH_WIDTH,
            ..Default::default()
        }
    }

    fn blur(level: usize, horizontal: bool, size: (u32, u32)) -> Self {
        let radius = KERNEL_SIZES[level] as f32;
        Self {
            direction: if horizontal { [1.0, 0.0] } else { [0.0, 1.0] },
            texel_size: [1.0 / size.0 as f32, 1.0 / size.1 as f32],
            kernel_radius: radius,
            sigma: radius,
            ..Default::default()
        }
    }

    fn composite(settings: &BloomSettings) -> Self {
        let w = settings.level_weights();
        Self {
            weights_a: [w[0], w[1], w[2], w[3]],
            weights_b: [w[4], 0.0, 0.0, 0.0],
            ..Default::default()
        }
    }
}

/// Size of mip level `level` for an input of `size`: half, quarter, ...
pub fn mip_size(size: (u32, u32), level: usize) -> (u32, u32) {
    let shift = level as u32 + 1;
    ((size.0 >> shift).max(1), (size.1 >> shift).max(1))
}

struct MipLevel {
    horizontal: RenderTarget,
    vertical: RenderTarget,
    horizontal_params: wgpu::Buffer,
    vertical_params: wgpu::Buffer,
}

/// The bloom pass. Samples the scene from its input and writes the composite
/// to its target.
pub struct BloomPass {
    threshold_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    source_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    threshold_params: wgpu::Buffer,
    composite_params: wgpu::Buffer,
    bright: RenderTarget,
    mips: Vec<MipLevel>,
    input_size: (u32, u32),
}

impl BloomPass {
    pub fn new(gpu: &GpuContext, format: wgpu::TextureFormat) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bloom Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/bloom.wgsl").into()),
        });

        let mut entries = vec![
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            texture_entry(1),
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];
        let source_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Source Layout"),
            entries: &entries,
        });
        entries.extend((0..MIP_LEVELS as u32).map(|i| texture_entry(3 + i)));
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Composite Layout"),
            entries: &entries,
        });

        let source_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bloom Pipeline Layout"),
            bind_group_layouts: &[&source_layout],
            push_constant_ranges: &[],
        });
        let composite_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Bloom Composite Pipeline Layout"),
                bind_group_layouts: &[&composite_layout],
                push_constant_ranges: &[],
            });

        let pipeline = |label: &str,
                        layout: &wgpu::PipelineLayout,
                        entry_point: &str,
                        format: wgpu::TextureFormat| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry_point),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let threshold_pipeline = pipeline(
            "Bloom Threshold Pipeline",
            &source_pipeline_layout,
            "fs_threshold",
            HDR_FORMAT,
        );
        let blur_pipeline = pipeline(
            "Bloom Blur Pipeline",
            &source_pipeline_layout,
            "fs_blur",
            HDR_FORMAT,
        );
        let composite_pipeline = pipeline(
            "Bloom Composite Pipeline",
            &composite_pipeline_layout,
            "fs_composite",
            format,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Bloom Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let input_size = (gpu.width(), gpu.height());
        let (bright, mips) = Self::allocate(gpu, input_size);

        Self {
            threshold_pipeline,
            blur_pipeline,
            composite_pipeline,
            source_layout,
            composite_layout,
            sampler,
            threshold_params: params_buffer(gpu, "Bloom Threshold Params"),
            composite_params: params_buffer(gpu, "Bloom Composite Params"),
            bright,
            mips,
            input_size,
        }
    }

    fn allocate(gpu: &GpuContext, input_size: (u32, u32)) -> (RenderTarget, Vec<MipLevel>) {
        let bright = RenderTarget::new(gpu, mip_size(input_size, 0), HDR_FORMAT, "Bloom Bright");
        let mips = (0..MIP_LEVELS)
            .map(|level| {
                let size = mip_size(input_size, level);
                let horizontal_params = params_buffer(gpu, "Bloom Blur Params H");
                let vertical_params = params_buffer(gpu, "Bloom Blur Params V");
                gpu.queue.write_buffer(
                    &horizontal_params,
                    0,
                    bytemuck::bytes_of(&BloomParams::blur(level, true, size)),
                );
                gpu.queue.write_buffer(
                    &vertical_params,
                    0,
                    bytemuck::bytes_of(&BloomParams::blur(level, false, size)),
                );
                MipLevel {
                    horizontal: RenderTarget::new(gpu, size, HDR_FORMAT, "Bloom Mip H"),
                    vertical: RenderTarget::new(gpu, size, HDR_FORMAT, "Bloom Mip V"),
                    horizontal_params,
                    vertical_params,
                }
            })
            .collect();
        (bright, mips)
    }

    /// Reallocate the mip chain when the scene resolution changes.
    fn ensure_size(&mut self, gpu: &GpuContext, input_size: (u32, u32)) {
        if self.input_size != input_size {
            tracing::debug!(?input_size, "resizing bloom mip chain");
            let (bright, mips) = Self::allocate(gpu, input_size);
            self.bright = bright;
            self.mips = mips;
            self.input_size = input_size;
        }
    }

    fn source_group(
        &self,
        gpu: &GpuContext,
        params: &wgpu::Buffer,
        source: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Source Bind Group"),
            layout: &self.source_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }
}

impl Pass for BloomPass {
    fn execute(
        &mut self,
        ctx: &mut PassContext<'_>,
        target: &wgpu::TextureView,
        input: Option<&wgpu::TextureView>,
    ) {
        let Some(scene) = input else {
            tracing::warn!("bloom pass has no input; skipping");
            return;
        };
        let gpu = ctx.gpu;
        let settings = ctx.frame.postprocess.bloom;
        let resolution = ctx.frame.postprocess.resolution();
        self.ensure_size(gpu, (resolution.width(), resolution.height()));

        gpu.queue.write_buffer(
            &self.threshold_params,
            0,
            bytemuck::bytes_of(&BloomParams::threshold(&settings)),
        );
        gpu.queue.write_buffer(
            &self.composite_params,
            0,
            bytemuck::bytes_of(&BloomParams::composite(&settings)),
        );

        let group = self.source_group(gpu, &self.threshold_params, scene);
        fullscreen(
            ctx.encoder,
            "Bloom Threshold",
            &self.bright.view,
            &self.threshold_pipeline,
            &group,
        );

        let mut source = &self.bright.view;
        for mip in &self.mips {
            let group = self.source_group(gpu, &mip.horizontal_params, source);
            let pipeline = &self.blur_pipeline;
            fullscreen(ctx.encoder, "Bloom Blur H", &mip.horizontal.view, pipeline, &group);
            let group = self.source_group(gpu, &mip.vertical_params, &mip.horizontal.view);
            fullscreen(ctx.encoder, "Bloom Blur V", &mip.vertical.view, pipeline, &group);
            source = &mip.vertical.view;
        }

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: self.composite_params.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(scene),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&self.sampler),
            },
        ];
        entries.extend(self.mips.iter().enumerate().map(|(i, mip)| wgpu::BindGroupEntry {
            binding: 3 + i as u32,
            resource: wgpu::BindingResource::TextureView(&mip.vertical.view),
        }));
        let group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Composite Bind Group"),
            layout: &self.composite_layout,
            entries: &entries,
        });
        fullscreen(ctx.encoder, "Bloom Composite", target, &self.composite_pipeline, &group);
    }
}

fn fullscreen(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    group: &wgpu::BindGroup,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, group, &[]);
    pass.draw(0..3, 0..1);
}

fn params_buffer(gpu: &GpuContext, label: &str) -> wgpu::Buffer {
    gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<BloomParams>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}
