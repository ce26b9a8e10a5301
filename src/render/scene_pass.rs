//! The scene render pass: lines first, then the transparent sphere.
//!
//! Three bind groups, shared by both pipelines where they overlap:
//! - **Group 0**: camera uniforms (view-projection, view, position)
//! - **Group 1**: model uniforms, one 256-byte slot per draw, selected with a
//!   dynamic offset
//! - **Group 2**: sphere uniforms plus noise and matcap textures (sphere only)
//!
//! Meshes are generated lazily from each object's [`Geometry`] and cached.
//! Textures are uploaded once per [`TextureHandle::cache_key`].

use std::collections::HashMap;
use std::num::NonZeroU64;

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::controls::GizmoMode;
use crate::gpu::GpuContext;
use crate::material::{Material, SphereUniforms, SphereUniformsRaw};
use crate::mesh::{Geometry, Mesh, MeshData, Vertex3d};
use crate::render::{
    CLEAR_COLOR, FrameView, GizmoView, Pass, PassContext, RenderTarget, clear_color,
};
use crate::texture::{GpuTexture, TextureHandle, WrapMode};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniforms {
    view_proj: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    position: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ModelUniforms {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

/// Distance between model slots; the default `min_uniform_buffer_offset_alignment`.
const MODEL_STRIDE: u64 = 256;
const MODEL_SIZE: u64 = std::mem::size_of::<ModelUniforms>() as u64;

const BODY_COLOR: Vec4 = Vec4::new(0.85, 0.85, 0.85, 1.0);
const FLOOR_COLOR: Vec4 = Vec4::new(0.3, 0.3, 0.3, 1.0);

type TextureKey = (u64, WrapMode, WrapMode);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DrawKind {
    Line,
    Sphere,
}

struct Draw {
    mesh: MeshRef,
    kind: DrawKind,
    slot: u32,
}

#[derive(Clone, Copy)]
enum MeshRef {
    Cached(usize),
    Axis,
}

struct CachedMesh {
    geometry: Geometry,
    edges: bool,
    mesh: Mesh,
}

/// Renders scene objects, physics bodies and the gizmo into an HDR target.
pub struct ScenePass {
    line_pipeline: wgpu::RenderPipeline,
    sphere_pipeline: wgpu::RenderPipeline,

    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,

    model_layout: wgpu::BindGroupLayout,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_capacity: u64,

    sphere_layout: wgpu::BindGroupLayout,
    sphere_buffer: wgpu::Buffer,
    sphere_group: Option<((Option<TextureKey>, Option<TextureKey>), wgpu::BindGroup)>,
    textures: HashMap<TextureKey, GpuTexture>,
    fallback_noise: GpuTexture,
    fallback_matcap: GpuTexture,
    warned_fallback: bool,

    meshes: Vec<CachedMesh>,
    axis: Mesh,
    depth: RenderTarget,
    /// Multisampled colour buffer resolved into the pass target; `None` at 1x.
    msaa: Option<RenderTarget>,
}

impl ScenePass {
    pub fn new(gpu: &GpuContext, format: wgpu::TextureFormat, samples: u32) -> Self {
        let device = &gpu.device;
        let samples = samples.max(1);

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Camera Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                false,
                None,
            )],
        });

        let model_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Model Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                true,
                NonZeroU64::new(MODEL_SIZE),
            )],
        });

        let sphere_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sphere Material Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT, false, None),
                texture_entry(1),
                sampler_entry(2),
                texture_entry(3),
                sampler_entry(4),
            ],
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Camera Uniforms"),
            size: std::mem::size_of::<CameraUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let model_capacity = 16;
        let (model_buffer, model_bind_group) = model_storage(gpu, &model_layout, model_capacity);

        let sphere_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sphere Material Uniforms"),
            size: std::mem::size_of::<SphereUniformsRaw>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let line_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Line Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/line.wgsl").into()),
        });
        let sphere_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sphere Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/sphere.wgsl").into()),
        });

        let line_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Line Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &model_layout],
            push_constant_ranges: &[],
        });
        let sphere_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sphere Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &model_layout, &sphere_layout],
            push_constant_ranges: &[],
        });

        let line_pipeline = create_pipeline(
            gpu,
            &PipelineDesc {
                label: "Line Pipeline",
                shader: &line_shader,
                layout: &line_layout,
                format,
                topology: wgpu::PrimitiveTopology::LineList,
                blend: wgpu::BlendState::REPLACE,
                depth_write: true,
                samples,
            },
        );
        // Transparent and double-sided: no culling, no depth writes.
        let sphere_pipeline = create_pipeline(
            gpu,
            &PipelineDesc {
                label: "Sphere Pipeline",
                shader: &sphere_shader,
                layout: &sphere_pipeline_layout,
                format,
                topology: wgpu::PrimitiveTopology::TriangleList,
                blend: wgpu::BlendState::ALPHA_BLENDING,
                depth_write: false,
                samples,
            },
        );

        let axis = Mesh::new(
            gpu,
            &MeshData {
                vertices: vec![
                    Vertex3d::new([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0]),
                    Vertex3d::new([1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0]),
                ],
                indices: vec![0, 1],
            },
            "Gizmo Axis",
        );

        Self {
            line_pipeline,
            sphere_pipeline,
            camera_buffer,
            camera_bind_group,
            model_layout,
            model_buffer,
            model_bind_group,
            model_capacity,
            sphere_layout,
            sphere_buffer,
            sphere_group: None,
            textures: HashMap::new(),
            fallback_noise: GpuTexture::solid(gpu, [128, 128, 128, 255], "Fallback Noise"),
            fallback_matcap: GpuTexture::solid(gpu, [200, 200, 200, 255], "Fallback Matcap"),
            warned_fallback: false,
            meshes: Vec::new(),
            axis,
            depth: RenderTarget::depth(gpu, (gpu.width(), gpu.height()), samples, "Scene Depth"),
            msaa: (samples > 1).then(|| {
                let size = (gpu.width(), gpu.height());
                RenderTarget::with_samples(gpu, size, format, samples, "Scene MSAA Color")
            }),
        }
    }

    fn mesh_for(&mut self, gpu: &GpuContext, geometry: Geometry, edges: bool) -> usize {
        if let Some(i) = self
            .meshes
            .iter()
            .position(|m| m.geometry == geometry && m.edges == edges)
        {
            return i;
        }
        let data = if edges {
            geometry.edges()
        } else {
            geometry.triangles()
        };
        let label = if edges { "Wireframe Mesh" } else { "Solid Mesh" };
        self.meshes.push(CachedMesh {
            geometry,
            edges,
            mesh: Mesh::new(gpu, &data, label),
        });
        self.meshes.len() - 1
    }

    fn ensure_model_capacity(&mut self, gpu: &GpuContext, slots: u64) {
        if slots <= self.model_capacity {
            return;
        }
        let capacity = slots.next_power_of_two();
        let (buffer, bind_group) = model_storage(gpu, &self.model_layout, capacity);
        self.model_buffer = buffer;
        self.model_bind_group = bind_group;
        self.model_capacity = capacity;
    }

    fn upload(
        &mut self,
        gpu: &GpuContext,
        handle: Option<&TextureHandle>,
        label: &str,
    ) -> Option<TextureKey> {
        let handle = handle?;
        let key = handle.cache_key();
        self.textures
            .entry(key)
            .or_insert_with(|| GpuTexture::from_handle(gpu, handle, label));
        Some(key)
    }

    /// Upload the sphere's textures and rebuild its bind group when they change.
    fn prepare_sphere(&mut self, gpu: &GpuContext, uniforms: &SphereUniforms) {
        gpu.queue.write_buffer(
            &self.sphere_buffer,
            0,
            bytemuck::bytes_of(&SphereUniformsRaw::from(uniforms)),
        );

        let noise = self.upload(gpu, uniforms.noise.as_ref(), "Noise Texture");
        let matcap = self.upload(gpu, uniforms.matcap.as_ref(), "Matcap Texture");
        let key = (noise, matcap);
        if self.sphere_group.as_ref().is_some_and(|(k, _)| *k == key) {
            return;
        }

        if (noise.is_none() || matcap.is_none()) && !self.warned_fallback {
            tracing::warn!(
                noise = noise.is_some(),
                matcap = matcap.is_some(),
                "sphere material has empty texture slots; using fallback textures"
            );
            self.warned_fallback = true;
        }

        let noise_tex = noise
            .and_then(|k| self.textures.get(&k))
            .unwrap_or(&self.fallback_noise);
        let matcap_tex = matcap
            .and_then(|k| self.textures.get(&k))
            .unwrap_or(&self.fallback_matcap);

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sphere Material Bind Group"),
            layout: &self.sphere_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.sphere_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&noise_tex.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&noise_tex.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&matcap_tex.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(&matcap_tex.sampler),
                },
            ],
        });
        self.sphere_group = Some((key, bind_group));
    }

    /// Collect draws and their model uniforms. Lines come before the sphere
    /// so blending sees the opaque geometry behind it.
    fn collect(
        &mut self,
        gpu: &GpuContext,
        frame: &FrameView<'_>,
    ) -> (Vec<Draw>, Vec<ModelUniforms>) {
        let mut lines = Vec::new();
        let mut spheres = Vec::new();

        for object in frame.scene.objects().iter().filter(|o| o.visible) {
            let model = object.transform.matrix();
            let material = object.material.borrow();
            match &*material {
                Material::Wireframe { color } => {
                    let mesh = self.mesh_for(gpu, object.geometry, true);
                    lines.push((MeshRef::Cached(mesh), DrawKind::Line, model, *color));
                }
                Material::Sphere(uniforms) => {
                    let mesh = self.mesh_for(gpu, object.geometry, false);
                    self.prepare_sphere(gpu, uniforms);
                    spheres.push((MeshRef::Cached(mesh), DrawKind::Sphere, model, Vec4::ONE));
                }
            }
        }

        if !frame.bodies.is_empty() {
            let cube = self.mesh_for(gpu, Geometry::cube(1.0), true);
            for body in frame.bodies {
                let color = if body.is_static { FLOOR_COLOR } else { BODY_COLOR };
                lines.push((MeshRef::Cached(cube), DrawKind::Line, body.model, color));
            }
        }

        if let Some(gizmo) = frame.gizmo {
            for (model, color) in gizmo_axes(&gizmo) {
                lines.push((MeshRef::Axis, DrawKind::Line, model, color));
            }
        }

        lines
            .into_iter()
            .chain(spheres)
            .enumerate()
            .map(|(slot, (mesh, kind, model, color))| {
                (
                    Draw {
                        mesh,
                        kind,
                        slot: slot as u32,
                    },
                    ModelUniforms {
                        model: model.to_cols_array_2d(),
                        color: color.to_array(),
                    },
                )
            })
            .unzip()
    }
}

impl Pass for ScenePass {
    fn execute(
        &mut self,
        ctx: &mut PassContext<'_>,
        target: &wgpu::TextureView,
        _input: Option<&wgpu::TextureView>,
    ) {
        let gpu = ctx.gpu;
        let frame = ctx.frame;
        self.depth.ensure_size(gpu, ctx.target_size, "Scene Depth");
        if let Some(msaa) = &mut self.msaa {
            msaa.ensure_size(gpu, ctx.target_size, "Scene MSAA Color");
        }

        let camera = frame.camera;
        gpu.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniforms {
                view_proj: camera.view_projection().to_cols_array_2d(),
                view: camera.view_matrix().to_cols_array_2d(),
                position: camera.position.extend(1.0).to_array(),
            }),
        );

        let (draws, models) = self.collect(gpu, frame);
        self.ensure_model_capacity(gpu, models.len() as u64);
        if !models.is_empty() {
            let mut bytes = vec![0u8; models.len() * MODEL_STRIDE as usize];
            for (chunk, model) in bytes.chunks_exact_mut(MODEL_STRIDE as usize).zip(&models) {
                chunk[..MODEL_SIZE as usize].copy_from_slice(bytemuck::bytes_of(model));
            }
            gpu.queue.write_buffer(&self.model_buffer, 0, &bytes);
        }

        // Multisampled: draw into the MSAA buffer and resolve into the target.
        let (view, resolve_target, store) = match &self.msaa {
            Some(msaa) => (&msaa.view, Some(target), wgpu::StoreOp::Discard),
            None => (target, None, wgpu::StoreOp::Store),
        };
        let mut pass = ctx.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color(CLEAR_COLOR)),
                    store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        let mut bound = None;
        for draw in &draws {
            if bound != Some(draw.kind) {
                match draw.kind {
                    DrawKind::Line => pass.set_pipeline(&self.line_pipeline),
                    DrawKind::Sphere => {
                        let Some((_, group)) = &self.sphere_group else {
                            continue;
                        };
                        pass.set_pipeline(&self.sphere_pipeline);
                        pass.set_bind_group(2, group, &[]);
                    }
                }
                bound = Some(draw.kind);
            }

            let offset = (draw.slot as u64 * MODEL_STRIDE) as u32;
            pass.set_bind_group(1, &self.model_bind_group, &[offset]);
            match draw.mesh {
                MeshRef::Cached(i) => self.meshes[i].mesh.draw(&mut pass),
                MeshRef::Axis => self.axis.draw(&mut pass),
            }
        }
    }
}

/// Model matrices and colours for the three gizmo axes.
///
/// Axis length marks the mode: long for translate, medium for rotate, short
/// for scale. Axes brighten while dragging.
fn gizmo_axes(gizmo: &GizmoView) -> [(Mat4, Vec4); 3] {
    let length = match gizmo.mode {
        GizmoMode::Translate => 1.4,
        GizmoMode::Rotate => 1.2,
        GizmoMode::Scale => 1.1,
    };
    let boost = if gizmo.dragging { 2.5 } else { 1.0 };
    let axis = |rotation: Quat, color: Vec3| {
        (
            Mat4::from_scale_rotation_translation(Vec3::splat(length), rotation, gizmo.origin),
            (color * boost).extend(1.0),
        )
    };
    [
        axis(Quat::IDENTITY, Vec3::new(1.0, 0.2, 0.2)),
        axis(
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::new(0.2, 1.0, 0.2),
        ),
        axis(
            Quat::from_rotation_y(-std::f32::consts::FRAC_PI_2),
            Vec3::new(0.2, 0.4, 1.0),
        ),
    ]
}

struct PipelineDesc<'a> {
    label: &'a str,
    shader: &'a wgpu::ShaderModule,
    layout: &'a wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
    blend: wgpu::BlendState,
    depth_write: bool,
    samples: u32,
}

fn create_pipeline(gpu: &GpuContext, desc: &PipelineDesc<'_>) -> wgpu::RenderPipeline {
    gpu.device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(desc.label),
            layout: Some(desc.layout),
            vertex: wgpu::VertexState {
                module: desc.shader,
                entry_point: Some("vs"),
                buffers: &[Vertex3d::LAYOUT],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: desc.shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: desc.format,
                    blend: Some(desc.blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: desc.topology,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: desc.depth_write,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: desc.samples,
                ..Default::default()
            },
            multiview: None,
            cache: None,
        })
}

fn model_storage(
    gpu: &GpuContext,
    layout: &wgpu::BindGroupLayout,
    capacity: u64,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Scene Model Uniforms"),
        size: capacity * MODEL_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Scene Model Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(MODEL_SIZE),
            }),
        }],
    });
    (buffer, bind_group)
}

fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    has_dynamic_offset: bool,
    min_binding_size: Option<NonZeroU64>,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset,
            min_binding_size,
        },
        count: None,
    }
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

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_uniforms_fit_one_slot() {
        assert!(MODEL_SIZE <= MODEL_STRIDE);
        assert_eq!(std::mem::size_of::<CameraUniforms>(), 144);
    }

    #[test]
    fn gizmo_axes_point_along_world_axes() {
        let gizmo = GizmoView {
            origin: Vec3::new(1.7, 0.0, 0.0),
            mode: GizmoMode::Translate,
            dragging: false,
        };
        let axes = gizmo_axes(&gizmo);
        let tips: Vec<Vec3> = axes
            .iter()
            .map(|(m, _)| m.transform_point3(Vec3::X) - gizmo.origin)
            .collect();
        assert!((tips[0].normalize() - Vec3::X).length() < 1e-5);
        assert!((tips[1].normalize() - Vec3::Y).length() < 1e-5);
        assert!((tips[2].normalize() - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn dragging_brightens_axes() {
        let mut gizmo = GizmoView {
            origin: Vec3::ZERO,
            mode: GizmoMode::Scale,
            dragging: false,
        };
        let idle = gizmo_axes(&gizmo)[0].1;
        gizmo.dragging = true;
        let active = gizmo_axes(&gizmo)[0].1;
        assert!(active.x > idle.x);
    }
}
