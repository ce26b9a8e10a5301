//! Geometry descriptors, vertex data and spatial transforms.
//!
//! - [`Geometry`] describes a primitive (box or sphere) by its parameters.
//! - [`MeshData`] is the CPU-side vertex/index data generated from it.
//! - [`Mesh`] is the same data uploaded to GPU buffers.
//! - [`Transform`] places an object in the world.
//!
//! # Vertex Layout
//!
//! | Attribute | Format    | Offset | Shader Location |
//! |-----------|-----------|--------|-----------------|
//! | position  | Float32x3 | 0      | 0               |
//! | normal    | Float32x3 | 12     | 1               |
//! | uv        | Float32x2 | 24     | 2               |

use glam::{Mat4, Quat, Vec3};

use crate::gpu::GpuContext;

/// A vertex with position, normal, and texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex3d {
    /// The wgpu vertex buffer layout for this vertex type.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Parametric description of an object's shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Geometry {
    /// Axis-aligned box centred on the origin.
    Box { width: f32, height: f32, depth: f32 },
    /// UV sphere centred on the origin.
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
}

impl Geometry {
    pub fn cube(size: f32) -> Self {
        Geometry::Box {
            width: size,
            height: size,
            depth: size,
        }
    }

    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        Geometry::Sphere {
            radius,
            width_segments: width_segments.max(3),
            height_segments: height_segments.max(2),
        }
    }

    /// Triangle mesh for solid rendering.
    pub fn triangles(&self) -> MeshData {
        match *self {
            Geometry::Box {
                width,
                height,
                depth,
            } => box_triangles(Vec3::new(width, height, depth) * 0.5),
            Geometry::Sphere {
                radius,
                width_segments,
                height_segments,
            } => sphere_triangles(radius, width_segments, height_segments),
        }
    }

    /// Line-list mesh of the geometry's edges, for wireframe rendering.
    ///
    /// Boxes yield their 12 edges; spheres yield every triangle edge.
    pub fn edges(&self) -> MeshData {
        match *self {
            Geometry::Box {
                width,
                height,
                depth,
            } => box_edges(Vec3::new(width, height, depth) * 0.5),
            Geometry::Sphere { .. } => {
                let tris = self.triangles();
                let indices = tris
                    .indices
                    .chunks_exact(3)
                    .flat_map(|t| [t[0], t[1], t[1], t[2], t[2], t[0]])
                    .collect();
                MeshData {
                    vertices: tris.vertices,
                    indices,
                }
            }
        }
    }
}

/// CPU-side mesh data.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

fn box_triangles(h: Vec3) -> MeshData {
    // (normal, u axis, v axis) per face; corners are built from the axes.
    let faces = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    ];

    let mut data = MeshData::default();
    for (normal, u, v) in faces {
        let base = data.vertices.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = (normal + u * su + v * sv) * h;
            data.vertices.push(Vertex3d::new(
                p.to_array(),
                normal.to_array(),
                [(su + 1.0) * 0.5, (1.0 - sv) * 0.5],
            ));
        }
        data.indices
            .extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    data
}

fn box_edges(h: Vec3) -> MeshData {
    let mut vertices = Vec::with_capacity(8);
    for i in 0..8u32 {
        let sign = |bit: u32| if i & bit != 0 { 1.0 } else { -1.0 };
        let p = Vec3::new(sign(1), sign(2), sign(4)) * h;
        vertices.push(Vertex3d::new(
            p.to_array(),
            p.normalize_or_zero().to_array(),
            [0.0, 0.0],
        ));
    }

    // Corners differing in exactly one bit share an edge.
    let mut indices = Vec::with_capacity(24);
    for a in 0..8u32 {
        for bit in [1, 2, 4] {
            let b = a | bit;
            if b != a {
                indices.push(a);
                indices.push(b);
            }
        }
    }

    MeshData { vertices, indices }
}

fn sphere_triangles(radius: f32, segments: u32, rings: u32) -> MeshData {
    let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
    let mut indices = Vec::with_capacity((segments * rings * 6) as usize);

    for ring in 0..=rings {
        let phi = std::f32::consts::PI * ring as f32 / rings as f32;
        let y = phi.cos();
        let ring_radius = phi.sin();

        for seg in 0..=segments {
            let theta = 2.0 * std::f32::consts::PI * seg as f32 / segments as f32;
            let x = ring_radius * theta.cos();
            let z = ring_radius * theta.sin();

            let position = [x * radius, y * radius, z * radius];
            let normal = [x, y, z];
            let uv = [seg as f32 / segments as f32, ring as f32 / rings as f32];

            vertices.push(Vertex3d::new(position, normal, uv));
        }
    }

    for ring in 0..rings {
        for seg in 0..segments {
            let current = ring * (segments + 1) + seg;
            let next = current + segments + 1;

            indices.extend_from_slice(&[current, next, current + 1]);
            indices.extend_from_slice(&[current + 1, next, next + 1]);
        }
    }

    MeshData { vertices, indices }
}

/// GPU-resident mesh geometry.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
}

impl Mesh {
    pub fn new(gpu: &GpuContext, data: &MeshData, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertex Buffer")),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Index Buffer")),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: data.indices.len() as u32,
        }
    }

    /// Bind buffers and issue the indexed draw.
    pub fn draw(&self, pass: &mut wgpu::RenderPass) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Position, rotation, and scale of an object.
///
/// Converted to a matrix in Scale → Rotate → Translate order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_has_24_vertices_and_12_triangles() {
        let mesh = Geometry::cube(0.35).triangles();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        for v in &mesh.vertices {
            for c in v.position {
                assert!((c.abs() - 0.175).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn box_faces_wind_counter_clockwise() {
        let mesh = Geometry::cube(1.0).triangles();
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] =
                [tri[0], tri[1], tri[2]].map(|i| Vec3::from(mesh.vertices[i as usize].position));
            let face_normal = (b - a).cross(c - a).normalize();
            let stored = Vec3::from(mesh.vertices[tri[0] as usize].normal);
            assert!(face_normal.dot(stored) > 0.99);
        }
    }

    #[test]
    fn box_edges_are_the_twelve_cube_edges() {
        let mesh = Geometry::cube(2.0).edges();
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.indices.len(), 24);
        for pair in mesh.indices.chunks_exact(2) {
            let a = Vec3::from(mesh.vertices[pair[0] as usize].position);
            let b = Vec3::from(mesh.vertices[pair[1] as usize].position);
            assert!((a.distance(b) - 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn sphere_vertices_lie_on_radius() {
        let mesh = Geometry::sphere(1.0, 32, 32).triangles();
        assert_eq!(mesh.vertices.len(), 33 * 33);
        assert_eq!(mesh.indices.len(), 32 * 32 * 6);
        for v in &mesh.vertices {
            assert!((Vec3::from(v.position).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn transform_matrix_applies_translation() {
        let t = Transform::from_position(Vec3::new(1.7, 0.0, 0.0));
        assert_eq!(t.matrix().transform_point3(Vec3::ZERO), Vec3::new(1.7, 0.0, 0.0));
    }
}
