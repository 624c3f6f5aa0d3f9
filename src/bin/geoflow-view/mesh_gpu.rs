//! GPU mesh buffer management for the viewer.
//!
//! The vertex buffer mirrors the engine's vertex array one-to-one and is
//! rewritten in place after every flowing tick. The index buffer is written
//! once; topology never changes.

use bytemuck::{Pod, Zeroable};
use nalgebra::{Point3, Vector3};
use wgpu::util::DeviceExt;

use geoflow::mesh::{FlowMesh, MeshIndex};

/// GPU vertex with position, normal, and display curvature.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub curvature: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x3];

    /// Vertex buffer layout for wgpu.
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

fn narrow(v: &Vector3<f64>) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

/// Convert the engine's vertex array into GPU vertices.
///
/// Non-finite values are written as zero so a diverging flow shows up as
/// collapsed geometry rather than poisoning the rasterizer.
pub fn pack_vertices<I: MeshIndex>(mesh: &FlowMesh<I>) -> Vec<Vertex> {
    let finite = |a: [f32; 3]| {
        if a.iter().all(|c| c.is_finite()) {
            a
        } else {
            [0.0; 3]
        }
    };

    mesh.vertices()
        .iter()
        .map(|v| Vertex {
            position: finite(narrow(&v.position.coords)),
            normal: finite(narrow(&v.normal)),
            curvature: finite(narrow(&v.display_curvature)),
        })
        .collect()
}

/// Flatten triangle indices into a `u32` index list.
pub fn pack_indices<I: MeshIndex>(mesh: &FlowMesh<I>) -> Vec<u32> {
    mesh.triangles()
        .iter()
        .flat_map(|tri| tri.iter().map(|v| v.index() as u32))
        .collect()
}

/// Mesh data uploaded to the GPU.
pub struct GpuMesh {
    /// Vertex buffer, rewritten after each flowing tick.
    pub vertex_buffer: wgpu::Buffer,
    /// Index buffer for triangle rendering (used for both solid and wireframe).
    pub index_buffer: wgpu::Buffer,
    /// Number of indices.
    pub num_indices: u32,
    num_vertices: usize,
}

impl GpuMesh {
    /// Create GPU buffers for a mesh.
    pub fn new<I: MeshIndex>(device: &wgpu::Device, mesh: &FlowMesh<I>) -> Self {
        let vertices = pack_vertices(mesh);
        let indices = pack_indices(mesh);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Flow Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Flow Index Buffer"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::debug!(
            "uploaded {} vertices, {} indices",
            vertices.len(),
            indices.len()
        );

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
            num_vertices: vertices.len(),
        }
    }

    /// Rewrite the vertex buffer from the mesh's current state.
    ///
    /// The vertex count must match the one the buffer was created with.
    pub fn update<I: MeshIndex>(&self, queue: &wgpu::Queue, mesh: &FlowMesh<I>) {
        if mesh.num_vertices() != self.num_vertices {
            log::warn!(
                "skipping upload: mesh has {} vertices, buffer holds {}",
                mesh.num_vertices(),
                self.num_vertices
            );
            return;
        }
        let vertices = pack_vertices(mesh);
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
    }
}

/// Bounding sphere of a mesh in `f32`, for camera framing.
pub fn bounding_sphere<I: MeshIndex>(mesh: &FlowMesh<I>) -> (Point3<f32>, f32) {
    let c = mesh.centroid();
    (
        Point3::new(c.x as f32, c.y as f32, c.z as f32),
        mesh.bounding_radius() as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoflow::mesh::generators::{octahedron, tetrahedron};
    use geoflow::mesh::VertexId;

    #[test]
    fn test_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 36);
        assert_eq!(Vertex::desc().array_stride, 36);
    }

    #[test]
    fn test_pack_mirrors_vertex_array() {
        let mesh = octahedron();
        let vertices = pack_vertices(&mesh);
        assert_eq!(vertices.len(), mesh.num_vertices());
        for (gpu, v) in vertices.iter().zip(mesh.vertices()) {
            assert_eq!(gpu.position[0], v.position.x as f32);
            assert_eq!(gpu.position[2], v.position.z as f32);
        }

        let indices = pack_indices(&mesh);
        assert_eq!(indices.len(), mesh.num_faces() * 3);
        assert!(indices.iter().all(|&i| (i as usize) < mesh.num_vertices()));
    }

    #[test]
    fn test_non_finite_values_zeroed() {
        let mut mesh = tetrahedron();
        mesh.vertex_mut(VertexId::new(1)).display_curvature = Vector3::new(f64::NAN, 0.0, 1.0);
        let vertices = pack_vertices(&mesh);
        assert_eq!(vertices[1].curvature, [0.0; 3]);
    }

    #[test]
    fn test_bounding_sphere() {
        let (center, radius) = bounding_sphere(&octahedron());
        assert!(center.coords.norm() < 1e-6);
        assert!((radius - 1.0).abs() < 1e-6);
    }
}
