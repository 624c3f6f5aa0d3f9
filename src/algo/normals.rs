//! Vertex normal estimation.
//!
//! Each vertex normal is the renormalized sum of the unit normals of its
//! incident faces. Every face counts once regardless of its area or the angle
//! it subtends at the vertex, so a vertex surrounded by many small faces on one
//! side leans toward that side. This is a known approximation, kept because it
//! is cheap and matches what the flow needs for shading.
//!
//! # Example
//!
//! ```
//! use geoflow::algo::normals::compute_vertex_normals;
//! use geoflow::mesh::generators::icosphere;
//!
//! let mut mesh = icosphere(2, 1.0);
//! compute_vertex_normals(&mut mesh);
//!
//! for v in mesh.vertex_ids() {
//!     assert!((mesh.normal(v).norm() - 1.0).abs() < 1e-12);
//! }
//! ```

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::mesh::{FlowMesh, MeshIndex, Vertex, VertexId};

/// Sums below this length are treated as "no usable direction".
pub const NORMAL_EPSILON: f64 = 1e-12;

/// Triangles handed to one rayon task at a time.
pub(crate) const PARALLEL_CHUNK: usize = 1024;

/// Unit normal of the triangle `(p0, p1, p2)`, or zero for a degenerate one.
#[inline]
pub(crate) fn unit_face_normal(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Vector3<f64> {
    let n = (p1 - p0).cross(&(p2 - p0));
    let len = n.norm();
    if len > NORMAL_EPSILON {
        n / len
    } else {
        Vector3::zeros()
    }
}

/// Recompute every vertex normal from the current positions.
///
/// Overwrites the `normal` field of every vertex. Vertices whose accumulated
/// sum is near zero (unreferenced vertices, or incident faces that cancel out
/// or are all degenerate) get the zero vector.
///
/// Uses parallel accumulation. See [`compute_vertex_normals_sequential`].
pub fn compute_vertex_normals<I: MeshIndex>(mesh: &mut FlowMesh<I>) {
    compute_vertex_normals_with(mesh, true);
}

/// Recompute every vertex normal on the calling thread.
pub fn compute_vertex_normals_sequential<I: MeshIndex>(mesh: &mut FlowMesh<I>) {
    compute_vertex_normals_with(mesh, false);
}

/// Recompute every vertex normal, choosing the execution strategy.
pub fn compute_vertex_normals_with<I: MeshIndex>(mesh: &mut FlowMesh<I>, parallel: bool) {
    if parallel {
        let sums = accumulate_parallel(mesh);
        for (vertex, sum) in mesh.vertices.iter_mut().zip(sums) {
            vertex.normal = sum;
        }
    } else {
        for vertex in mesh.vertices.iter_mut() {
            vertex.normal = Vector3::zeros();
        }
        for tri in &mesh.triangles {
            let n = face_normal_of(&mesh.vertices, tri);
            for v in tri {
                mesh.vertices[v.index()].normal += n;
            }
        }
    }

    for vertex in mesh.vertices.iter_mut() {
        let len = vertex.normal.norm();
        vertex.normal = if len > NORMAL_EPSILON {
            vertex.normal / len
        } else {
            Vector3::zeros()
        };
    }
}

#[inline]
fn face_normal_of<I: MeshIndex>(vertices: &[Vertex], tri: &[VertexId<I>; 3]) -> Vector3<f64> {
    unit_face_normal(
        &vertices[tri[0].index()].position,
        &vertices[tri[1].index()].position,
        &vertices[tri[2].index()].position,
    )
}

/// Per-thread normal sums, merged after all triangles are visited.
fn accumulate_parallel<I: MeshIndex>(mesh: &FlowMesh<I>) -> Vec<Vector3<f64>> {
    let n = mesh.num_vertices();
    let vertices = &mesh.vertices;

    mesh.triangles
        .par_chunks(PARALLEL_CHUNK)
        .fold(
            || vec![Vector3::zeros(); n],
            |mut acc, chunk| {
                for tri in chunk {
                    let normal = face_normal_of(vertices, tri);
                    for v in tri {
                        acc[v.index()] += normal;
                    }
                }
                acc
            },
        )
        .reduce(
            || vec![Vector3::zeros(); n],
            |mut a, b| {
                for (x, y) in a.iter_mut().zip(b) {
                    *x += y;
                }
                a
            },
        )
}
