//! Discrete mean-curvature normals.
//!
//! Every vertex receives the cotangent Laplacian of the position function,
//!
//! ```text
//! K(v) = 1 / (2 A(v)) * Σ_edges (cot α_ij) (p_j - p_i)
//! ```
//!
//! accumulated triangle by triangle: each triangle adds, for each of its three
//! edges, the cotangent of the angle opposite that edge times the edge vector
//! into both endpoints. `A(v)` is the barycentric area, one third of every
//! incident triangle. Summed over the two triangles sharing an interior edge
//! this is the familiar `(cot α + cot β)` weight.
//!
//! The result points toward the concave side of the surface and its magnitude
//! is `2H`, so a unit sphere yields vectors of length about `2` pointing at the
//! centre.
//!
//! # Degenerate Input
//!
//! - An angle whose tangent is (near) zero contributes nothing for its edge.
//! - An edge of (near) zero length makes the adjacent angles undefined; their
//!   cotangents are taken as zero.
//! - A vertex with (near) zero accumulated area gets zero curvature.
//!
//! None of these stops the pass; the result is always finite.
//!
//! # Example
//!
//! ```
//! use geoflow::algo::curvature::{compute_curvature, CurvatureWorkspace};
//! use geoflow::mesh::generators::icosphere;
//!
//! let mut mesh = icosphere(3, 1.0);
//! let mut workspace = CurvatureWorkspace::for_mesh(&mesh);
//! compute_curvature(&mut mesh, &mut workspace);
//!
//! let mean_h: f64 = mesh.vertex_ids().map(|v| mesh.mean_curvature(v)).sum::<f64>()
//!     / mesh.num_vertices() as f64;
//! assert!((mean_h - 1.0).abs() < 0.1);
//! ```
//!
//! # References
//!
//! - Meyer, M., et al. (2003). "Discrete Differential-Geometry Operators for
//!   Triangulated 2-Manifolds." Visualization and Mathematics III.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use super::normals::PARALLEL_CHUNK;
use crate::mesh::{FlowMesh, MeshIndex, Vertex, VertexId};

/// Tangents smaller than this in magnitude give a zero cotangent.
pub const TANGENT_EPSILON: f64 = 1e-10;

/// Edges shorter than this have no defined adjacent angle.
pub const EDGE_EPSILON: f64 = 1e-12;

/// Vertices with less accumulated area than this get zero curvature.
pub const AREA_EPSILON: f64 = 1e-14;

/// Per-vertex scratch space for one curvature pass.
///
/// Allocated once for a mesh and reused every tick. Both arrays are reset at
/// the start of each pass; after a pass [`areas`](Self::areas) holds the
/// barycentric area of every vertex.
#[derive(Debug, Clone, Default)]
pub struct CurvatureWorkspace {
    areas: Vec<f64>,
    sums: Vec<Vector3<f64>>,
}

impl CurvatureWorkspace {
    /// Create a workspace for `num_vertices` vertices.
    pub fn new(num_vertices: usize) -> Self {
        Self {
            areas: vec![0.0; num_vertices],
            sums: vec![Vector3::zeros(); num_vertices],
        }
    }

    /// Create a workspace sized for `mesh`.
    pub fn for_mesh<I: MeshIndex>(mesh: &FlowMesh<I>) -> Self {
        Self::new(mesh.num_vertices())
    }

    /// Number of vertices this workspace is sized for.
    #[inline]
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Check if the workspace holds no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Barycentric vertex areas from the last pass.
    #[inline]
    pub fn areas(&self) -> &[f64] {
        &self.areas
    }

    /// Sum of all vertex areas from the last pass.
    pub fn total_area(&self) -> f64 {
        self.areas.iter().sum()
    }

    /// Zero both arrays, resizing only if the vertex count changed.
    fn reset(&mut self, num_vertices: usize) {
        if self.areas.len() != num_vertices {
            log::debug!(
                "resizing curvature workspace from {} to {} vertices",
                self.areas.len(),
                num_vertices
            );
            self.areas.resize(num_vertices, 0.0);
            self.sums.resize(num_vertices, Vector3::zeros());
        }
        self.areas.fill(0.0);
        self.sums.fill(Vector3::zeros());
    }
}

/// Interior angle at `a` in triangle `(a, b, c)`, or `None` if an adjacent
/// edge has no length.
#[inline]
fn angle_at(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<f64> {
    let ab = b - a;
    let ac = c - a;
    let denom = ab.norm() * ac.norm();
    if denom < EDGE_EPSILON * EDGE_EPSILON {
        return None;
    }
    Some((ab.dot(&ac) / denom).clamp(-1.0, 1.0).acos())
}

/// `1 / tan(θ)`, or zero when the tangent is too small to divide by.
#[inline]
fn guarded_cot(angle: Option<f64>) -> f64 {
    match angle {
        Some(theta) => {
            let t = theta.tan();
            if t.abs() < TANGENT_EPSILON {
                0.0
            } else {
                1.0 / t
            }
        }
        None => 0.0,
    }
}

/// Contributions of one triangle: a curvature term per corner and the third
/// of its area each corner receives.
#[inline]
fn triangle_terms(p: [Point3<f64>; 3]) -> ([Vector3<f64>; 3], f64) {
    // cot[i] belongs to the angle at corner i, opposite edge (i+1, i+2).
    let cot = [
        guarded_cot(angle_at(&p[0], &p[1], &p[2])),
        guarded_cot(angle_at(&p[1], &p[2], &p[0])),
        guarded_cot(angle_at(&p[2], &p[0], &p[1])),
    ];

    let mut terms = [Vector3::zeros(); 3];
    for i in 0..3 {
        let a = (i + 1) % 3;
        let b = (i + 2) % 3;
        let edge = p[b] - p[a];
        terms[a] += cot[i] * edge;
        terms[b] -= cot[i] * edge;
    }

    let double_area = (p[1] - p[0]).cross(&(p[2] - p[0])).norm();
    (terms, double_area / 6.0)
}

#[inline]
fn corner_positions<I: MeshIndex>(vertices: &[Vertex], tri: &[VertexId<I>; 3]) -> [Point3<f64>; 3] {
    [
        vertices[tri[0].index()].position,
        vertices[tri[1].index()].position,
        vertices[tri[2].index()].position,
    ]
}

/// Recompute every vertex's mean-curvature normal.
///
/// Overwrites the `curvature` field of every vertex and leaves the vertex
/// areas in `workspace`. Positions are read, never written; normals are not
/// used.
///
/// Uses parallel accumulation. See [`compute_curvature_sequential`].
pub fn compute_curvature<I: MeshIndex>(mesh: &mut FlowMesh<I>, workspace: &mut CurvatureWorkspace) {
    compute_curvature_with(mesh, workspace, true);
}

/// Recompute every vertex's mean-curvature normal on the calling thread.
pub fn compute_curvature_sequential<I: MeshIndex>(
    mesh: &mut FlowMesh<I>,
    workspace: &mut CurvatureWorkspace,
) {
    compute_curvature_with(mesh, workspace, false);
}

/// Recompute every vertex's mean-curvature normal, choosing the execution
/// strategy.
///
/// The parallel path folds triangle chunks into per-thread accumulators and
/// merges them once every triangle has been visited, so no two threads ever
/// write the same slot.
pub fn compute_curvature_with<I: MeshIndex>(
    mesh: &mut FlowMesh<I>,
    workspace: &mut CurvatureWorkspace,
    parallel: bool,
) {
    let n = mesh.num_vertices();
    workspace.reset(n);

    if parallel {
        let (areas, sums) = accumulate_parallel(mesh);
        workspace.areas.copy_from_slice(&areas);
        workspace.sums.copy_from_slice(&sums);
    } else {
        for tri in &mesh.triangles {
            let (terms, area_third) = triangle_terms(corner_positions(&mesh.vertices, tri));
            for (v, term) in tri.iter().zip(terms) {
                workspace.areas[v.index()] += area_third;
                workspace.sums[v.index()] += term;
            }
        }
    }

    // Only after every triangle has been accumulated.
    for ((vertex, &area), sum) in mesh
        .vertices
        .iter_mut()
        .zip(&workspace.areas)
        .zip(&workspace.sums)
    {
        vertex.curvature = if area > AREA_EPSILON {
            sum / (2.0 * area)
        } else {
            Vector3::zeros()
        };
    }
}

fn accumulate_parallel<I: MeshIndex>(mesh: &FlowMesh<I>) -> (Vec<f64>, Vec<Vector3<f64>>) {
    let n = mesh.num_vertices();
    let vertices = &mesh.vertices;
    let empty = || (vec![0.0; n], vec![Vector3::zeros(); n]);

    mesh.triangles
        .par_chunks(PARALLEL_CHUNK)
        .fold(empty, |(mut areas, mut sums), chunk| {
            for tri in chunk {
                let (terms, area_third) = triangle_terms(corner_positions(vertices, tri));
                for (v, term) in tri.iter().zip(terms) {
                    areas[v.index()] += area_third;
                    sums[v.index()] += term;
                }
            }
            (areas, sums)
        })
        .reduce(empty, |(mut areas, mut sums), (other_areas, other_sums)| {
            for (a, b) in areas.iter_mut().zip(other_areas) {
                *a += b;
            }
            for (a, b) in sums.iter_mut().zip(other_sums) {
                *a += b;
            }
            (areas, sums)
        })
}

/// Compute mean-curvature normals into a fresh vector without touching the
/// mesh.
///
/// Convenience for one-off analysis; the flow itself uses
/// [`compute_curvature`] with a long-lived workspace.
pub fn mean_curvature_normals<I: MeshIndex>(mesh: &FlowMesh<I>) -> Vec<Vector3<f64>> {
    let mut scratch = mesh.clone();
    let mut workspace = CurvatureWorkspace::for_mesh(mesh);
    compute_curvature(&mut scratch, &mut workspace);
    scratch.vertices.iter().map(|v| v.curvature).collect()
}
