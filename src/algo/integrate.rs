//! Explicit Euler integration of the curvature flow.
//!
//! One step moves every vertex along its current mean-curvature normal:
//!
//! ```text
//! p <- p + step_scale * K(p)
//! ```
//!
//! where `step_scale` is the elapsed time multiplied by the flow speed.
//! There is no stability guarantee: a large `step_scale` (for example after
//! the host process was paused) can push vertices past each other and fold
//! the surface. Clamp the time step upstream if that matters.

use rayon::prelude::*;

use crate::mesh::{FlowMesh, MeshIndex, Vertex};

/// Move every vertex by `step_scale * curvature`.
///
/// Also refreshes `display_curvature` as `curvature * display_gain`. The
/// physical `curvature` field is left as computed, so a reader after the step
/// sees the curvature the step was taken with.
///
/// Returns the largest distance any vertex moved.
///
/// # Example
///
/// ```
/// use geoflow::algo::curvature::{compute_curvature, CurvatureWorkspace};
/// use geoflow::algo::integrate::integrate_explicit;
/// use geoflow::mesh::generators::icosphere;
///
/// let mut mesh = icosphere(2, 1.0);
/// let mut ws = CurvatureWorkspace::for_mesh(&mesh);
/// compute_curvature(&mut mesh, &mut ws);
///
/// let area_before = mesh.surface_area();
/// integrate_explicit(&mut mesh, 0.01, 0.25, true);
/// assert!(mesh.surface_area() < area_before);
/// ```
pub fn integrate_explicit<I: MeshIndex>(
    mesh: &mut FlowMesh<I>,
    step_scale: f64,
    display_gain: f64,
    parallel: bool,
) -> f64 {
    let advance = |vertex: &mut Vertex| -> f64 {
        let delta = step_scale * vertex.curvature;
        vertex.position += delta;
        vertex.display_curvature = vertex.curvature * display_gain;
        delta.norm()
    };

    if parallel {
        mesh.vertices
            .par_iter_mut()
            .map(advance)
            .reduce(|| 0.0, f64::max)
    } else {
        mesh.vertices.iter_mut().map(advance).fold(0.0, f64::max)
    }
}

/// Refresh `display_curvature` from `curvature` without moving anything.
pub fn apply_display_gain<I: MeshIndex>(mesh: &mut FlowMesh<I>, display_gain: f64) {
    for vertex in mesh.vertices.iter_mut() {
        vertex.display_curvature = vertex.curvature * display_gain;
    }
}

/// Largest curvature magnitude on the mesh, for normalizing colour ramps.
pub fn max_curvature_norm<I: MeshIndex>(mesh: &FlowMesh<I>) -> f64 {
    mesh.vertices
        .iter()
        .map(|v| v.curvature.norm())
        .fold(0.0, f64::max)
}

/// Check that every position is finite.
///
/// A cheap way for a long batch run to notice that the flow blew up.
pub fn positions_finite<I: MeshIndex>(mesh: &FlowMesh<I>) -> bool {
    mesh.vertices
        .iter()
        .all(|v| v.position.coords.iter().all(|c| c.is_finite()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::curvature::{compute_curvature, CurvatureWorkspace};
    use crate::mesh::generators::{flat_grid, icosphere};
    use nalgebra::Point3;

    fn with_curvature(mut mesh: FlowMesh) -> FlowMesh {
        let mut ws = CurvatureWorkspace::for_mesh(&mesh);
        compute_curvature(&mut mesh, &mut ws);
        mesh
    }

    #[test]
    fn test_zero_step_is_noop() {
        let mut mesh = with_curvature(icosphere(3, 1.0));
        let before: Vec<Point3<f64>> = mesh.positions().copied().collect();

        let moved = integrate_explicit(&mut mesh, 0.0, 0.25, true);

        assert_eq!(moved, 0.0);
        for (p, q) in before.iter().zip(mesh.positions()) {
            assert_eq!(p, q);
        }
    }

    #[test]
    fn test_sphere_shrinks_uniformly() {
        let mut mesh = with_curvature(icosphere(3, 1.0));
        let dt = 0.01;
        let moved = integrate_explicit(&mut mesh, dt, 1.0, false);

        // |K| is about 2 on the unit sphere.
        assert!(moved > 0.015 && moved < 0.03, "moved = {}", moved);
        for p in mesh.positions() {
            let r = p.coords.norm();
            assert!(r < 1.0 && r > 0.97, "r = {}", r);
        }
    }

    #[test]
    fn test_display_curvature_is_separate() {
        let mut mesh = with_curvature(icosphere(2, 1.0));
        let physical: Vec<_> = mesh.vertices().iter().map(|v| v.curvature).collect();

        integrate_explicit(&mut mesh, 0.001, 0.25, true);

        for (v, k) in mesh.vertices().iter().zip(&physical) {
            assert_eq!(v.curvature, *k);
            assert!((v.display_curvature - k * 0.25).norm() < 1e-15);
        }
    }

    #[test]
    fn test_flat_interior_does_not_move() {
        let n = 4;
        let mut mesh = with_curvature(flat_grid(n, 1.0));
        let before: Vec<Point3<f64>> = mesh.positions().copied().collect();
        integrate_explicit(&mut mesh, 0.1, 1.0, true);

        for j in 1..n {
            for i in 1..n {
                let idx = j * (n + 1) + i;
                let moved = (mesh.vertices()[idx].position - before[idx]).norm();
                assert!(moved < 1e-10, "interior vertex {} moved {}", idx, moved);
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut a = with_curvature(icosphere(3, 1.0));
        let mut b = a.clone();
        let ma = integrate_explicit(&mut a, 0.02, 0.5, true);
        let mb = integrate_explicit(&mut b, 0.02, 0.5, false);
        assert_eq!(ma, mb);
        for (x, y) in a.positions().zip(b.positions()) {
            assert_eq!(x, y);
        }
    }

    #[test]
    fn test_helpers() {
        let mut mesh = with_curvature(icosphere(2, 1.0));
        apply_display_gain(&mut mesh, 2.0);
        for v in mesh.vertices() {
            assert_eq!(v.display_curvature, v.curvature * 2.0);
        }
        assert!(max_curvature_norm(&mesh) > 1.9);
        assert!(positions_finite(&mesh));

        mesh.vertices_mut()[0].position.x = f64::NAN;
        assert!(!positions_finite(&mesh));
    }
}
