//! Procedural meshes for tests, benchmarks and the `generate` command.
//!
//! All generators wind faces counter-clockwise seen from outside (or from +Z
//! for the flat grid).

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use super::index::VertexId;
use super::store::{FlowMesh, Vertex};

/// Assemble a mesh from trusted generator output.
fn assemble(positions: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> FlowMesh {
    debug_assert!(!faces.is_empty());
    debug_assert!(faces.iter().flatten().all(|&i| i < positions.len()));
    FlowMesh {
        vertices: positions.into_iter().map(Vertex::new).collect(),
        triangles: faces
            .into_iter()
            .map(|f| [VertexId::new(f[0]), VertexId::new(f[1]), VertexId::new(f[2])])
            .collect(),
    }
}

/// A flat `n x n` grid of unit cells scaled by `spacing`, in the XY plane.
///
/// Vertex `(i, j)` sits at `(i * spacing, j * spacing, 0)` and has index
/// `j * (n + 1) + i`. Each cell is split along its diagonal. `n` is raised
/// to at least one so the grid always has faces.
///
/// ```
/// use geoflow::mesh::generators::flat_grid;
///
/// let mesh = flat_grid(2, 1.0);
/// assert_eq!(mesh.num_vertices(), 9);
/// assert_eq!(mesh.num_faces(), 8);
/// ```
pub fn flat_grid(n: usize, spacing: f64) -> FlowMesh {
    let n = n.max(1);
    let mut positions = Vec::with_capacity((n + 1) * (n + 1));
    let mut faces = Vec::with_capacity(n * n * 2);

    for j in 0..=n {
        for i in 0..=n {
            positions.push(Point3::new(i as f64 * spacing, j as f64 * spacing, 0.0));
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = j * (n + 1) + i;
            let v10 = v00 + 1;
            let v01 = v00 + (n + 1);
            let v11 = v01 + 1;

            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    assemble(positions, faces)
}

/// An irregular closed tetrahedron.
pub fn tetrahedron() -> FlowMesh {
    let positions = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.5, 1.0, 0.0),
        Point3::new(0.5, 0.5, 1.0),
    ];
    let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
    assemble(positions, faces)
}

/// A regular octahedron with vertices on the unit axes.
pub fn octahedron() -> FlowMesh {
    let positions = vec![
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(-1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, -1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
        Point3::new(0.0, 0.0, -1.0),
    ];
    let faces = vec![
        [0, 2, 4],
        [2, 1, 4],
        [1, 3, 4],
        [3, 0, 4],
        [2, 0, 5],
        [1, 2, 5],
        [3, 1, 5],
        [0, 3, 5],
    ];
    assemble(positions, faces)
}

/// A geodesic sphere built by repeatedly splitting an icosahedron.
///
/// Vertex count is `10 * 4^subdivisions + 2`: 12, 42, 162, 642, 2562, ...
/// Every vertex lies exactly on the sphere of the given `radius`.
///
/// ```
/// use geoflow::mesh::generators::icosphere;
///
/// let mesh = icosphere(3, 1.0);
/// assert_eq!(mesh.num_vertices(), 642);
/// assert_eq!(mesh.num_faces(), 1280);
/// ```
pub fn icosphere(subdivisions: usize, radius: f64) -> FlowMesh {
    let phi = (1.0 + 5.0_f64.sqrt()) / 2.0;

    let mut directions: Vec<Vector3<f64>> = [
        (-1.0, phi, 0.0),
        (1.0, phi, 0.0),
        (-1.0, -phi, 0.0),
        (1.0, -phi, 0.0),
        (0.0, -1.0, phi),
        (0.0, 1.0, phi),
        (0.0, -1.0, -phi),
        (0.0, 1.0, -phi),
        (phi, 0.0, -1.0),
        (phi, 0.0, 1.0),
        (-phi, 0.0, -1.0),
        (-phi, 0.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| Vector3::new(x, y, z).normalize())
    .collect();

    let mut faces: Vec<[usize; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut split_faces = Vec::with_capacity(faces.len() * 4);
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();

        for face in &faces {
            let mut mids = [0usize; 3];
            for i in 0..3 {
                let a = face[i];
                let b = face[(i + 1) % 3];
                let key = (a.min(b), a.max(b));
                mids[i] = *midpoints.entry(key).or_insert_with(|| {
                    let mid = (directions[a] + directions[b]).normalize();
                    directions.push(mid);
                    directions.len() - 1
                });
            }

            split_faces.push([face[0], mids[0], mids[2]]);
            split_faces.push([face[1], mids[1], mids[0]]);
            split_faces.push([face[2], mids[2], mids[1]]);
            split_faces.push([mids[0], mids[1], mids[2]]);
        }

        faces = split_faces;
    }

    let positions = directions
        .into_iter()
        .map(|d| Point3::from(d * radius))
        .collect();
    assemble(positions, faces)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_grid_keeps_one_cell() {
        let mesh = flat_grid(0, 1.0);
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 2);
        assert!((mesh.surface_area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_icosphere_counts() {
        for (s, expected) in [(0, 12), (1, 42), (2, 162)] {
            let mesh = icosphere(s, 1.0);
            assert_eq!(mesh.num_vertices(), expected);
            assert_eq!(mesh.num_faces(), 20 * 4usize.pow(s as u32));
        }
    }

    #[test]
    fn test_icosphere_on_sphere_and_outward() {
        let radius = 2.5;
        let mesh = icosphere(2, radius);
        for p in mesh.positions() {
            assert!((p.coords.norm() - radius).abs() < 1e-12);
        }
        for f in mesh.face_ids() {
            let [p0, p1, p2] = mesh.face_positions(f);
            let center = (p0.coords + p1.coords + p2.coords) / 3.0;
            assert!(
                mesh.face_normal(f).dot(&center) > 0.0,
                "face {:?} is wound inward",
                f
            );
        }
    }

    #[test]
    fn test_octahedron_outward() {
        let mesh = octahedron();
        for f in mesh.face_ids() {
            let [p0, p1, p2] = mesh.face_positions(f);
            let center = (p0.coords + p1.coords + p2.coords) / 3.0;
            assert!(mesh.face_normal(f).dot(&center) > 0.0);
        }
    }

    #[test]
    fn test_tetrahedron_outward() {
        let mesh = tetrahedron();
        let c = mesh.centroid();
        for f in mesh.face_ids() {
            let [p0, p1, p2] = mesh.face_positions(f);
            let center = Point3::from((p0.coords + p1.coords + p2.coords) / 3.0);
            assert!(mesh.face_normal(f).dot(&(center - c)) > 0.0);
        }
    }
}
