//! Mesh construction from face-vertex lists.
//!
//! This is the only place structural problems are detected. Everything past
//! construction assumes every triangle index is in range.

use nalgebra::Point3;

use super::index::{MeshIndex, VertexId};
use super::store::{FlowMesh, Vertex};
use crate::error::{MeshError, Result};

/// Build a mesh from vertex positions and triangle faces.
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `faces` - List of triangle faces, each as [v0, v1, v2] indices, wound
///   counter-clockwise
///
/// # Errors
/// - [`MeshError::EmptyMesh`] when `faces` is empty
/// - [`MeshError::TooManyVertices`] when the index type cannot address every vertex
/// - [`MeshError::TooManyFaces`] when the index type cannot address every face
/// - [`MeshError::InvalidVertexIndex`] for an index `>= vertices.len()`
/// - [`MeshError::DegenerateFace`] for a face that repeats a vertex
///
/// Vertices that no face references are allowed; the passes leave their
/// normal and curvature at zero.
///
/// # Example
/// ```
/// use geoflow::mesh::{build_from_triangles, FlowMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh: FlowMesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<FlowMesh<I>> {
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }

    if vertices.len() > I::CAPACITY {
        return Err(MeshError::TooManyVertices {
            count: vertices.len(),
            max: I::CAPACITY,
        });
    }

    if faces.len() > I::CAPACITY {
        return Err(MeshError::TooManyFaces {
            count: faces.len(),
            max: I::CAPACITY,
        });
    }

    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= vertices.len() {
                return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
            return Err(MeshError::DegenerateFace { face: fi });
        }
    }

    let vertices: Vec<Vertex> = vertices.iter().map(|&p| Vertex::new(p)).collect();
    let triangles: Vec<[VertexId<I>; 3]> = faces
        .iter()
        .map(|f| [VertexId::new(f[0]), VertexId::new(f[1]), VertexId::new(f[2])])
        .collect();

    log::debug!(
        "built mesh: {} vertices, {} faces",
        vertices.len(),
        triangles.len()
    );

    Ok(FlowMesh {
        vertices,
        triangles,
    })
}

impl<I: MeshIndex> FlowMesh<I> {
    /// Build a mesh from vertex positions and triangle faces.
    ///
    /// See [`build_from_triangles`].
    pub fn from_triangles(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> Result<Self> {
        build_from_triangles(vertices, faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::FaceId;

    fn triangle() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_build_single_triangle() {
        let mesh: FlowMesh = build_from_triangles(&triangle(), &[[0, 1, 2]]).unwrap();
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(
            mesh.face_triangle(FaceId::new(0)),
            [VertexId::new(0), VertexId::new(1), VertexId::new(2)]
        );
    }

    #[test]
    fn test_empty_faces_rejected() {
        let result: Result<FlowMesh> = build_from_triangles(&triangle(), &[]);
        assert!(matches!(result, Err(MeshError::EmptyMesh)));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let result: Result<FlowMesh> = build_from_triangles(&triangle(), &[[0, 1, 2], [0, 2, 3]]);
        match result {
            Err(MeshError::InvalidVertexIndex { face, vertex }) => {
                assert_eq!(face, 1);
                assert_eq!(vertex, 3);
            }
            other => panic!("expected InvalidVertexIndex, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let result: Result<FlowMesh> = build_from_triangles(&triangle(), &[[0, 1, 1]]);
        assert!(matches!(result, Err(MeshError::DegenerateFace { face: 0 })));
    }

    #[test]
    fn test_index_capacity_checked() {
        let vertices = vec![Point3::origin(); u16::CAPACITY + 1];
        let result: Result<FlowMesh<u16>> = build_from_triangles(&vertices, &[[0, 1, 2]]);
        assert!(matches!(result, Err(MeshError::TooManyVertices { .. })));
    }

    #[test]
    fn test_face_capacity_checked() {
        // A closed surface has about twice as many faces as vertices, so a
        // u16 mesh can run out of face ids first.
        let sphere = crate::mesh::generators::icosphere(6, 1.0);
        let (vertices, faces) = sphere.to_face_vertex();
        assert!(vertices.len() <= u16::CAPACITY);
        assert!(faces.len() > u16::CAPACITY);

        match build_from_triangles::<u16>(&vertices, &faces) {
            Err(MeshError::TooManyFaces { count, max }) => {
                assert_eq!(count, 81920);
                assert_eq!(max, 65536);
            }
            other => panic!("expected TooManyFaces, got {:?}", other.map(|m| m.num_faces())),
        }

        let mesh: FlowMesh<u32> = build_from_triangles(&vertices, &faces).unwrap();
        assert_eq!(mesh.face_ids().count(), 81920);
    }

    #[test]
    fn test_capacity_matches_index_width() {
        assert_eq!(u16::CAPACITY, 1 << 16);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(u32::CAPACITY, 1 << 32);
        assert_eq!(u64::CAPACITY, usize::MAX);
    }

    #[test]
    fn test_unreferenced_vertex_allowed() {
        let mut vertices = triangle();
        vertices.push(Point3::new(5.0, 5.0, 5.0));
        let mesh: FlowMesh = FlowMesh::from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
    }
}
