//! Index-buffer triangle mesh with per-vertex flow attributes.
//!
//! A [`FlowMesh`] owns exactly one vertex array and one triangle array. Both
//! lengths are fixed at construction: the flow moves vertices but never adds,
//! removes or reconnects them.
//!
//! Positions are the only authoritative state. Normals and curvature are
//! derived and are overwritten from scratch by every pass that computes them.

use nalgebra::{Point3, Vector3};

use super::index::{FaceId, MeshIndex, VertexId};

/// A vertex and its per-tick derived attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Current position.
    pub position: Point3<f64>,

    /// Unit vertex normal, or zero for vertices with no usable incident face.
    pub normal: Vector3<f64>,

    /// Discrete mean-curvature normal (the cotangent Laplacian of position).
    ///
    /// Magnitude `2H`, twice the mean curvature: about `2.0` on a unit sphere,
    /// not `1.0`. It points towards the inside of convex regions. Use
    /// [`FlowMesh::mean_curvature`] for the scalar `H`. This is the physical
    /// value the integrator uses.
    pub curvature: Vector3<f64>,

    /// `curvature` multiplied by the display gain, for colour mapping only.
    ///
    /// This is what the renderer uploads. Nothing in the engine reads it.
    pub display_curvature: Vector3<f64>,
}

impl Vertex {
    /// Create a vertex at `position` with zeroed derived attributes.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: Vector3::zeros(),
            curvature: Vector3::zeros(),
            display_curvature: Vector3::zeros(),
        }
    }
}

/// A triangle mesh stored as a vertex array plus an index triple per face.
///
/// Faces are wound counter-clockwise when seen from outside; the winding
/// decides the sign of face and vertex normals.
#[derive(Debug, Clone)]
pub struct FlowMesh<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) triangles: Vec<[VertexId<I>; 3]>,
}

impl<I: MeshIndex> FlowMesh<I> {
    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.triangles.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, v: VertexId<I>) -> &Vertex {
        &self.vertices[v.index()]
    }

    /// Get a mutable vertex by ID.
    #[inline]
    pub fn vertex_mut(&mut self, v: VertexId<I>) -> &mut Vertex {
        &mut self.vertices[v.index()]
    }

    /// All vertices, in index order.
    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// All vertices, mutably. The vertex count cannot change through this.
    #[inline]
    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    /// All triangles, in face order.
    #[inline]
    pub fn triangles(&self) -> &[[VertexId<I>; 3]] {
        &self.triangles
    }

    /// Get the three vertices of a face.
    #[inline]
    pub fn face_triangle(&self, f: FaceId<I>) -> [VertexId<I>; 3] {
        self.triangles[f.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// Set the position of a vertex.
    #[inline]
    pub fn set_position(&mut self, v: VertexId<I>, pos: Point3<f64>) {
        self.vertex_mut(v).position = pos;
    }

    /// Get the normal of a vertex as of the last normal pass.
    #[inline]
    pub fn normal(&self, v: VertexId<I>) -> &Vector3<f64> {
        &self.vertex(v).normal
    }

    /// Get the mean-curvature normal of a vertex as of the last curvature pass.
    #[inline]
    pub fn curvature(&self, v: VertexId<I>) -> &Vector3<f64> {
        &self.vertex(v).curvature
    }

    /// Scalar mean curvature `H` at a vertex.
    ///
    /// The curvature vector has magnitude `2H`, so a unit sphere gives `1.0`.
    #[inline]
    pub fn mean_curvature(&self, v: VertexId<I>) -> f64 {
        self.vertex(v).curvature.norm() * 0.5
    }

    /// Iterate over all vertex IDs.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.triangles.len()).map(FaceId::new)
    }

    /// Iterate over all vertex positions.
    pub fn positions(&self) -> impl Iterator<Item = &Point3<f64>> + '_ {
        self.vertices.iter().map(|v| &v.position)
    }

    // ==================== Geometry ====================

    /// Get the positions of a face's vertices.
    #[inline]
    pub fn face_positions(&self, f: FaceId<I>) -> [Point3<f64>; 3] {
        let [v0, v1, v2] = self.face_triangle(f);
        [*self.position(v0), *self.position(v1), *self.position(v2)]
    }

    /// Unit face normal from the counter-clockwise winding.
    ///
    /// Returns zero for a face with no area.
    pub fn face_normal(&self, f: FaceId<I>) -> Vector3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        let n = (p1 - p0).cross(&(p2 - p0));
        let len = n.norm();
        if len > 1e-12 {
            n / len
        } else {
            Vector3::zeros()
        }
    }

    /// Area of a face.
    pub fn face_area(&self, f: FaceId<I>) -> f64 {
        let [p0, p1, p2] = self.face_positions(f);
        (p1 - p0).cross(&(p2 - p0)).norm() * 0.5
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    /// Axis-aligned bounding box, or `None` for a mesh without vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut iter = self.positions();
        let first = *iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), p| {
            (
                Point3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Point3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        });
        Some((min, max))
    }

    /// Average of all vertex positions.
    pub fn centroid(&self) -> Point3<f64> {
        if self.vertices.is_empty() {
            return Point3::origin();
        }
        let sum: Vector3<f64> = self.positions().map(|p| p.coords).sum();
        Point3::from(sum / self.vertices.len() as f64)
    }

    /// Largest distance from the centroid to any vertex.
    pub fn bounding_radius(&self) -> f64 {
        let c = self.centroid();
        self.positions()
            .map(|p| (p - c).norm())
            .fold(0.0, f64::max)
    }

    /// Export as plain position and index lists.
    pub fn to_face_vertex(&self) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
        let positions = self.positions().copied().collect();
        let faces = self
            .triangles
            .iter()
            .map(|t| [t[0].index(), t[1].index(), t[2].index()])
            .collect();
        (positions, faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::generators;

    #[test]
    fn test_counts_and_access() {
        let mut mesh = generators::tetrahedron();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 4);

        let v = VertexId::new(2);
        mesh.set_position(v, Point3::new(3.0, 2.0, 1.0));
        assert_eq!(*mesh.position(v), Point3::new(3.0, 2.0, 1.0));
        assert_eq!(mesh.vertex_ids().count(), 4);
        assert_eq!(mesh.face_ids().count(), 4);
    }

    #[test]
    fn test_new_vertex_has_zero_derived_fields() {
        let v = Vertex::new(Point3::new(1.0, 2.0, 3.0));
        assert_eq!(v.normal, Vector3::zeros());
        assert_eq!(v.curvature, Vector3::zeros());
        assert_eq!(v.display_curvature, Vector3::zeros());
    }

    #[test]
    fn test_mean_curvature_is_half_the_vector_length() {
        let mut mesh = generators::tetrahedron();
        let v = VertexId::new(1);
        mesh.vertex_mut(v).curvature = Vector3::new(0.0, -2.0, 0.0);
        assert_eq!(mesh.curvature(v).norm(), 2.0);
        assert_eq!(mesh.mean_curvature(v), 1.0);
    }

    #[test]
    fn test_face_geometry() {
        let mesh = generators::flat_grid(1, 1.0);
        // Two right triangles covering the unit square.
        let area = mesh.surface_area();
        assert!((area - 1.0).abs() < 1e-12, "area = {}", area);

        for f in mesh.face_ids() {
            let n = mesh.face_normal(f);
            assert!((n - Vector3::z()).norm() < 1e-12, "normal = {:?}", n);
        }
    }

    #[test]
    fn test_bounds() {
        let mesh = generators::flat_grid(2, 1.0);
        let (min, max) = mesh.bounding_box().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(2.0, 2.0, 0.0));

        let c = mesh.centroid();
        assert!((c - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-12);
        assert!((mesh.bounding_radius() - 2.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_to_face_vertex_roundtrip_indices() {
        let mesh = generators::octahedron();
        let (positions, faces) = mesh.to_face_vertex();
        assert_eq!(positions.len(), mesh.num_vertices());
        assert_eq!(faces.len(), mesh.num_faces());
        for (f, face) in mesh.face_ids().zip(&faces) {
            let t = mesh.face_triangle(f);
            assert_eq!([t[0].index(), t[1].index(), t[2].index()], *face);
        }
    }
}
