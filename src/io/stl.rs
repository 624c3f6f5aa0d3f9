//! STL (stereolithography) format support.
//!
//! STL stores every triangle with its own three corners. Corners with
//! bit-identical coordinates are merged back into shared vertices on load,
//! otherwise no vertex would have more than one incident face and the
//! curvature pass would see a cloud of disconnected triangles.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Read, Seek};
use std::path::Path;

use nalgebra::Point3;

use crate::algo::normals::unit_face_normal;
use crate::error::{MeshError, Result};
use crate::mesh::{build_from_triangles, FlowMesh, MeshIndex};

/// Load a mesh from an STL file.
///
/// Automatically detects binary vs ASCII format.
///
/// # Example
///
/// ```no_run
/// use geoflow::io::stl;
/// use geoflow::mesh::FlowMesh;
///
/// let mesh: FlowMesh = stl::load("model.stl").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<FlowMesh<I>> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    read(&mut file).map_err(|e| match e {
        MeshError::LoadError { message, .. } => MeshError::load(path, message),
        other => other,
    })
}

/// Read a mesh from STL data.
///
/// Triangles that collapse once their corners are merged are dropped with a
/// warning.
pub fn read<R: Read + Seek, I: MeshIndex>(reader: &mut R) -> Result<FlowMesh<I>> {
    let stl = stl_io::read_stl(reader).map_err(|e| MeshError::load("<reader>", e))?;

    let mut vertices: Vec<Point3<f64>> = Vec::new();
    let mut lookup: HashMap<[u32; 3], usize> = HashMap::new();
    let mut remap = Vec::with_capacity(stl.vertices.len());

    for v in &stl.vertices {
        let key = [v[0].to_bits(), v[1].to_bits(), v[2].to_bits()];
        let index = *lookup.entry(key).or_insert_with(|| {
            vertices.push(Point3::new(v[0] as f64, v[1] as f64, v[2] as f64));
            vertices.len() - 1
        });
        remap.push(index);
    }

    let mut faces: Vec<[usize; 3]> = Vec::with_capacity(stl.faces.len());
    let mut dropped = 0usize;
    for tri in &stl.faces {
        let [a, b, c] = [
            remap[tri.vertices[0]],
            remap[tri.vertices[1]],
            remap[tri.vertices[2]],
        ];
        if a == b || b == c || a == c {
            dropped += 1;
        } else {
            faces.push([a, b, c]);
        }
    }

    if dropped > 0 {
        log::warn!("dropped {} STL triangles with repeated corners", dropped);
    }
    if faces.is_empty() {
        return Err(MeshError::load("<reader>", "STL data contains no valid triangles"));
    }

    log::debug!(
        "merged {} STL corners into {} vertices",
        stl.vertices.len(),
        vertices.len()
    );
    build_from_triangles(&vertices, &faces)
}

/// Save a mesh to a binary STL file.
///
/// Positions are narrowed to `f32`.
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &FlowMesh<I>, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let corner = |p: &Point3<f64>| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32]);

    let triangles: Vec<stl_io::Triangle> = mesh
        .face_ids()
        .map(|f| {
            let [p0, p1, p2] = mesh.face_positions(f);
            let n = unit_face_normal(&p0, &p1, &p2);
            stl_io::Triangle {
                normal: stl_io::Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                vertices: [corner(&p0), corner(&p1), corner(&p2)],
            }
        })
        .collect();

    stl_io::write_stl(&mut writer, triangles.iter()).map_err(|e| MeshError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::generators::icosphere;
    use std::io::Cursor;

    const ASCII_TETRA: &str = "\
solid tetra
facet normal 0 0 -1
 outer loop
  vertex 0 0 0
  vertex 0.5 1 0
  vertex 1 0 0
 endloop
endfacet
facet normal 0 -1 0
 outer loop
  vertex 0 0 0
  vertex 1 0 0
  vertex 0.5 0.5 1
 endloop
endfacet
facet normal 1 0 0
 outer loop
  vertex 1 0 0
  vertex 0.5 1 0
  vertex 0.5 0.5 1
 endloop
endfacet
facet normal -1 0 0
 outer loop
  vertex 0.5 1 0
  vertex 0 0 0
  vertex 0.5 0.5 1
 endloop
endfacet
endsolid tetra
";

    #[test]
    fn test_ascii_corners_are_merged() {
        let mut cursor = Cursor::new(ASCII_TETRA.as_bytes());
        let mesh: FlowMesh = read(&mut cursor).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 4);
    }

    #[test]
    fn test_binary_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sphere.stl");
        let mesh = icosphere(2, 1.0);
        save(&mesh, &path).unwrap();

        let loaded: FlowMesh = load(&path).unwrap();
        assert_eq!(loaded.num_vertices(), mesh.num_vertices());
        assert_eq!(loaded.num_faces(), mesh.num_faces());
        assert!((loaded.surface_area() - mesh.surface_area()).abs() < 1e-4);
    }

    #[test]
    fn test_missing_file() {
        let result: Result<FlowMesh> = load("/definitely/not/here.stl");
        assert!(matches!(result, Err(MeshError::Io(_))));
    }
}
