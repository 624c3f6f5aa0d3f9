//! Wavefront OBJ format support.
//!
//! Parsing goes through `wavefront_obj`. Only geometry is kept: texture
//! coordinates, normals, groups and materials are dropped. Polygons arrive
//! fan-triangulated, and vertex indices are per object, so each object's
//! faces are shifted by the number of vertices read before it.

use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use nalgebra::Point3;
use wavefront_obj::obj::{self, ObjSet, Primitive};

use crate::error::{MeshError, Result};
use crate::mesh::{build_from_triangles, FlowMesh, MeshIndex};

/// Load a mesh from an OBJ file.
///
/// # Example
///
/// ```no_run
/// use geoflow::io::obj;
/// use geoflow::mesh::FlowMesh;
///
/// let mesh: FlowMesh = obj::load("model.obj").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<FlowMesh<I>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    from_str(&text).map_err(|e| match e {
        MeshError::LoadError { message, .. } => MeshError::load(path, message),
        other => other,
    })
}

/// Read a mesh from OBJ text.
///
/// ```
/// use geoflow::io::obj;
/// use geoflow::mesh::FlowMesh;
///
/// let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";
/// let mesh: FlowMesh = obj::from_reader(text.as_bytes()).unwrap();
/// assert_eq!(mesh.num_faces(), 2);
/// ```
pub fn from_reader<R: Read, I: MeshIndex>(mut reader: R) -> Result<FlowMesh<I>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    from_str(&text)
}

fn from_str<I: MeshIndex>(text: &str) -> Result<FlowMesh<I>> {
    let set = obj::parse(text).map_err(|e| {
        MeshError::load("<reader>", format!("line {}: {}", e.line_number, e.message))
    })?;
    let (vertices, faces) = flatten(set);
    build_from_triangles(&vertices, &faces)
}

/// Merge every object into one vertex array and one triangle list.
fn flatten(set: ObjSet) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let mut vertices: Vec<Point3<f64>> = Vec::new();
    let mut faces: Vec<[usize; 3]> = Vec::new();

    for object in set.objects {
        let base = vertices.len();
        vertices.extend(object.vertices.iter().map(|v| Point3::new(v.x, v.y, v.z)));

        for geometry in &object.geometry {
            for shape in &geometry.shapes {
                // Points and polylines carry no surface.
                if let Primitive::Triangle(a, b, c) = &shape.primitive {
                    faces.push([base + a.0, base + b.0, base + c.0]);
                }
            }
        }
    }

    log::debug!(
        "parsed OBJ: {} vertices, {} triangles",
        vertices.len(),
        faces.len()
    );
    (vertices, faces)
}

/// Save a mesh to an OBJ file.
///
/// Writes positions and 1-based triangle indices only.
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &FlowMesh<I>, path: P) -> Result<()> {
    let file = fs::File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write(mesh, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a mesh as OBJ text.
pub fn write<W: Write, I: MeshIndex>(mesh: &FlowMesh<I>, writer: &mut W) -> Result<()> {
    writeln!(writer, "# geoflow")?;
    writeln!(
        writer,
        "# {} vertices, {} faces",
        mesh.num_vertices(),
        mesh.num_faces()
    )?;
    for p in mesh.positions() {
        writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for tri in mesh.triangles() {
        writeln!(
            writer,
            "f {} {} {}",
            tri[0].index() + 1,
            tri[1].index() + 1,
            tri[2].index() + 1
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::generators::icosphere;
    use crate::mesh::{FaceId, VertexId};

    fn read(text: &str) -> Result<FlowMesh> {
        from_reader(text.as_bytes())
    }

    #[test]
    fn test_corner_forms_and_skipped_records() {
        let text = "\
# a quad with extras
mtllib scene.mtl
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vn 0 0 1
s off
f 1/1/1 2/1/1 3/1/1 4/1/1
";
        let mesh = read(text).unwrap();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(
            mesh.face_triangle(FaceId::new(1)),
            [VertexId::new(0), VertexId::new(2), VertexId::new(3)]
        );
    }

    #[test]
    fn test_objects_share_one_vertex_array() {
        let text = "\
o first
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o second
v 0 0 1
v 1 0 1
v 0 1 1
f 4 5 6
";
        let mesh = read(text).unwrap();
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(
            mesh.face_triangle(FaceId::new(1)),
            [VertexId::new(3), VertexId::new(4), VertexId::new(5)]
        );
        assert_eq!(mesh.position(VertexId::new(3)).z, 1.0);
    }

    #[test]
    fn test_bad_input() {
        assert!(matches!(
            read("v 0 zero 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n"),
            Err(MeshError::LoadError { .. })
        ));
        assert!(read("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 9\n").is_err());
        assert!(matches!(read("# nothing\n"), Err(MeshError::EmptyMesh)));
    }

    #[test]
    fn test_load_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.obj");
        std::fs::write(&path, "v 0 zero 0\n").unwrap();

        match load::<_, u32>(&path) {
            Err(MeshError::LoadError { path: p, message }) => {
                assert_eq!(p, path);
                assert!(message.starts_with("line "));
            }
            other => panic!("expected LoadError, got {:?}", other.map(|m| m.num_faces())),
        }
    }

    #[test]
    fn test_write_then_read() {
        let mesh = icosphere(1, 1.0);
        let mut buffer = Vec::new();
        write(&mesh, &mut buffer).unwrap();

        let loaded = read(std::str::from_utf8(&buffer).unwrap()).unwrap();
        assert_eq!(loaded.triangles(), mesh.triangles());
        for (p, q) in loaded.positions().zip(mesh.positions()) {
            assert!((p - q).norm() < 1e-12);
        }
    }
}
