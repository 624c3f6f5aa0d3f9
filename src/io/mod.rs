//! Mesh file I/O.
//!
//! Loading is where structural problems are caught: every loader goes through
//! [`build_from_triangles`](crate::mesh::build_from_triangles), so a mesh that
//! comes out of here has only in-range, non-repeating triangle indices.
//! Polygons are fan-triangulated.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | Wavefront OBJ | `.obj` | ✓ | ✓ | Positions and faces; `vt`/`vn` ignored |
//! | STL | `.stl` | ✓ | ✓ | Binary and ASCII in, binary out |
//! | PLY | `.ply` | ✓ | ✓ | ASCII and binary in, ASCII out |
//!
//! # Usage
//!
//! ```no_run
//! use geoflow::io::{load, save};
//! use geoflow::mesh::FlowMesh;
//!
//! let mesh: FlowMesh = load("bunny.obj").unwrap();
//! save(&mesh, "bunny.stl").unwrap();
//! ```

pub mod obj;
pub mod ply;
pub mod stl;

use std::path::Path;

use crate::error::{MeshError, Result};
use crate::mesh::{FlowMesh, MeshIndex};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Wavefront OBJ format.
    Obj,
    /// STL (stereolithography) format.
    Stl,
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "obj" => Some(Format::Obj),
            "stl" => Some(Format::Stl),
            "ply" => Some(Format::Ply),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }

    fn require<P: AsRef<Path>>(path: P) -> Result<Format> {
        let path = path.as_ref();
        Format::from_path(path).ok_or_else(|| MeshError::UnsupportedFormat {
            extension: path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("(none)")
                .to_string(),
        })
    }
}

/// Load a mesh from a file, picking the format from its extension.
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<FlowMesh<I>> {
    let path = path.as_ref();
    let mesh = match Format::require(path)? {
        Format::Obj => obj::load(path),
        Format::Stl => stl::load(path),
        Format::Ply => ply::load(path),
    }?;
    log::info!(
        "loaded {}: {} vertices, {} faces",
        path.display(),
        mesh.num_vertices(),
        mesh.num_faces()
    );
    Ok(mesh)
}

/// Save a mesh to a file, picking the format from its extension.
///
/// Only positions and connectivity are written.
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &FlowMesh<I>, path: P) -> Result<()> {
    let path = path.as_ref();
    match Format::require(path)? {
        Format::Obj => obj::save(mesh, path),
        Format::Stl => stl::save(mesh, path),
        Format::Ply => ply::save(mesh, path),
    }?;
    log::info!("saved {}", path.display());
    Ok(())
}

/// Split a polygon into a triangle fan around its first corner.
pub(crate) fn fan_triangulate(polygon: &[usize], faces: &mut Vec<[usize; 3]>) {
    for i in 1..polygon.len().saturating_sub(1) {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}
