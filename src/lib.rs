//! # Geoflow
//!
//! Discrete mean curvature flow on triangle meshes.
//!
//! Geoflow stores a mesh as a plain vertex array and triangle index array,
//! and every tick recomputes vertex normals and cotangent-Laplacian curvature
//! from scratch before moving each vertex one explicit Euler step along its
//! curvature normal. The surface smooths and shrinks; a sphere stays a sphere.
//!
//! ## Features
//!
//! - **Index-buffer mesh**: no adjacency structure, topology fixed at load
//! - **Type-safe indices**: 16-, 32- and 64-bit triangle indices
//! - **Parallel passes**: per-thread accumulators merged after each pass
//! - **Degeneracy-safe**: zero-area vertices and flat angles never produce NaN
//! - **File formats**: OBJ, STL, PLY
//!
//! ## Quick Start
//!
//! ```no_run
//! use geoflow::prelude::*;
//!
//! let mesh: FlowMesh = geoflow::io::load("bunny.obj").unwrap();
//! let mut driver = StepDriver::new(mesh, FlowOptions::default());
//!
//! driver.set_enabled(true);
//! loop {
//!     driver.tick();
//!     if driver.take_upload() {
//!         // copy driver.mesh() to the GPU
//!     }
//! #   break;
//! }
//! ```
//!
//! ## Running the Passes Directly
//!
//! ```
//! use geoflow::algo::curvature::{compute_curvature, CurvatureWorkspace};
//! use geoflow::algo::integrate::integrate_explicit;
//! use geoflow::algo::normals::compute_vertex_normals;
//! use geoflow::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//!
//! let faces = vec![
//!     [0, 2, 1],  // bottom
//!     [0, 1, 3],  // front
//!     [1, 2, 3],  // right
//!     [2, 0, 3],  // left
//! ];
//!
//! let mut mesh: FlowMesh = build_from_triangles(&vertices, &faces).unwrap();
//! let mut workspace = CurvatureWorkspace::for_mesh(&mesh);
//!
//! compute_vertex_normals(&mut mesh);
//! compute_curvature(&mut mesh, &mut workspace);
//! integrate_explicit(&mut mesh, 0.01, 1.0, true);
//!
//! let v = VertexId::new(3);
//! assert!(mesh.mean_curvature(v) > 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod flow;
pub mod io;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use geoflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{MeshError, Result};
    pub use crate::flow::{FlowOptions, FlowState, FlowVariant, StepDriver, StepReport};
    pub use crate::mesh::{build_from_triangles, FaceId, FlowMesh, MeshIndex, Vertex, VertexId};
}

// Re-export nalgebra types for convenience
pub use nalgebra;
