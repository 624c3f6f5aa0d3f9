//! Core mesh data structures.
//!
//! The mesh store is deliberately plain: one vertex array and one triangle
//! index array, both sized at construction and never resized. There is no
//! adjacency structure; every pass in [`crate::algo`] walks the triangle list
//! and scatters into per-vertex slots.
//!
//! # Index Types
//!
//! Elements are identified by type-safe wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`FaceId`] - Identifies a triangle
//!
//! Both are generic over the integer stored in the triangle list
//! ([`MeshIndex`]); `u32` is the default.
//!
//! # Construction
//!
//! ```
//! use geoflow::mesh::{FlowMesh, build_from_triangles};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let mesh: FlowMesh = build_from_triangles(&vertices, &faces).unwrap();
//! ```

mod builder;
pub mod generators;
mod index;
mod store;

pub use builder::build_from_triangles;
pub use index::{FaceId, MeshIndex, VertexId};
pub use store::{FlowMesh, Vertex};
