//! Error types for geoflow.
//!
//! Only load-time and configuration problems are errors. The per-tick passes
//! (normals, curvature, integration) always produce a defined result and never
//! return one of these.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors raised while building, loading, saving or configuring a flow.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references a vertex index past the end of the vertex array.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face repeats one of its vertex indices.
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// The vertex count does not fit the mesh's index type.
    #[error("mesh has {count} vertices, index type holds at most {max}")]
    TooManyVertices {
        /// Number of vertices supplied.
        count: usize,
        /// Largest count the index type can address.
        max: usize,
    },

    /// The face count does not fit the mesh's index type.
    #[error("mesh has {count} faces, index type holds at most {max}")]
    TooManyFaces {
        /// Number of faces supplied.
        count: usize,
        /// Largest count the index type can address.
        max: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// The requested geometric flow has no implementation.
    #[error("flow variant {variant} is not supported")]
    UnsupportedFlow {
        /// Name of the requested variant.
        variant: &'static str,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Attach a path to a loader failure.
    pub(crate) fn load<P: Into<PathBuf>, M: std::fmt::Display>(path: P, message: M) -> Self {
        MeshError::LoadError {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
