//! Per-tick geometry passes.
//!
//! Each tick of the flow runs, in order:
//!
//! - **Normals** ([`normals`]): face-count-weighted vertex normals
//! - **Curvature** ([`curvature`]): cotangent-Laplacian mean-curvature normals
//!   over barycentric vertex areas
//! - **Integration** ([`integrate`]): one explicit Euler step along the
//!   curvature normals
//!
//! Every pass has a parallel and a sequential form. Results agree up to
//! floating-point summation order.

pub mod curvature;
pub mod integrate;
pub mod normals;
pub mod progress;

pub use progress::Progress;
