//! Geometry-aware sampling lattice for computer vision over a known ground
//! plane.
//!
//! Given a camera height and a target object of known size resting on the
//! plane, the crate precomputes unit ray directions whose projections sample
//! the object a constant number of times regardless of distance, stitched
//! into a six-neighbour graph. A visibility oracle culls the lattice against
//! the camera frustum and a projection bridge turns the surviving rays into
//! pixel coordinates with a remapped neighbourhood.
//!
//! ```
//! use visualmesh::geometry::Sphere;
//! use visualmesh::mesh::Mesh;
//!
//! let ball = Sphere::new(0.1, 5.0);
//! let mesh = Mesh::generate(&ball, 1.0, 10.0, 1e-3).unwrap();
//! assert!(!mesh.rows.is_empty());
//! ```

pub mod cache;
pub mod camera;
pub mod error;
pub mod geometry;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod lens;
pub mod mesh;
pub mod op;
pub mod project;
#[cfg(feature = "extension-module")]
mod python;
pub mod visibility;

/// Floating point type used throughout the crate.
pub type Scalar = f64;

pub use cache::MeshCache;
pub use camera::CameraPose;
pub use error::{MeshError, MeshResult};
pub use lens::{Lens, LensModel, Projection};
pub use mesh::{Mesh, Node, Row};
pub use project::{project, ProjectedMesh};
pub use visibility::visible_ranges;
