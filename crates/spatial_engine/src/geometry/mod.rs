//! Geometry index and ray service.
//!
//! Meshes are validated into [`Mesh`], flattened into triangles and indexed
//! by a [`Bvh`]. [`GeometryIndex`] is the read-only ray service every
//! analysis stage queries.

pub mod bounds;
pub mod bvh;
pub mod index;
pub mod mesh;
pub mod triangle;

pub use bounds::Aabb;
pub use bvh::{Bvh, BvhStats};
pub use index::{BatchShape, GeometryIndex, Hit};
pub use mesh::Mesh;
pub use triangle::Triangle;
