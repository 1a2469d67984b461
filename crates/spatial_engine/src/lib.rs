//! spatial_engine - Accessibility and visibility analysis over triangle meshes
//!
//! Engine-agnostic core: the host hands in static triangle meshes and gets
//! back navigable graphs, shortest paths, and ray-based view scores.
//!
//! # Features
//!
//! - **Geometry index**: BVH over every mesh with nearest-hit and occlusion
//!   rays, single or batched
//! - **Graph generation**: frontier expansion over walkable ground with step
//!   height, slope and obstacle limits
//! - **Multi-cost graphs**: open builder, CSR-compressed graph with named
//!   cost sets sharing one topology, node attributes
//! - **Pathfinding**: Dijkstra over any cost set, batched and all-pairs
//! - **View analysis**: Fibonacci-sphere rays from each node, aggregated or
//!   raw; visibility graphs between point sets
//!
//! # Example
//!
//! ```ignore
//! use spatial_engine::{generate, shortest_path, GeneratorConfig, GeometryIndex, Mesh};
//!
//! let floor = Mesh::from_flat("floor", 0, &vertices, &indices)?;
//! let index = GeometryIndex::from_mesh(floor)?;
//!
//! let config = GeneratorConfig::default().with_spacing(Vec3::splat(0.5));
//! if let Some(graph) = generate(&index, Vec3::new(0.0, 0.0, 1.0), config)? {
//!     let path = shortest_path(&graph, 0, graph.node_count() - 1, "Distance")?;
//! }
//! ```

pub mod buffer;
pub mod constants;
pub mod error;
pub mod types;

pub use buffer::Buffer2D;
pub use constants::{DEFAULT_COST_SET, NO_EDGE, ROUNDING_PRECISION};
pub use error::{EngineError, Result};
pub use types::{CostAggregate, Direction, Node, NodeType, RayResult};

// BVH and ray queries
pub mod geometry;
pub use geometry::{BatchShape, GeometryIndex, Hit, Mesh};

// Open/compressed graph states and cost sets
pub mod graph;
pub use graph::{CompressedGraph, CsrView, Edge, Graph, GraphBuilder, NodeAttributes};

// Frontier expansion over walkable ground
pub mod generator;
pub use generator::{generate, GenerationStats, GeneratorConfig, GraphGenerator, StepType};

pub mod pathfinding;
pub use pathfinding::{all_to_all_paths, distance_and_predecessor, shortest_path, shortest_paths, Path, PathMember};

// Ray-based view scores and line-of-sight graphs
pub mod view;
pub use view::{
  spherical_distribute, view_analysis_aggregate, view_analysis_raw, ViewAggregate, ViewAnalysis, ViewConfig,
};

pub mod visibility;
pub use visibility::VisibilityConfig;

// Worker pool selection
pub mod threading;
pub use threading::{CoreCount, WorkerPool};

pub mod metrics;

#[cfg(test)]
mod test_utils;
