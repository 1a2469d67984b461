//! Directed, multi-cost graph in two typed states.
//!
//! [`GraphBuilder`] is the open state: nodes are assigned ids and
//! default-set edges are accumulated. [`GraphBuilder::compress`] freezes the
//! topology into a [`CompressedGraph`], the only state that answers cost
//! queries or accepts other cost sets. [`Graph`] wraps both for callers that
//! hold one handle across the transition.

mod attributes;
mod builder;
pub mod cost_algorithms;
mod compressed;

pub use attributes::NodeAttributes;
pub use builder::GraphBuilder;
pub use compressed::{CompressedGraph, CsrView};

use glam::Vec3;

use crate::constants::DEFAULT_COST_SET;
use crate::error::{EngineError, Result};
use crate::types::{CostAggregate, Direction};

/// How far past the current node table a default-set edge id may reach.
///
/// Each id in the gap becomes a placeholder node, so an unbounded id would
/// allocate one node per integer below it.
pub const MAX_ID_GAP: usize = 1 << 16;

/// One weighted, directed edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
  pub parent: usize,
  pub child: usize,
  pub cost: f32,
}

impl Edge {
  pub fn new(parent: usize, child: usize, cost: f32) -> Self {
    Self { parent, child, cost }
  }
}

// =============================================================================
// Graph
// =============================================================================

/// A graph handle that is either open or compressed.
///
/// Reads that need frozen topology fail with
/// [`EngineError::NotCompressed`] while open. Adding a default-set edge to a
/// compressed graph reopens it.
#[derive(Clone, Debug)]
pub enum Graph {
  Open(GraphBuilder),
  Compressed(CompressedGraph),
}

impl Default for Graph {
  fn default() -> Self {
    Graph::Open(GraphBuilder::default())
  }
}

impl From<GraphBuilder> for Graph {
  fn from(builder: GraphBuilder) -> Self {
    Graph::Open(builder)
  }
}

impl From<CompressedGraph> for Graph {
  fn from(graph: CompressedGraph) -> Self {
    Graph::Compressed(graph)
  }
}

impl Graph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_compressed(&self) -> bool {
    matches!(self, Graph::Compressed(_))
  }

  pub fn node_count(&self) -> usize {
    match self {
      Graph::Open(b) => b.node_count(),
      Graph::Compressed(g) => g.node_count(),
    }
  }

  pub fn edge_count(&self) -> usize {
    match self {
      Graph::Open(b) => b.edge_count(),
      Graph::Compressed(g) => g.edge_count(),
    }
  }

  pub fn compressed(&self) -> Result<&CompressedGraph> {
    match self {
      Graph::Compressed(g) => Ok(g),
      Graph::Open(_) => Err(EngineError::NotCompressed),
    }
  }

  pub fn compressed_mut(&mut self) -> Result<&mut CompressedGraph> {
    match self {
      Graph::Compressed(g) => Ok(g),
      Graph::Open(_) => Err(EngineError::NotCompressed),
    }
  }

  /// Freeze topology. A no-op when already compressed.
  pub fn compress(&mut self) {
    *self = match std::mem::take(self) {
      Graph::Open(builder) => Graph::Compressed(builder.compress()),
      compressed => compressed,
    };
  }

  /// Move back to the open state, keeping cost sets and attributes.
  fn reopen(&mut self) {
    *self = match std::mem::take(self) {
      Graph::Compressed(graph) => Graph::Open(graph.into_builder()),
      open => open,
    };
  }

  /// Add an edge between ids.
  ///
  /// Default-set edges go into the open topology (reopening if needed);
  /// other sets require compressed topology that already has the pair.
  pub fn add_edge_by_id(&mut self, parent: usize, child: usize, cost: f32, cost_set: &str) -> Result<()> {
    compressed::check_cost(cost_set, cost)?;
    if cost_set == DEFAULT_COST_SET {
      let node_count = self.node_count();
      let id = parent.max(child);
      if id >= node_count + MAX_ID_GAP {
        return Err(EngineError::NodeOutOfRange { id, node_count });
      }
      self.reopen();
      if let Graph::Open(builder) = self {
        builder.add_edge_by_id(parent, child, cost);
      }
      return Ok(());
    }
    match self {
      Graph::Open(b) => b.add_edge_to_cost_set(parent, child, cost, cost_set),
      Graph::Compressed(g) => g.add_cost(parent, child, cost, cost_set),
    }
  }

  /// Add an edge between positions. Positions resolve to ids only while the
  /// graph is open, so non-default sets must use existing positions.
  pub fn add_edge_from_points(&mut self, parent: Vec3, child: Vec3, cost: f32, cost_set: &str) -> Result<()> {
    compressed::check_cost(cost_set, cost)?;
    if cost_set == DEFAULT_COST_SET {
      self.reopen();
      if let Graph::Open(builder) = self {
        builder.add_edge(parent, child, cost);
      }
      return Ok(());
    }
    match self {
      Graph::Open(_) => Err(EngineError::invalid_cost(
        cost_set,
        "non-default cost sets can only be written after compression",
      )),
      Graph::Compressed(g) => {
        let (Some(p), Some(c)) = (g.id_of(parent), g.id_of(child)) else {
          return Err(EngineError::invalid_cost(cost_set, "edge endpoints are not graph nodes"));
        };
        g.add_cost(p, c, cost, cost_set)
      }
    }
  }

  pub fn get_cost(&self, parent: usize, child: usize, cost_set: &str) -> Result<f32> {
    self.compressed()?.get_cost(parent, child, cost_set)
  }

  pub fn csr(&self, cost_set: &str) -> Result<CsrView<'_>> {
    self.compressed()?.csr(cost_set)
  }

  pub fn add_node_attributes<S: AsRef<str>>(&mut self, ids: &[usize], name: &str, values: &[S]) -> Result<()> {
    match self {
      Graph::Open(b) => b.add_node_attributes(ids, name, values),
      Graph::Compressed(g) => g.add_node_attributes(ids, name, values),
    }
  }

  pub fn node_attributes(&self, name: &str) -> Vec<String> {
    match self {
      Graph::Open(b) => b.node_attributes(name),
      Graph::Compressed(g) => g.node_attributes(name),
    }
  }

  pub fn clear_node_attribute(&mut self, name: &str) {
    match self {
      Graph::Open(b) => b.clear_node_attribute(name),
      Graph::Compressed(g) => g.clear_node_attribute(name),
    }
  }

  pub fn attrs_to_costs(&mut self, attribute: &str, new_cost_set: &str, direction: Direction) -> Result<()> {
    self.compressed_mut()?.attrs_to_costs(attribute, new_cost_set, direction)
  }

  pub fn aggregate_costs(&self, cost_set: &str, aggregate: CostAggregate, directed: bool) -> Result<Vec<f32>> {
    self.compressed()?.aggregate_costs(cost_set, aggregate, directed)
  }

  /// Drop everything and return to an empty open graph.
  pub fn clear(&mut self) {
    *self = Graph::default();
  }
}
