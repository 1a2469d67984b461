//! Open graph state: node table and default-set edge list.

use std::collections::{BTreeMap, HashMap};

use glam::Vec3;

use super::attributes::NodeAttributes;
use super::compressed::CompressedGraph;
use crate::constants::DEFAULT_COST_SET;
use crate::error::{EngineError, Result};
use crate::types::{round_position, Node, NodeKey, NodeType};

/// Mutable graph. Accepts default-set edges only; compress to read costs or
/// attach other cost sets.
#[derive(Clone, Debug, Default)]
pub struct GraphBuilder {
  pub(super) nodes: Vec<Node>,
  pub(super) ids: HashMap<NodeKey, usize>,
  /// Default-set edges keyed by (parent, child). Ordered so compression
  /// emits sorted rows.
  pub(super) edges: BTreeMap<(usize, usize), f32>,
  /// Non-default sets carried over from an earlier compression.
  pub(super) alt_costs: BTreeMap<String, HashMap<(usize, usize), f32>>,
  pub(super) attributes: NodeAttributes,
}

impl GraphBuilder {
  pub fn new() -> Self {
    Self::default()
  }

  /// Bulk constructor: `edges[i]` lists the children of node `i` and
  /// `costs[i]` their default-set costs.
  pub fn from_edge_lists(positions: &[Vec3], edges: &[Vec<usize>], costs: &[Vec<f32>]) -> Result<Self> {
    if edges.len() != costs.len() {
      return Err(EngineError::LengthMismatch {
        what: "edge and cost lists",
        left: edges.len(),
        right: costs.len(),
      });
    }
    let mut builder = Self::new();
    // Duplicate positions collapse onto one id
    let ids: Vec<usize> = positions
      .iter()
      .map(|&p| builder.get_or_assign_id(p, NodeType::Graph))
      .collect();
    let node_count = positions.len();
    for (parent, (children, weights)) in edges.iter().zip(costs).enumerate() {
      if children.len() != weights.len() {
        return Err(EngineError::LengthMismatch {
          what: "children and costs of one node",
          left: children.len(),
          right: weights.len(),
        });
      }
      for (&child, &cost) in children.iter().zip(weights) {
        for id in [parent, child] {
          if id >= node_count {
            return Err(EngineError::NodeOutOfRange { id, node_count });
          }
        }
        builder.edges.insert((ids[parent], ids[child]), cost);
      }
    }
    Ok(builder)
  }

  // ===========================================================================
  // Nodes
  // ===========================================================================

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  pub fn nodes(&self) -> &[Node] {
    &self.nodes
  }

  /// Id of the node at `position` (after rounding), if one exists.
  pub fn id_of(&self, position: Vec3) -> Option<usize> {
    self.ids.get(&NodeKey::from_position(position)).copied()
  }

  /// Existing id for `position`, or a new one appended to the node table.
  pub fn get_or_assign_id(&mut self, position: Vec3, node_type: NodeType) -> usize {
    let position = round_position(position);
    let key = NodeKey::from_position(position);
    if let Some(&id) = self.ids.get(&key) {
      return id;
    }
    let id = self.nodes.len();
    self.nodes.push(Node::new(position, id, node_type));
    self.ids.insert(key, id);
    id
  }

  /// Append a node even if another node already sits at `position`.
  ///
  /// Position lookups keep resolving to the first node at a position.
  pub fn push_node(&mut self, position: Vec3, node_type: NodeType) -> usize {
    let position = round_position(position);
    let id = self.nodes.len();
    self.nodes.push(Node::new(position, id, node_type));
    self.ids.entry(NodeKey::from_position(position)).or_insert(id);
    id
  }

  /// Make sure ids `0..=id` exist. Nodes created this way have no position
  /// (NaN coordinates) and cannot be looked up by position.
  fn ensure_id(&mut self, id: usize) {
    while self.nodes.len() <= id {
      let next = self.nodes.len();
      self.nodes.push(Node::new(Vec3::NAN, next, NodeType::Other));
    }
  }

  // ===========================================================================
  // Edges
  // ===========================================================================

  pub fn edge_count(&self) -> usize {
    self.edges.len()
  }

  /// Add a default-set edge between two positions. Re-adding a pair
  /// replaces its cost.
  pub fn add_edge(&mut self, parent: Vec3, child: Vec3, cost: f32) -> (usize, usize) {
    let p = self.get_or_assign_id(parent, NodeType::Graph);
    let c = self.get_or_assign_id(child, NodeType::Graph);
    self.edges.insert((p, c), cost);
    (p, c)
  }

  /// Add a default-set edge whose cost is the distance between the
  /// (rounded) endpoints.
  pub fn connect(&mut self, parent: Vec3, child: Vec3) -> (usize, usize) {
    let p = self.get_or_assign_id(parent, NodeType::Graph);
    let c = self.get_or_assign_id(child, NodeType::Graph);
    let cost = self.nodes[p].distance_to(&self.nodes[c]);
    self.edges.insert((p, c), cost);
    (p, c)
  }

  /// Add a default-set edge between ids, growing the node table if needed.
  pub fn add_edge_by_id(&mut self, parent: usize, child: usize, cost: f32) {
    self.ensure_id(parent.max(child));
    self.edges.insert((parent, child), cost);
  }

  /// [`add_edge_by_id`](Self::add_edge_by_id) with an explicit cost set.
  ///
  /// Only the default set is writable before compression.
  pub fn add_edge_to_cost_set(&mut self, parent: usize, child: usize, cost: f32, cost_set: &str) -> Result<()> {
    if cost_set != DEFAULT_COST_SET {
      return Err(EngineError::invalid_cost(
        cost_set,
        "non-default cost sets can only be written after compression",
      ));
    }
    self.add_edge_by_id(parent, child, cost);
    Ok(())
  }

  pub fn has_edge(&self, parent: usize, child: usize) -> bool {
    self.edges.contains_key(&(parent, child))
  }

  // ===========================================================================
  // Attributes
  // ===========================================================================

  pub fn add_node_attributes<S: AsRef<str>>(&mut self, ids: &[usize], name: &str, values: &[S]) -> Result<()> {
    self.attributes.add(self.nodes.len(), ids, name, values)
  }

  pub fn node_attributes(&self, name: &str) -> Vec<String> {
    self.attributes.get(name, self.nodes.len())
  }

  pub fn clear_node_attribute(&mut self, name: &str) {
    self.attributes.clear(name);
  }

  // ===========================================================================
  // State transitions
  // ===========================================================================

  /// Drop every node, edge, cost set and attribute.
  pub fn clear(&mut self) {
    *self = Self::default();
  }

  /// Freeze topology into CSR form.
  pub fn compress(self) -> CompressedGraph {
    CompressedGraph::from_builder(self)
  }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
