//! Frozen CSR topology with named cost sets.
//!
//! One row-pointer array over parent ids and one column array of child ids
//! are shared by every cost set; each set is a values array aligned with the
//! column array. Columns are sorted within each row.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use glam::Vec3;

use super::attributes::NodeAttributes;
use super::builder::GraphBuilder;
use super::Edge;
use crate::constants::{DEFAULT_COST_SET, NO_EDGE};
use crate::error::{EngineError, Result};
use crate::types::{CostAggregate, Direction, Node, NodeKey};

/// Borrowed CSR arrays for one cost set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CsrView<'a> {
  /// `row_ptr[p]..row_ptr[p + 1]` indexes the edges leaving `p`.
  pub row_ptr: &'a [usize],
  /// Child id of each edge.
  pub col_idx: &'a [usize],
  /// Cost of each edge in this set, `NO_EDGE` where the set has none.
  pub values: &'a [f32],
}

impl CsrView<'_> {
  /// Number of stored entries.
  pub fn nnz(&self) -> usize {
    self.col_idx.len()
  }

  pub fn rows(&self) -> usize {
    self.row_ptr.len().saturating_sub(1)
  }
}

/// Read-mostly graph with frozen topology.
#[derive(Clone, Debug)]
pub struct CompressedGraph {
  nodes: Vec<Node>,
  ids: HashMap<NodeKey, usize>,
  row_ptr: Vec<usize>,
  col_idx: Vec<usize>,
  costs: BTreeMap<String, Vec<f32>>,
  attributes: NodeAttributes,
}

impl CompressedGraph {
  pub(super) fn from_builder(builder: GraphBuilder) -> Self {
    let GraphBuilder {
      nodes,
      ids,
      edges,
      alt_costs,
      attributes,
    } = builder;

    let node_count = nodes.len();
    let mut row_ptr = vec![0usize; node_count + 1];
    for &(parent, _) in edges.keys() {
      row_ptr[parent + 1] += 1;
    }
    for i in 0..node_count {
      row_ptr[i + 1] += row_ptr[i];
    }

    // BTreeMap order is (parent, child), so rows come out sorted
    let mut col_idx = Vec::with_capacity(edges.len());
    let mut distance = Vec::with_capacity(edges.len());
    for (&(_, child), &cost) in &edges {
      col_idx.push(child);
      distance.push(cost);
    }

    let mut graph = Self {
      nodes,
      ids,
      row_ptr,
      col_idx,
      costs: BTreeMap::new(),
      attributes,
    };
    graph.costs.insert(DEFAULT_COST_SET.to_string(), distance);

    for (name, entries) in alt_costs {
      let mut values = vec![NO_EDGE; graph.col_idx.len()];
      for ((parent, child), cost) in entries {
        if let Some(i) = graph.edge_index(parent, child) {
          values[i] = cost;
        }
      }
      graph.costs.insert(name, values);
    }
    graph
  }

  /// Reopen for edge insertion. Cost sets and attributes are kept.
  pub fn into_builder(self) -> GraphBuilder {
    let mut edges = BTreeMap::new();
    let mut alt_costs = BTreeMap::new();
    for (name, values) in &self.costs {
      let mut entries = HashMap::new();
      for parent in 0..self.nodes.len() {
        for i in self.row_range(parent) {
          if name == DEFAULT_COST_SET {
            edges.insert((parent, self.col_idx[i]), values[i]);
          } else if values[i] != NO_EDGE {
            entries.insert((parent, self.col_idx[i]), values[i]);
          }
        }
      }
      if name != DEFAULT_COST_SET {
        alt_costs.insert(name.clone(), entries);
      }
    }
    GraphBuilder {
      nodes: self.nodes,
      ids: self.ids,
      edges,
      alt_costs,
      attributes: self.attributes,
    }
  }

  // ===========================================================================
  // Topology
  // ===========================================================================

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  /// Number of edges in the shared topology.
  pub fn edge_count(&self) -> usize {
    self.col_idx.len()
  }

  pub fn nodes(&self) -> &[Node] {
    &self.nodes
  }

  pub fn node(&self, id: usize) -> Result<&Node> {
    self.nodes.get(id).ok_or(EngineError::NodeOutOfRange {
      id,
      node_count: self.nodes.len(),
    })
  }

  /// Node positions in id order.
  pub fn positions(&self) -> Vec<Vec3> {
    self.nodes.iter().map(|n| n.position).collect()
  }

  pub fn id_of(&self, position: Vec3) -> Option<usize> {
    self.ids.get(&NodeKey::from_position(position)).copied()
  }

  pub(crate) fn check_node(&self, id: usize) -> Result<()> {
    if id < self.nodes.len() {
      Ok(())
    } else {
      Err(EngineError::NodeOutOfRange {
        id,
        node_count: self.nodes.len(),
      })
    }
  }

  pub fn row_ptr(&self) -> &[usize] {
    &self.row_ptr
  }

  pub fn col_idx(&self) -> &[usize] {
    &self.col_idx
  }

  /// Edge slots leaving `parent`. Empty for unknown ids.
  #[inline]
  pub fn row_range(&self, parent: usize) -> Range<usize> {
    if parent + 1 < self.row_ptr.len() {
      self.row_ptr[parent]..self.row_ptr[parent + 1]
    } else {
      0..0
    }
  }

  /// Slot of edge `parent → child` in the shared arrays.
  pub fn edge_index(&self, parent: usize, child: usize) -> Option<usize> {
    let range = self.row_range(parent);
    let start = range.start;
    self.col_idx[range]
      .binary_search(&child)
      .ok()
      .map(|offset| start + offset)
  }

  pub fn has_edge(&self, parent: usize, child: usize, undirected: bool) -> bool {
    self.edge_index(parent, child).is_some() || (undirected && self.edge_index(child, parent).is_some())
  }

  // ===========================================================================
  // Cost sets
  // ===========================================================================

  /// Names of every cost set, default included.
  pub fn cost_set_names(&self) -> Vec<&str> {
    self.costs.keys().map(String::as_str).collect()
  }

  pub fn has_cost_set(&self, name: &str) -> bool {
    self.costs.contains_key(name)
  }

  /// Values array of `name`, aligned with [`col_idx`](Self::col_idx).
  pub fn cost_values(&self, name: &str) -> Result<&[f32]> {
    self
      .costs
      .get(name)
      .map(Vec::as_slice)
      .ok_or_else(|| EngineError::NoCost(name.to_string()))
  }

  /// CSR arrays for `name`. Repeated calls return the same arrays.
  pub fn csr(&self, name: &str) -> Result<CsrView<'_>> {
    Ok(CsrView {
      row_ptr: &self.row_ptr,
      col_idx: &self.col_idx,
      values: self.cost_values(name)?,
    })
  }

  /// Cost of `parent → child` in `name`, or `NO_EDGE` (-1) when that set has
  /// no such edge.
  pub fn get_cost(&self, parent: usize, child: usize, name: &str) -> Result<f32> {
    let values = self.cost_values(name)?;
    Ok(self.edge_index(parent, child).map_or(NO_EDGE, |i| values[i]))
  }

  /// Write one edge of a non-default set. The edge must already exist in
  /// the default set.
  pub fn add_cost(&mut self, parent: usize, child: usize, cost: f32, name: &str) -> Result<()> {
    if name == DEFAULT_COST_SET {
      return Err(EngineError::invalid_cost(
        name,
        "default costs are frozen after compression",
      ));
    }
    check_cost(name, cost)?;
    let Some(i) = self.edge_index(parent, child) else {
      return Err(EngineError::invalid_cost(
        name,
        format!("edge {parent} -> {child} does not exist in the default cost set"),
      ));
    };
    let edge_count = self.col_idx.len();
    self
      .costs
      .entry(name.to_string())
      .or_insert_with(|| vec![NO_EDGE; edge_count])[i] = cost;
    Ok(())
  }

  /// Write many edges of a non-default set. Nothing is written if any edge
  /// is missing from the topology.
  pub fn add_costs(&mut self, edges: &[Edge], name: &str) -> Result<()> {
    if name == DEFAULT_COST_SET {
      return Err(EngineError::invalid_cost(
        name,
        "default costs are frozen after compression",
      ));
    }
    let slots = edges
      .iter()
      .map(|e| {
        check_cost(name, e.cost)?;
        self.edge_index(e.parent, e.child).ok_or_else(|| {
          EngineError::invalid_cost(
            name,
            format!("edge {} -> {} does not exist in the default cost set", e.parent, e.child),
          )
        })
      })
      .collect::<Result<Vec<usize>>>()?;
    let edge_count = self.col_idx.len();
    let values = self
      .costs
      .entry(name.to_string())
      .or_insert_with(|| vec![NO_EDGE; edge_count]);
    for (slot, edge) in slots.into_iter().zip(edges) {
      values[slot] = edge.cost;
    }
    Ok(())
  }

  /// Delete a non-default cost set.
  pub fn clear_cost_set(&mut self, name: &str) -> Result<()> {
    if name == DEFAULT_COST_SET {
      return Err(EngineError::invalid_cost(name, "the default cost set cannot be deleted"));
    }
    self
      .costs
      .remove(name)
      .map(|_| ())
      .ok_or_else(|| EngineError::NoCost(name.to_string()))
  }

  // ===========================================================================
  // Edge listings
  // ===========================================================================

  /// Every edge that has a value in `name`, in CSR order.
  pub fn edges(&self, name: &str) -> Result<Vec<Edge>> {
    let values = self.cost_values(name)?;
    let mut out = Vec::with_capacity(values.len());
    for parent in 0..self.nodes.len() {
      for i in self.row_range(parent) {
        if values[i] != NO_EDGE {
          out.push(Edge::new(parent, self.col_idx[i], values[i]));
        }
      }
    }
    Ok(out)
  }

  /// Edges leaving `node` in `name`.
  pub fn outgoing(&self, node: usize, name: &str) -> Result<Vec<Edge>> {
    self.check_node(node)?;
    let values = self.cost_values(name)?;
    Ok(
      self
        .row_range(node)
        .filter(|&i| values[i] != NO_EDGE)
        .map(|i| Edge::new(node, self.col_idx[i], values[i]))
        .collect(),
    )
  }

  /// Edges touching `node` in either direction, reported as leaving `node`.
  /// A neighbor connected both ways appears once, with the outgoing cost.
  pub fn undirected_edges(&self, node: usize, name: &str) -> Result<Vec<Edge>> {
    let mut out = self.outgoing(node, name)?;
    let values = self.cost_values(name)?;
    for parent in 0..self.nodes.len() {
      if parent == node {
        continue;
      }
      if let Some(i) = self.edge_index(parent, node) {
        if values[i] != NO_EDGE && !out.iter().any(|e| e.child == parent) {
          out.push(Edge::new(node, parent, values[i]));
        }
      }
    }
    Ok(out)
  }

  // ===========================================================================
  // Aggregation
  // ===========================================================================

  /// Per-node reduction over edge costs in `name`.
  ///
  /// `directed = true` counts only edges arriving at a node; `false` counts
  /// both arriving and leaving edges.
  pub fn aggregate_costs(&self, name: &str, aggregate: CostAggregate, directed: bool) -> Result<Vec<f32>> {
    let values = self.cost_values(name)?;
    let mut sums = vec![0.0f64; self.nodes.len()];
    let mut counts = vec![0u32; self.nodes.len()];

    for parent in 0..self.nodes.len() {
      for i in self.row_range(parent) {
        let cost = values[i];
        if cost == NO_EDGE {
          continue;
        }
        let child = self.col_idx[i];
        sums[child] += cost as f64;
        counts[child] += 1;
        if !directed {
          sums[parent] += cost as f64;
          counts[parent] += 1;
        }
      }
    }

    Ok(
      sums
        .into_iter()
        .zip(counts)
        .map(|(sum, count)| match aggregate {
          CostAggregate::Sum => sum as f32,
          CostAggregate::Count => count as f32,
          CostAggregate::Average if count == 0 => 0.0,
          CostAggregate::Average => (sum / count as f64) as f32,
        })
        .collect(),
    )
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

  pub fn attributes(&self) -> &NodeAttributes {
    &self.attributes
  }

  /// Turn a numeric node attribute into the cost set `new_cost_set`.
  ///
  /// For each default-set edge `p → c` the cost is the value on `c`
  /// (outgoing), on `p` (incoming) or their mean (both). Edges whose
  /// endpoint values are empty get no cost in the new set. Values must
  /// parse as non-negative numbers.
  pub fn attrs_to_costs(&mut self, attribute: &str, new_cost_set: &str, direction: Direction) -> Result<()> {
    if new_cost_set == DEFAULT_COST_SET {
      return Err(EngineError::invalid_cost(
        new_cost_set,
        "attributes cannot overwrite the default cost set",
      ));
    }
    if !self.attributes.has_entries(attribute) {
      return Err(EngineError::MissingAttribute(attribute.to_string()));
    }

    let parse = |node: usize| -> Result<Option<f32>> {
      match self.attributes.value(attribute, node) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<f32>() {
          Ok(value) if value >= 0.0 => Ok(Some(value)),
          _ => Err(EngineError::InvalidAttributeValue {
            name: attribute.to_string(),
            node,
            value: raw.to_string(),
          }),
        },
      }
    };

    let mut values = vec![NO_EDGE; self.col_idx.len()];
    for parent in 0..self.nodes.len() {
      for i in self.row_range(parent) {
        let child = self.col_idx[i];
        let cost = match direction {
          Direction::Outgoing => parse(child)?,
          Direction::Incoming => parse(parent)?,
          Direction::Both => match (parse(parent)?, parse(child)?) {
            (Some(a), Some(b)) => Some((a + b) / 2.0),
            _ => None,
          },
        };
        if let Some(cost) = cost {
          values[i] = cost;
        }
      }
    }

    self.costs.insert(new_cost_set.to_string(), values);
    Ok(())
  }
}

/// Stored costs must be non-negative numbers; a negative value would read
/// back as [`NO_EDGE`].
pub(crate) fn check_cost(cost_set: &str, cost: f32) -> Result<()> {
  if cost >= 0.0 {
    return Ok(());
  }
  Err(EngineError::invalid_cost(
    cost_set,
    format!("cost {cost} is not a non-negative number"),
  ))
}

#[cfg(test)]
#[path = "compressed_test.rs"]
mod compressed_test;
