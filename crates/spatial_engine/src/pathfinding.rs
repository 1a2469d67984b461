//! Shortest paths over a compressed graph.
//!
//! Dijkstra with a binary min-heap keyed by `(distance, sequence)`: entries
//! with equal distance pop in the order they were pushed, and a node's
//! predecessor only changes on a strictly shorter distance, so results are
//! stable across runs and thread counts.
//!
//! Distances accumulate in `f64`; reported `cost_to_next` values are the
//! stored `f32` edge costs, so a path's total is exactly their sum.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use rayon::prelude::*;
use web_time::Instant;

use crate::buffer::Buffer2D;
use crate::error::{EngineError, Result};
use crate::graph::CompressedGraph;
use crate::metrics;

/// One step of a path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathMember {
  pub node: usize,
  /// Cost of the edge to the next member, `0` on the last member.
  pub cost_to_next: f32,
}

/// Ordered walk from a start node to an end node.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
  members: Vec<PathMember>,
}

impl Path {
  pub fn members(&self) -> &[PathMember] {
    &self.members
  }

  /// Node ids from start to end.
  pub fn nodes(&self) -> Vec<usize> {
    self.members.iter().map(|m| m.node).collect()
  }

  /// Number of members, at least one.
  pub fn len(&self) -> usize {
    self.members.len()
  }

  pub fn is_empty(&self) -> bool {
    self.members.is_empty()
  }

  pub fn start(&self) -> usize {
    self.members[0].node
  }

  pub fn end(&self) -> usize {
    self.members[self.members.len() - 1].node
  }

  /// Sum of every `cost_to_next`.
  pub fn total_cost(&self) -> f32 {
    self.members.iter().map(|m| m.cost_to_next).sum()
  }
}

// =============================================================================
// Search
// =============================================================================

#[derive(Clone, Copy, Debug)]
struct State {
  distance: f64,
  sequence: u64,
  node: usize,
}

impl PartialEq for State {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for State {}

impl PartialOrd for State {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for State {
  fn cmp(&self, other: &Self) -> Ordering {
    // Reversed: BinaryHeap is a max-heap
    other
      .distance
      .total_cmp(&self.distance)
      .then_with(|| other.sequence.cmp(&self.sequence))
  }
}

/// Single-source result: distances plus the edge slot used to reach each node.
struct SearchTree {
  start: usize,
  distance: Vec<f64>,
  /// `(predecessor, edge slot)` per reached node other than the start.
  parent: Vec<Option<(usize, usize)>>,
}

impl SearchTree {
  fn run(graph: &CompressedGraph, values: &[f32], start: usize) -> Self {
    let n = graph.node_count();
    let col_idx = graph.col_idx();
    let mut distance = vec![f64::INFINITY; n];
    let mut parent = vec![None; n];
    let mut settled = vec![false; n];
    let mut heap = BinaryHeap::new();
    let mut sequence = 0u64;

    distance[start] = 0.0;
    heap.push(State {
      distance: 0.0,
      sequence,
      node: start,
    });

    while let Some(State { distance: d, node, .. }) = heap.pop() {
      if settled[node] {
        continue;
      }
      settled[node] = true;

      for slot in graph.row_range(node) {
        let cost = values[slot];
        // Absent entries (-1) and other negatives are not traversable
        if !(cost >= 0.0) {
          continue;
        }
        let child = col_idx[slot];
        let next = d + cost as f64;
        if next < distance[child] {
          distance[child] = next;
          parent[child] = Some((node, slot));
          sequence += 1;
          heap.push(State {
            distance: next,
            sequence,
            node: child,
          });
        }
      }
    }

    Self {
      start,
      distance,
      parent,
    }
  }

  fn path_to(&self, end: usize, values: &[f32]) -> Option<Path> {
    if end == self.start {
      return Some(Path {
        members: vec![PathMember {
          node: end,
          cost_to_next: 0.0,
        }],
      });
    }
    self.parent[end]?;

    let mut members = vec![PathMember {
      node: end,
      cost_to_next: 0.0,
    }];
    let mut current = end;
    while let Some((prev, slot)) = self.parent[current] {
      members.push(PathMember {
        node: prev,
        cost_to_next: values[slot],
      });
      current = prev;
    }
    members.reverse();
    Some(Path { members })
  }
}

// =============================================================================
// Public API
// =============================================================================

/// Cheapest path from `start` to `end` in `cost_set`, `None` when `end` is
/// unreachable.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "pathfinding::shortest_path"))]
pub fn shortest_path(graph: &CompressedGraph, start: usize, end: usize, cost_set: &str) -> Result<Option<Path>> {
  let values = graph.cost_values(cost_set)?;
  graph.check_node(start)?;
  graph.check_node(end)?;
  let timer = Instant::now();

  let path = SearchTree::run(graph, values, start).path_to(end, values);

  let elapsed_us = timer.elapsed().as_micros() as u64;
  metrics::record(|m| m.record_pathfinding(elapsed_us, 1));
  Ok(path)
}

/// Pairwise [`shortest_path`] for `starts[i] → ends[i]`.
///
/// One search runs per distinct start, in parallel, and is shared by every
/// pair with that start.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "pathfinding::shortest_paths"))]
pub fn shortest_paths(
  graph: &CompressedGraph,
  starts: &[usize],
  ends: &[usize],
  cost_set: &str,
) -> Result<Vec<Option<Path>>> {
  if starts.len() != ends.len() {
    return Err(EngineError::LengthMismatch {
      what: "path starts and ends",
      left: starts.len(),
      right: ends.len(),
    });
  }
  let values = graph.cost_values(cost_set)?;
  for &id in starts.iter().chain(ends) {
    graph.check_node(id)?;
  }
  let timer = Instant::now();

  let mut unique = starts.to_vec();
  unique.sort_unstable();
  unique.dedup();
  let trees: HashMap<usize, SearchTree> = unique
    .into_par_iter()
    .map(|start| (start, SearchTree::run(graph, values, start)))
    .collect();

  let paths: Vec<Option<Path>> = starts
    .par_iter()
    .zip(ends.par_iter())
    .map(|(start, &end)| trees.get(start).and_then(|tree| tree.path_to(end, values)))
    .collect();

  let elapsed_us = timer.elapsed().as_micros() as u64;
  metrics::record(|m| m.record_pathfinding(elapsed_us, paths.len()));
  tracing::debug!(
    pairs = paths.len(),
    searches = trees.len(),
    elapsed_us,
    "computed batched paths"
  );
  Ok(paths)
}

/// Paths between every ordered pair of nodes; row = start, column = end.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "pathfinding::all_to_all"))]
pub fn all_to_all_paths(graph: &CompressedGraph, cost_set: &str) -> Result<Buffer2D<Option<Path>>> {
  let values = graph.cost_values(cost_set)?;
  let n = graph.node_count();
  let timer = Instant::now();

  let rows: Vec<Vec<Option<Path>>> = (0..n)
    .into_par_iter()
    .map(|start| {
      let tree = SearchTree::run(graph, values, start);
      (0..n).map(|end| tree.path_to(end, values)).collect()
    })
    .collect();

  let elapsed_us = timer.elapsed().as_micros() as u64;
  metrics::record(|m| m.record_pathfinding(elapsed_us, n * n));
  tracing::debug!(nodes = n, elapsed_us, "computed all-pairs paths");

  Buffer2D::from_rows(rows, n).ok_or(EngineError::LengthMismatch {
    what: "path rows and node count",
    left: n,
    right: n,
  })
}

/// All-pairs distances and predecessors.
///
/// `distances[(i, j)]` is the cheapest cost from `i` to `j`, `-1` when
/// unreachable. `predecessors[(i, j)]` is the node before `j` on that path,
/// `i` on the diagonal and `-1` when unreachable.
pub fn distance_and_predecessor(graph: &CompressedGraph, cost_set: &str) -> Result<(Buffer2D<f32>, Buffer2D<i32>)> {
  let values = graph.cost_values(cost_set)?;
  let n = graph.node_count();

  let rows: Vec<(Vec<f32>, Vec<i32>)> = (0..n)
    .into_par_iter()
    .map(|start| {
      let tree = SearchTree::run(graph, values, start);
      let distances = tree
        .distance
        .iter()
        .map(|&d| if d.is_finite() { d as f32 } else { -1.0 })
        .collect();
      let predecessors = (0..n)
        .map(|j| match tree.parent[j] {
          _ if j == start => start as i32,
          Some((prev, _)) => prev as i32,
          None => -1,
        })
        .collect();
      (distances, predecessors)
    })
    .collect();

  let (distances, predecessors): (Vec<Vec<f32>>, Vec<Vec<i32>>) = rows.into_iter().unzip();
  let mismatch = EngineError::LengthMismatch {
    what: "distance rows and node count",
    left: n,
    right: n,
  };
  let distances = Buffer2D::from_rows(distances, n).ok_or_else(|| mismatch.clone())?;
  let predecessors = Buffer2D::from_rows(predecessors, n).ok_or(mismatch)?;
  Ok((distances, predecessors))
}

#[cfg(test)]
#[path = "pathfinding_test.rs"]
mod pathfinding_test;
