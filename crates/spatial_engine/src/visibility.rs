//! Visibility graphs: edges between points with a clear line of sight.
//!
//! Every point is raised by the observer height before testing. Points
//! whose raised position is blocked (a ceiling lower than the observer)
//! take no part in the graph.

use glam::Vec3;
use rayon::prelude::*;
use web_time::Instant;

use crate::constants::ROUNDING_PRECISION;
use crate::geometry::GeometryIndex;
use crate::graph::{CompressedGraph, GraphBuilder};
use crate::metrics;
use crate::types::NodeType;

/// Visibility graph settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibilityConfig {
  /// Observer eye height above each point.
  pub height: f32,
}

impl VisibilityConfig {
  pub const DEFAULT: Self = Self { height: 1.7 };

  pub fn with_height(mut self, height: f32) -> Self {
    self.height = height;
    self
  }
}

impl Default for VisibilityConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// True if nothing lies on the segment between `a` and `b`.
pub fn points_visible(index: &GeometryIndex, a: Vec3, b: Vec3) -> bool {
  let delta = b - a;
  !index.fire_occlusion_ray(a, delta, delta.length())
}

/// Eye position for `point`, `None` when geometry sits between the point and
/// the eye.
fn raise(index: &GeometryIndex, point: Vec3, height: f32) -> Option<Vec3> {
  let base = point + Vec3::Z * ROUNDING_PRECISION;
  (!index.fire_occlusion_ray(base, Vec3::Z, height)).then_some(point + Vec3::Z * height)
}

fn raise_all(index: &GeometryIndex, points: &[Vec3], height: f32) -> Vec<Option<Vec3>> {
  points.par_iter().map(|&p| raise(index, p, height)).collect()
}

fn into_graph(points: &[Vec3], rows: Vec<Vec<(usize, f32)>>) -> Option<CompressedGraph> {
  let mut builder = GraphBuilder::new();
  for &point in points {
    builder.push_node(point, NodeType::Graph);
  }
  for (parent, row) in rows.into_iter().enumerate() {
    for (child, cost) in row {
      builder.add_edge_by_id(parent, child, cost);
    }
  }
  (builder.edge_count() > 0).then(|| builder.compress())
}

/// Visibility between every pair of `points`.
///
/// Node `i` of the result is `points[i]`; edge costs are distances between
/// the unraised points. Undirected graphs test each unordered pair once and
/// store the edge on the lower id. `None` when no pair is visible.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "visibility::all_to_all"))]
pub fn all_to_all(
  index: &GeometryIndex,
  points: &[Vec3],
  config: VisibilityConfig,
  directed: bool,
) -> Option<CompressedGraph> {
  let timer = Instant::now();
  let eyes = raise_all(index, points, config.height);
  let n = points.len();

  let rows: Vec<Vec<(usize, f32)>> = (0..n)
    .into_par_iter()
    .map(|i| {
      let Some(a) = eyes[i] else {
        return Vec::new();
      };
      let first = if directed { 0 } else { i + 1 };
      (first..n)
        .filter(|&j| j != i)
        .filter_map(|j| {
          let b = eyes[j]?;
          points_visible(index, a, b).then(|| (j, points[i].distance(points[j])))
        })
        .collect()
    })
    .collect();

  let pairs = if directed { n * n.saturating_sub(1) } else { n * n.saturating_sub(1) / 2 };
  finish(timer, pairs, "all-to-all");
  into_graph(points, rows)
}

/// Visibility from each point of `group_a` to each point of `group_b`.
///
/// Ids `0..group_a.len()` are `group_a`, the rest are `group_b`. Edges run
/// from group A to group B only. The groups are assumed disjoint.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "visibility::group_to_group"))]
pub fn group_to_group(
  index: &GeometryIndex,
  group_a: &[Vec3],
  group_b: &[Vec3],
  config: VisibilityConfig,
) -> Option<CompressedGraph> {
  let timer = Instant::now();
  let eyes_a = raise_all(index, group_a, config.height);
  let eyes_b = raise_all(index, group_b, config.height);
  let offset = group_a.len();

  let rows: Vec<Vec<(usize, f32)>> = (0..group_a.len())
    .into_par_iter()
    .map(|i| {
      let Some(a) = eyes_a[i] else {
        return Vec::new();
      };
      (0..group_b.len())
        .filter_map(|j| {
          let b = eyes_b[j]?;
          points_visible(index, a, b).then(|| (offset + j, group_a[i].distance(group_b[j])))
        })
        .collect()
    })
    .collect();

  finish(timer, group_a.len() * group_b.len(), "group-to-group");
  let points: Vec<Vec3> = group_a.iter().chain(group_b).copied().collect();
  into_graph(&points, rows)
}

fn finish(timer: Instant, pairs: usize, kind: &'static str) {
  let elapsed_us = timer.elapsed().as_micros() as u64;
  metrics::record(|m| m.record_visibility(elapsed_us, pairs));
  tracing::debug!(kind, pairs, elapsed_us, "visibility graph");
}

#[cfg(test)]
#[path = "visibility_test.rs"]
mod visibility_test;
