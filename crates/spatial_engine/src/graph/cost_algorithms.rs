//! Derived cost sets computed from node positions.

use glam::{Vec2, Vec3};

use super::{CompressedGraph, Edge};
use crate::constants::{DEFAULT_COST_SET, ROUNDING_PRECISION};
use crate::error::Result;

/// Cost set written by [`energy_expenditure`].
pub const ENERGY_EXPENDITURE: &str = "EnergyExpenditure";
/// Cost set written by [`cross_slope`].
pub const CROSS_SLOPE: &str = "CrossSlope";

/// Walking grades beyond this are treated as this grade.
const MAX_GRADE: f32 = 0.4;

/// Metabolic cost per metre walked at `grade` (rise over run).
pub fn energy_per_meter(grade: f32) -> f32 {
  let s = grade.clamp(-MAX_GRADE, MAX_GRADE);
  let s2 = s * s;
  let s3 = s2 * s;
  280.5 * s3 * s2 - 58.7 * s2 * s2 - 76.8 * s3 + 51.9 * s2 + 19.6 * s + 2.5
}

fn grade(from: Vec3, to: Vec3) -> f32 {
  let run = from.truncate().distance(to.truncate());
  let rise = to.z - from.z;
  if run > 0.0 {
    rise / run
  } else {
    rise.signum() * f32::INFINITY
  }
}

fn positions_of(graph: &CompressedGraph, edge: &Edge) -> Option<(Vec3, Vec3)> {
  let from = graph.nodes()[edge.parent].position;
  let to = graph.nodes()[edge.child].position;
  (from.is_finite() && to.is_finite()).then_some((from, to))
}

/// Write `"EnergyExpenditure"`: each default-set edge costs
/// `energy_per_meter(grade) * length`.
///
/// Edges touching nodes without a position get no cost.
pub fn energy_expenditure(graph: &mut CompressedGraph) -> Result<Vec<Edge>> {
  let view = &*graph;
  let edges: Vec<Edge> = view
    .edges(DEFAULT_COST_SET)?
    .iter()
    .filter_map(|edge| {
      let (from, to) = positions_of(view, edge)?;
      let cost = energy_per_meter(grade(from, to)) * from.distance(to);
      Some(Edge::new(edge.parent, edge.child, cost))
    })
    .collect();
  graph.add_costs(&edges, ENERGY_EXPENDITURE)?;
  Ok(edges)
}

/// Write `"CrossSlope"`: edge length plus the height change across the edge.
///
/// The height change is read from sibling edges of the same parent that run
/// perpendicular to the edge in plan view: with one sibling it is the height
/// difference between the child and that sibling's child, with two or more
/// it is the difference between the first two siblings' children. Edges
/// with no perpendicular sibling cost their length.
pub fn cross_slope(graph: &mut CompressedGraph) -> Result<Vec<Edge>> {
  let view = &*graph;
  let all = view.edges(DEFAULT_COST_SET)?;
  let mut out = Vec::with_capacity(all.len());

  for edge in &all {
    let Some((from, to)) = positions_of(view, edge) else {
      continue;
    };
    let heading = plan_direction(from, to);

    let siblings: Vec<f32> = view
      .outgoing(edge.parent, DEFAULT_COST_SET)?
      .into_iter()
      .filter(|s| s.child != edge.child)
      .filter_map(|s| {
        let (_, sibling) = positions_of(view, &s)?;
        let perpendicular = heading.dot(plan_direction(from, sibling)).abs() < ROUNDING_PRECISION;
        perpendicular.then_some(sibling.z)
      })
      .take(2)
      .collect();

    let rise = match siblings.as_slice() {
      [] => 0.0,
      [b] => (to.z - b).abs(),
      [b, c, ..] => (b - c).abs(),
    };
    out.push(Edge::new(edge.parent, edge.child, from.distance(to) + rise));
  }

  graph.add_costs(&out, CROSS_SLOPE)?;
  Ok(out)
}

fn plan_direction(from: Vec3, to: Vec3) -> Vec2 {
  (to.truncate() - from.truncate()).normalize_or_zero()
}
