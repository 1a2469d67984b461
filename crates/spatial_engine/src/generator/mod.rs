//! Walkable graph generation.
//!
//! Grows a graph outward from a seed point over the indexed geometry. Each
//! expanded node casts ground rays at a fixed set of horizontal offsets;
//! every ground hit that passes the step, slope and line-of-sight checks is
//! linked to the parent in both directions and queued for expansion.
//!
//! # Determinism
//!
//! Candidate computation depends only on the parent position and the
//! read-only index. Parallel runs pop a batch from the front of the
//! frontier, compute candidates for every parent concurrently, then merge
//! them on one thread in pop order, which is exactly the serial order.

mod config;
mod unique_queue;

pub use config::GeneratorConfig;
pub use unique_queue::UniqueQueue;

use glam::Vec3;
use rayon::prelude::*;
use smallvec::SmallVec;
use web_time::Instant;

use crate::constants::GROUND_OFFSET;
use crate::error::Result;
use crate::geometry::GeometryIndex;
use crate::graph::{CompressedGraph, GraphBuilder};
use crate::metrics;
use crate::threading::WorkerPool;
use crate::types::{round_position, NodeType};

/// Parallel batches are only used once the frontier holds this many nodes.
pub const PARALLEL_BATCH_MIN: usize = 100;

/// How a candidate edge cleared the line-of-sight check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepType {
  /// Direct line of sight.
  None,
  /// Climb onto a higher node.
  Up,
  /// Step down to a lower node.
  Down,
  /// Step over a low obstruction between nodes at equal height.
  Over,
}

/// Summary of one generation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationStats {
  /// Parents whose neighbors were evaluated.
  pub expanded: usize,
  pub nodes: usize,
  pub edges: usize,
  pub elapsed_us: u64,
}

/// Accepted neighbors of one parent, with edge costs.
type Children = SmallVec<[(Vec3, f32); 8]>;

/// Graph generator bound to one index and configuration.
pub struct GraphGenerator<'a> {
  index: &'a GeometryIndex,
  config: GeneratorConfig,
  offsets: Vec<(i32, i32)>,
}

impl<'a> GraphGenerator<'a> {
  pub fn new(index: &'a GeometryIndex, config: GeneratorConfig) -> Self {
    let offsets = config.offsets();
    Self {
      index,
      config,
      offsets,
    }
  }

  pub fn config(&self) -> &GeneratorConfig {
    &self.config
  }

  /// Generate from `start`. `Ok(None)` when the start is not above walkable
  /// ground or nothing around it is reachable.
  pub fn generate(&self, start: Vec3) -> Result<Option<CompressedGraph>> {
    Ok(self.generate_with_stats(start)?.map(|(graph, _)| graph))
  }

  /// [`generate`](Self::generate) plus run statistics.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "generator::generate"))]
  pub fn generate_with_stats(&self, start: Vec3) -> Result<Option<(CompressedGraph, GenerationStats)>> {
    let pool = WorkerPool::new(self.config.cores)?;
    let timer = Instant::now();

    let Some(seed) = self.ground_below(round_position(start)) else {
      tracing::warn!(?start, "start point is not above walkable ground");
      return Ok(None);
    };

    let mut builder = GraphBuilder::new();
    builder.get_or_assign_id(seed, NodeType::Graph);
    let mut queue = UniqueQueue::new();
    queue.force_push(seed);

    let max_nodes = self.config.max_nodes.unwrap_or(usize::MAX);
    let mut expanded = 0usize;

    while !queue.is_empty() && expanded < max_nodes {
      if pool.is_parallel() && queue.len() >= PARALLEL_BATCH_MIN {
        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!("generator::batch").entered();

        let batch = queue.pop_many(max_nodes - expanded);
        let results: Vec<Children> = pool.install(|| batch.par_iter().map(|&parent| self.children(parent)).collect());
        for (parent, children) in batch.into_iter().zip(results) {
          expanded += 1;
          Self::merge(&mut builder, &mut queue, parent, children);
        }
      } else if let Some(parent) = queue.pop() {
        expanded += 1;
        let children = self.children(parent);
        Self::merge(&mut builder, &mut queue, parent, children);
      }
    }

    let elapsed_us = timer.elapsed().as_micros() as u64;
    let stats = GenerationStats {
      expanded,
      nodes: builder.node_count(),
      edges: builder.edge_count(),
      elapsed_us,
    };
    metrics::record(|m| m.record_generation(elapsed_us, stats.nodes));
    tracing::debug!(
      expanded,
      nodes = stats.nodes,
      edges = stats.edges,
      cores = ?self.config.cores,
      elapsed_us,
      "generated graph"
    );

    if stats.edges == 0 {
      tracing::warn!(?seed, "no accessible neighbors around the start point");
      return Ok(None);
    }
    Ok(Some((builder.compress(), stats)))
  }

  /// Link each accepted child to `parent` in both directions and queue it.
  fn merge(builder: &mut GraphBuilder, queue: &mut UniqueQueue, parent: Vec3, children: Children) {
    for (child, cost) in children {
      let (p, c) = builder.add_edge(parent, child, cost);
      builder.add_edge_by_id(c, p, cost);
      queue.push(child);
    }
  }

  // ===========================================================================
  // Candidate evaluation (read-only, runs on workers)
  // ===========================================================================

  /// Ground point straight below `origin`, `None` on a miss or an obstacle.
  fn ground_below(&self, origin: Vec3) -> Option<Vec3> {
    let hit = self.index.intersect(origin, Vec3::NEG_Z, -1.0)?;
    if self.config.is_obstacle(hit.mesh_id) {
      return None;
    }
    Some(round_position(hit.point))
  }

  /// Every accepted neighbor of `parent`, in offset order.
  fn children(&self, parent: Vec3) -> Children {
    let spacing = self.config.spacing;
    let mut out = Children::new();

    for &(j, k) in &self.offsets {
      let origin = round_position(Vec3::new(
        parent.x + j as f32 * spacing.x,
        parent.y + k as f32 * spacing.y,
        parent.z + spacing.z,
      ));
      let Some(child) = self.ground_below(origin) else {
        continue;
      };
      let drop = parent.z - child.z;
      let climb = child.z - parent.z;
      if !(drop < self.config.down_step && climb < self.config.up_step) {
        continue;
      }
      if self.check_connection(parent, child).is_some() {
        out.push((child, parent.distance(child)));
      }
    }
    out
  }

  /// Line-of-sight and slope test between two ground points.
  pub(crate) fn check_connection(&self, parent: Vec3, child: Vec3) -> Option<StepType> {
    let from = parent + Vec3::Z * GROUND_OFFSET;
    let to = child + Vec3::Z * GROUND_OFFSET;

    if !self.occluded(from, to) {
      let rise = child.z - parent.z;
      if rise.abs() < GROUND_OFFSET {
        return Some(StepType::None);
      }
      let run = parent.truncate().distance(child.truncate());
      let angle = rise.atan2(run).to_degrees();
      return (angle > -self.config.down_slope && angle < self.config.up_slope).then_some(StepType::None);
    }

    let (lift, step) = if parent.z > child.z {
      (self.config.down_step, StepType::Down)
    } else if parent.z < child.z {
      (self.config.up_step, StepType::Up)
    } else {
      (self.config.up_step, StepType::Over)
    };
    let raised = from + Vec3::Z * lift;
    (!self.occluded(raised, to)).then_some(step)
  }

  fn occluded(&self, from: Vec3, to: Vec3) -> bool {
    let delta = to - from;
    self.index.fire_occlusion_ray(from, delta, delta.length())
  }
}

/// Generate a graph over `index` starting at `start`.
pub fn generate(index: &GeometryIndex, start: Vec3, config: GeneratorConfig) -> Result<Option<CompressedGraph>> {
  GraphGenerator::new(index, config).generate(start)
}

#[cfg(test)]
#[path = "generator_test.rs"]
mod generator_test;
