//! Per-node spherical view analysis.

use glam::Vec3;
use rayon::prelude::*;
use web_time::Instant;

use super::directions::spherical_distribute;
use crate::buffer::Buffer2D;
use crate::error::{EngineError, Result};
use crate::geometry::GeometryIndex;
use crate::metrics;
use crate::types::RayResult;

/// View analysis settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewConfig {
  /// Requested rays per node before FOV filtering.
  pub ray_count: usize,
  /// Degrees above the horizon.
  pub up_fov: f32,
  /// Degrees below the horizon.
  pub down_fov: f32,
  /// Eye height above each node.
  pub height: f32,
}

impl ViewConfig {
  pub const DEFAULT: Self = Self {
    ray_count: 1000,
    up_fov: 50.0,
    down_fov: 70.0,
    height: 1.7,
  };

  pub fn with_ray_count(mut self, ray_count: usize) -> Self {
    self.ray_count = ray_count;
    self
  }

  pub fn with_fov(mut self, up: f32, down: f32) -> Self {
    self.up_fov = up;
    self.down_fov = down;
    self
  }

  pub fn with_height(mut self, height: f32) -> Self {
    self.height = height;
    self
  }
}

impl Default for ViewConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

/// Per-node reduction over hit distances.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewAggregate {
  /// Number of rays that hit.
  Count = 0,
  Sum = 1,
  Average = 2,
  Max = 3,
  Min = 4,
}

impl TryFrom<i32> for ViewAggregate {
  type Error = i32;

  fn try_from(value: i32) -> std::result::Result<Self, Self::Error> {
    match value {
      0 => Ok(ViewAggregate::Count),
      1 => Ok(ViewAggregate::Sum),
      2 => Ok(ViewAggregate::Average),
      3 => Ok(ViewAggregate::Max),
      4 => Ok(ViewAggregate::Min),
      other => Err(other),
    }
  }
}

#[derive(Default)]
struct Accumulator {
  count: u32,
  sum: f64,
  min: f32,
  max: f32,
}

impl Accumulator {
  fn add(&mut self, distance: f32) {
    if self.count == 0 {
      self.min = distance;
      self.max = distance;
    } else {
      self.min = self.min.min(distance);
      self.max = self.max.max(distance);
    }
    self.count += 1;
    self.sum += distance as f64;
  }

  /// Nodes without a single hit score 0 for every aggregate.
  fn finish(&self, aggregate: ViewAggregate) -> f32 {
    if self.count == 0 {
      return 0.0;
    }
    match aggregate {
      ViewAggregate::Count => self.count as f32,
      ViewAggregate::Sum => self.sum as f32,
      ViewAggregate::Average => (self.sum / self.count as f64) as f32,
      ViewAggregate::Max => self.max,
      ViewAggregate::Min => self.min,
    }
  }
}

/// View analysis over one index with a fixed direction set.
pub struct ViewAnalysis<'a> {
  index: &'a GeometryIndex,
  config: ViewConfig,
  directions: Vec<Vec3>,
}

impl<'a> ViewAnalysis<'a> {
  pub fn new(index: &'a GeometryIndex, config: ViewConfig) -> Self {
    let directions = spherical_distribute(config.ray_count, config.up_fov, config.down_fov);
    if directions.len() < config.ray_count {
      tracing::debug!(
        requested = config.ray_count,
        realized = directions.len(),
        "view directions reduced by field of view"
      );
    }
    Self {
      index,
      config,
      directions,
    }
  }

  pub fn config(&self) -> &ViewConfig {
    &self.config
  }

  /// Directions fired from every node.
  pub fn directions(&self) -> &[Vec3] {
    &self.directions
  }

  #[inline]
  fn eye(&self, node: Vec3) -> Vec3 {
    node + Vec3::Z * self.config.height
  }

  /// Raw results: row `i` holds one [`RayResult`] per direction for node `i`.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "view::ray_results"))]
  pub fn ray_results(&self, nodes: &[Vec3]) -> Result<Buffer2D<RayResult>> {
    let timer = Instant::now();
    let cols = self.directions.len();
    let data: Vec<RayResult> = nodes
      .par_iter()
      .flat_map_iter(|&node| {
        let eye = self.eye(node);
        self
          .directions
          .iter()
          .map(move |&dir| self.index.fire_ray(eye, dir, -1.0))
      })
      .collect();

    let rays = data.len();
    let elapsed_us = timer.elapsed().as_micros() as u64;
    metrics::record(|m| m.record_view(elapsed_us, rays));
    tracing::debug!(nodes = nodes.len(), rays, elapsed_us, "view analysis (raw)");

    Buffer2D::from_vec(data, nodes.len(), cols).ok_or(EngineError::LengthMismatch {
      what: "view results and nodes x directions",
      left: rays,
      right: nodes.len() * cols,
    })
  }

  /// One score per node; misses never contribute.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "view::aggregate"))]
  pub fn aggregate(&self, nodes: &[Vec3], aggregate: ViewAggregate) -> Vec<f32> {
    let timer = Instant::now();
    let scores: Vec<f32> = nodes
      .par_iter()
      .map(|&node| {
        let eye = self.eye(node);
        let mut acc = Accumulator::default();
        for &dir in &self.directions {
          if let Some(hit) = self.index.intersect(eye, dir, -1.0) {
            acc.add(hit.distance);
          }
        }
        acc.finish(aggregate)
      })
      .collect();

    let rays = nodes.len() * self.directions.len();
    let elapsed_us = timer.elapsed().as_micros() as u64;
    metrics::record(|m| m.record_view(elapsed_us, rays));
    tracing::debug!(nodes = nodes.len(), rays, ?aggregate, elapsed_us, "view analysis (aggregate)");
    scores
  }
}

/// Fire every view direction from every node and return the raw grid plus
/// the directions used.
pub fn view_analysis_raw(
  index: &GeometryIndex,
  nodes: &[Vec3],
  config: ViewConfig,
) -> Result<(Buffer2D<RayResult>, Vec<Vec3>)> {
  let analysis = ViewAnalysis::new(index, config);
  let results = analysis.ray_results(nodes)?;
  Ok((results, analysis.directions))
}

/// Score every node with `aggregate` over its hit distances.
pub fn view_analysis_aggregate(
  index: &GeometryIndex,
  nodes: &[Vec3],
  config: ViewConfig,
  aggregate: ViewAggregate,
) -> Vec<f32> {
  ViewAnalysis::new(index, config).aggregate(nodes, aggregate)
}

#[cfg(test)]
#[path = "analysis_test.rs"]
mod analysis_test;
