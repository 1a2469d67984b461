//! Generation settings.

use glam::Vec3;

use crate::threading::CoreCount;

/// Controls how the walkable graph is grown from its seed.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorConfig {
  /// Horizontal step between candidates (`x`, `y`) and the height above the
  /// parent from which ground rays are cast (`z`).
  pub spacing: Vec3,
  /// Stop after this many parents were expanded. `None` = unlimited.
  pub max_nodes: Option<usize>,
  /// Largest climb between neighboring nodes.
  pub up_step: f32,
  /// Largest drop between neighboring nodes.
  pub down_step: f32,
  /// Steepest walkable incline, degrees.
  pub up_slope: f32,
  /// Steepest walkable decline, degrees.
  pub down_slope: f32,
  /// Offsets reach this many spacings out (1 = the 8 compass neighbors).
  pub step_connection: u32,
  /// Meshes that are never walkable.
  pub obstacle_ids: Vec<i32>,
  pub cores: CoreCount,
}

impl GeneratorConfig {
  pub const DEFAULT: Self = Self {
    spacing: Vec3::ONE,
    max_nodes: None,
    up_step: 0.2,
    down_step: 0.2,
    up_slope: 20.0,
    down_slope: 20.0,
    step_connection: 1,
    obstacle_ids: Vec::new(),
    cores: CoreCount::All,
  };

  pub fn with_spacing(mut self, spacing: Vec3) -> Self {
    self.spacing = spacing;
    self
  }

  /// Cap on expanded parents. `0` means unlimited.
  pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
    self.max_nodes = (max_nodes > 0).then_some(max_nodes);
    self
  }

  pub fn with_steps(mut self, up: f32, down: f32) -> Self {
    self.up_step = up;
    self.down_step = down;
    self
  }

  pub fn with_slopes(mut self, up: f32, down: f32) -> Self {
    self.up_slope = up;
    self.down_slope = down;
    self
  }

  pub fn with_step_connection(mut self, step_connection: u32) -> Self {
    self.step_connection = step_connection.max(1);
    self
  }

  pub fn with_obstacles(mut self, ids: impl IntoIterator<Item = i32>) -> Self {
    self.obstacle_ids = ids.into_iter().collect();
    self
  }

  pub fn with_cores(mut self, cores: CoreCount) -> Self {
    self.cores = cores;
    self
  }

  pub fn is_obstacle(&self, mesh_id: i32) -> bool {
    self.obstacle_ids.contains(&mesh_id)
  }

  /// Candidate `(dx, dy)` offsets in spacing units, sorted.
  ///
  /// The 8 compass neighbors plus every `(j, k)` with
  /// `1 <= |j|, |k| <= step_connection` and `|j| != |k|`.
  pub fn offsets(&self) -> Vec<(i32, i32)> {
    let limit = self.step_connection.max(1) as i32;
    let mut offsets: Vec<(i32, i32)> = vec![
      (-1, -1),
      (-1, 0),
      (-1, 1),
      (0, -1),
      (0, 1),
      (1, -1),
      (1, 0),
      (1, 1),
    ];
    for j in -limit..=limit {
      for k in -limit..=limit {
        if j != 0 && k != 0 && j.abs() != k.abs() {
          offsets.push((j, k));
        }
      }
    }
    offsets.sort_unstable();
    offsets.dedup();
    offsets
  }
}

impl Default for GeneratorConfig {
  fn default() -> Self {
    Self::DEFAULT
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_offsets_are_compass() {
    let offsets = GeneratorConfig::default().offsets();
    assert_eq!(offsets.len(), 8);
    assert!(!offsets.contains(&(0, 0)));
  }

  #[test]
  fn test_wider_offsets() {
    let offsets = GeneratorConfig::default().with_step_connection(2).offsets();
    // 8 compass + (±1, ±2) + (±2, ±1)
    assert_eq!(offsets.len(), 16);
    assert!(offsets.contains(&(2, -1)));
    assert!(!offsets.contains(&(2, 2)));
    assert!(offsets.windows(2).all(|w| w[0] < w[1]));
  }

  #[test]
  fn test_builders() {
    let config = GeneratorConfig::default()
      .with_max_nodes(0)
      .with_obstacles([3, 4])
      .with_cores(CoreCount::Serial);
    assert_eq!(config.max_nodes, None);
    assert!(config.is_obstacle(4));
    assert!(!config.is_obstacle(0));
    assert_eq!(GeneratorConfig::default().with_max_nodes(5).max_nodes, Some(5));
  }
}
