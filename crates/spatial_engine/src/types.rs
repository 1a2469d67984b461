//! Core value types shared by every stage.

use glam::Vec3;

use crate::constants::{quantize, round_coord};

// =============================================================================
// RayResult
// =============================================================================

/// Outcome of a nearest-hit ray query.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayResult {
  /// Distance from the ray origin to the hit, `-1` on a miss.
  pub distance: f32,
  /// Id of the mesh that was hit, `-1` on a miss.
  pub mesh_id: i32,
}

impl RayResult {
  /// Sentinel for a ray that hit nothing.
  pub const MISS: RayResult = RayResult {
    distance: -1.0,
    mesh_id: -1,
  };

  #[inline]
  pub fn hit(distance: f32, mesh_id: i32) -> Self {
    Self { distance, mesh_id }
  }

  #[inline]
  pub fn is_hit(&self) -> bool {
    self.mesh_id >= 0 && self.distance >= 0.0
  }
}

impl Default for RayResult {
  fn default() -> Self {
    Self::MISS
  }
}

// =============================================================================
// Node
// =============================================================================

/// What a node represents.
#[repr(i32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeType {
  /// Produced by graph generation.
  #[default]
  Graph = 0,
  /// Point of interest supplied by a caller.
  Poi = 1,
  /// Anything else.
  Other = 2,
}

/// A graph vertex with a position and a dense id.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
  pub position: Vec3,
  pub id: usize,
  pub node_type: NodeType,
}

impl Node {
  pub fn new(position: Vec3, id: usize, node_type: NodeType) -> Self {
    Self {
      position,
      id,
      node_type,
    }
  }

  #[inline]
  pub fn distance_to(&self, other: &Node) -> f32 {
    self.position.distance(other.position)
  }

  /// Position as a plain float triple.
  pub fn to_array(&self) -> [f32; 3] {
    self.position.to_array()
  }
}

/// Hashable key for a position snapped to the rounding grid.
///
/// Two positions that round to the same grid point share a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
  pub x: i64,
  pub y: i64,
  pub z: i64,
}

impl NodeKey {
  #[inline]
  pub fn from_position(position: Vec3) -> Self {
    Self {
      x: quantize(position.x),
      y: quantize(position.y),
      z: quantize(position.z),
    }
  }
}

/// Round every component of a position to the rounding grid.
#[inline]
pub fn round_position(position: Vec3) -> Vec3 {
  Vec3::new(
    round_coord(position.x),
    round_coord(position.y),
    round_coord(position.z),
  )
}

// =============================================================================
// Aggregation selectors
// =============================================================================

/// Direction used when turning node attributes into edge costs.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
  /// Edge p→c takes the value stored on c.
  Outgoing = 0,
  /// Edge p→c takes the value stored on p.
  Incoming = 1,
  /// Mean of both endpoints.
  Both = 2,
}

/// Per-node reduction over edge costs.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CostAggregate {
  Sum = 0,
  Average = 1,
  Count = 2,
}

impl TryFrom<i32> for Direction {
  type Error = i32;

  fn try_from(value: i32) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(Direction::Outgoing),
      1 => Ok(Direction::Incoming),
      2 => Ok(Direction::Both),
      other => Err(other),
    }
  }
}

impl TryFrom<i32> for CostAggregate {
  type Error = i32;

  fn try_from(value: i32) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(CostAggregate::Sum),
      1 => Ok(CostAggregate::Average),
      2 => Ok(CostAggregate::Count),
      other => Err(other),
    }
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
