//! Test utilities: synthetic scenes built from plain vertex/index arrays.
//!
//! Every builder returns validated [`Mesh`]es so tests exercise the same
//! construction path as callers.

use glam::Vec3;

use crate::geometry::{GeometryIndex, Mesh};

// =============================================================================
// Mesh builders
// =============================================================================

/// Horizontal square centered on the origin at height `z`.
pub fn plane(half_extent: f32, z: f32, id: i32) -> Mesh {
  let h = half_extent;
  let vertices = vec![
    Vec3::new(-h, -h, z),
    Vec3::new(h, -h, z),
    Vec3::new(h, h, z),
    Vec3::new(-h, h, z),
  ];
  Mesh::new(format!("plane_{id}"), id, vertices, &[0, 1, 2, 0, 2, 3]).unwrap()
}

/// Axis-aligned closed box.
pub fn cuboid(min: Vec3, max: Vec3, id: i32) -> Mesh {
  let vertices = vec![
    Vec3::new(min.x, min.y, min.z),
    Vec3::new(max.x, min.y, min.z),
    Vec3::new(max.x, max.y, min.z),
    Vec3::new(min.x, max.y, min.z),
    Vec3::new(min.x, min.y, max.z),
    Vec3::new(max.x, min.y, max.z),
    Vec3::new(max.x, max.y, max.z),
    Vec3::new(min.x, max.y, max.z),
  ];
  #[rustfmt::skip]
  let indices = [
    0, 2, 1, 0, 3, 2, // bottom
    4, 5, 6, 4, 6, 7, // top
    0, 1, 5, 0, 5, 4, // -y
    2, 3, 7, 2, 7, 6, // +y
    1, 2, 6, 1, 6, 5, // +x
    3, 0, 4, 3, 4, 7, // -x
  ];
  Mesh::new(format!("cuboid_{id}"), id, vertices, &indices).unwrap()
}

/// Vertical wall in the plane `x = x`, spanning `y0..y1` and `z0..z1`.
pub fn wall_x(x: f32, y0: f32, y1: f32, z0: f32, z1: f32, id: i32) -> Mesh {
  let vertices = vec![
    Vec3::new(x, y0, z0),
    Vec3::new(x, y1, z0),
    Vec3::new(x, y1, z1),
    Vec3::new(x, y0, z1),
  ];
  Mesh::new(format!("wall_{id}"), id, vertices, &[0, 1, 2, 0, 2, 3]).unwrap()
}

/// Plane tilted about the y axis: height rises by `rise_per_x` per unit x.
pub fn ramp(half_extent: f32, rise_per_x: f32, id: i32) -> Mesh {
  let h = half_extent;
  let vertices = vec![
    Vec3::new(-h, -h, -h * rise_per_x),
    Vec3::new(h, -h, h * rise_per_x),
    Vec3::new(h, h, h * rise_per_x),
    Vec3::new(-h, h, -h * rise_per_x),
  ];
  Mesh::new(format!("ramp_{id}"), id, vertices, &[0, 1, 2, 0, 2, 3]).unwrap()
}

// =============================================================================
// Scenes
// =============================================================================

/// A single 20x20 floor at z = 0 with mesh id 0.
pub fn flat_floor() -> GeometryIndex {
  GeometryIndex::from_mesh(plane(10.0, 0.0, 0)).unwrap()
}

/// Floor (id 0) with a box obstacle (id 1) standing on it.
pub fn floor_with_box() -> GeometryIndex {
  GeometryIndex::build(vec![
    plane(10.0, 0.0, 0),
    cuboid(Vec3::new(2.0, -2.0, 0.0), Vec3::new(4.0, 2.0, 3.0), 1),
  ])
  .unwrap()
}

/// Floor with a tall wall (id 2) across it at x = 0.5.
pub fn floor_with_wall() -> GeometryIndex {
  GeometryIndex::build(vec![
    plane(10.0, 0.0, 0),
    wall_x(0.5, -10.0, 10.0, 0.0, 5.0, 2),
  ])
  .unwrap()
}

/// Closed room: floor plus a ceiling at z = 3.
pub fn closed_room() -> GeometryIndex {
  GeometryIndex::build(vec![plane(10.0, 0.0, 0), plane(10.0, 3.0, 1)]).unwrap()
}
