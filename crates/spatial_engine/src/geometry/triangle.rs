//! Indexed triangle primitive and ray/triangle intersection.

use glam::Vec3;

use crate::constants::T_MIN;

/// Determinant threshold below which a ray counts as parallel to a triangle.
const PARALLEL_EPSILON: f32 = 1e-10;

/// Barycentric slack so rays through a shared edge hit at least one side.
const EDGE_EPSILON: f32 = 1e-6;

/// A triangle as stored in the index: one corner, two edges and the id of the
/// mesh it came from.
#[derive(Clone, Copy, Debug)]
pub struct Triangle {
  pub v0: Vec3,
  pub edge1: Vec3,
  pub edge2: Vec3,
  pub mesh_id: i32,
}

impl Triangle {
  pub fn new(a: Vec3, b: Vec3, c: Vec3, mesh_id: i32) -> Self {
    Self {
      v0: a,
      edge1: b - a,
      edge2: c - a,
      mesh_id,
    }
  }

  pub fn corners(&self) -> [Vec3; 3] {
    [self.v0, self.v0 + self.edge1, self.v0 + self.edge2]
  }

  pub fn centroid(&self) -> Vec3 {
    self.v0 + (self.edge1 + self.edge2) / 3.0
  }

  /// Möller–Trumbore intersection, two-sided.
  ///
  /// Returns the distance along `dir` (unit length) when the hit lies in
  /// `(T_MIN, max_t]`.
  #[inline]
  pub fn intersect(&self, origin: Vec3, dir: Vec3, max_t: f32) -> Option<f32> {
    let h = dir.cross(self.edge2);
    let det = self.edge1.dot(h);
    if det.abs() < PARALLEL_EPSILON {
      return None;
    }

    let inv_det = 1.0 / det;
    let s = origin - self.v0;
    let u = inv_det * s.dot(h);
    if !(-EDGE_EPSILON..=1.0 + EDGE_EPSILON).contains(&u) {
      return None;
    }

    let q = s.cross(self.edge1);
    let v = inv_det * dir.dot(q);
    if v < -EDGE_EPSILON || u + v > 1.0 + EDGE_EPSILON {
      return None;
    }

    let t = inv_det * self.edge2.dot(q);
    if t <= T_MIN || t > max_t {
      return None;
    }
    Some(t)
  }
}
