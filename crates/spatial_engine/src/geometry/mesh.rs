//! Validated triangle meshes handed to the geometry index.

use glam::Vec3;

use super::bounds::Aabb;
use crate::error::{EngineError, Result};

/// Minimum doubled triangle area treated as non-degenerate.
const MIN_DOUBLE_AREA: f32 = 1e-12;

/// A named, id-tagged triangle mesh.
///
/// Immutable after construction. Zero-area triangles are dropped since no
/// ray can hit them.
#[derive(Clone, Debug)]
pub struct Mesh {
  name: String,
  id: i32,
  vertices: Vec<Vec3>,
  triangles: Vec<[u32; 3]>,
}

impl Mesh {
  /// Build a mesh from flat vertex (`x, y, z, ...`) and index arrays.
  pub fn from_flat(name: impl Into<String>, id: i32, vertices: &[f32], indices: &[u32]) -> Result<Self> {
    let name = name.into();
    if vertices.len() % 3 != 0 {
      return Err(EngineError::invalid_mesh(
        &name,
        format!("vertex array length {} is not a multiple of 3", vertices.len()),
      ));
    }
    let points = vertices
      .chunks_exact(3)
      .map(|v| Vec3::new(v[0], v[1], v[2]))
      .collect();
    Self::new(name, id, points, indices)
  }

  /// Build a mesh from vertex positions and a flat triangle index array.
  pub fn new(name: impl Into<String>, id: i32, vertices: Vec<Vec3>, indices: &[u32]) -> Result<Self> {
    let name = name.into();
    if vertices.is_empty() || indices.is_empty() {
      return Err(EngineError::invalid_mesh(&name, "mesh has no vertices or no triangles"));
    }
    if indices.len() % 3 != 0 {
      return Err(EngineError::invalid_mesh(
        &name,
        format!("index array length {} is not a multiple of 3", indices.len()),
      ));
    }
    if let Some(bad) = vertices.iter().position(|v| !v.is_finite()) {
      return Err(EngineError::invalid_mesh(&name, format!("vertex {bad} is not finite")));
    }
    if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
      return Err(EngineError::invalid_mesh(
        &name,
        format!("index {bad} out of range for {} vertices", vertices.len()),
      ));
    }

    let triangles: Vec<[u32; 3]> = indices
      .chunks_exact(3)
      .map(|t| [t[0], t[1], t[2]])
      .filter(|t| {
        let (a, b, c) = (vertices[t[0] as usize], vertices[t[1] as usize], vertices[t[2] as usize]);
        (b - a).cross(c - a).length_squared() > MIN_DOUBLE_AREA * MIN_DOUBLE_AREA
      })
      .collect();

    if triangles.is_empty() {
      return Err(EngineError::invalid_mesh(&name, "every triangle is degenerate"));
    }

    Ok(Self {
      name,
      id,
      vertices,
      triangles,
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn id(&self) -> i32 {
    self.id
  }

  pub fn vertices(&self) -> &[Vec3] {
    &self.vertices
  }

  pub fn triangles(&self) -> &[[u32; 3]] {
    &self.triangles
  }

  pub fn triangle_count(&self) -> usize {
    self.triangles.len()
  }

  /// Corner positions of triangle `index`.
  #[inline]
  pub fn triangle(&self, index: usize) -> [Vec3; 3] {
    let [a, b, c] = self.triangles[index];
    [
      self.vertices[a as usize],
      self.vertices[b as usize],
      self.vertices[c as usize],
    ]
  }

  pub fn bounds(&self) -> Aabb {
    let mut aabb = Aabb::empty();
    for v in &self.vertices {
      aabb.expand_point(*v);
    }
    aabb
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn quad() -> (Vec<f32>, Vec<u32>) {
    (
      vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
      vec![0, 1, 2, 0, 2, 3],
    )
  }

  #[test]
  fn test_from_flat() {
    let (v, i) = quad();
    let mesh = Mesh::from_flat("floor", 7, &v, &i).unwrap();
    assert_eq!(mesh.id(), 7);
    assert_eq!(mesh.name(), "floor");
    assert_eq!(mesh.triangle_count(), 2);
    assert_eq!(mesh.bounds().max, Vec3::new(1.0, 1.0, 0.0));
  }

  #[test]
  fn test_empty_mesh_rejected() {
    let err = Mesh::from_flat("empty", 0, &[], &[]).unwrap_err();
    assert!(matches!(err, EngineError::InvalidMesh { .. }));
  }

  #[test]
  fn test_ragged_arrays_rejected() {
    let (v, _) = quad();
    assert!(Mesh::from_flat("m", 0, &v[..11], &[0, 1, 2]).is_err());
    assert!(Mesh::from_flat("m", 0, &v, &[0, 1]).is_err());
  }

  #[test]
  fn test_out_of_range_index_rejected() {
    let (v, _) = quad();
    assert!(Mesh::from_flat("m", 0, &v, &[0, 1, 9]).is_err());
  }

  #[test]
  fn test_degenerate_triangles() {
    let (v, _) = quad();
    // Collinear corners only
    let err = Mesh::from_flat("line", 0, &v, &[0, 1, 1]).unwrap_err();
    assert!(matches!(err, EngineError::InvalidMesh { .. }));

    // One good triangle survives alongside a degenerate one
    let mesh = Mesh::from_flat("mixed", 0, &v, &[0, 0, 1, 0, 1, 2]).unwrap();
    assert_eq!(mesh.triangle_count(), 1);
  }

  #[test]
  fn test_non_finite_rejected() {
    let mut v = quad().0;
    v[4] = f32::NAN;
    assert!(Mesh::from_flat("nan", 0, &v, &[0, 1, 2]).is_err());
  }
}
