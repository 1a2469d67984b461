//! Geometry index and ray service.
//!
//! `GeometryIndex` owns every mesh it was built from and answers nearest-hit
//! and occlusion queries. It is immutable after `build`, so `&GeometryIndex`
//! can be shared freely across rayon workers.

use glam::Vec3;
use rayon::prelude::*;
use web_time::Instant;

use super::bounds::Aabb;
use super::bvh::{Bvh, BvhStats};
use super::mesh::Mesh;
use super::triangle::Triangle;
use crate::error::{EngineError, Result};
use crate::metrics;
use crate::types::RayResult;

/// Nearest intersection with its hit point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
  pub point: Vec3,
  pub distance: f32,
  pub mesh_id: i32,
}

impl From<Hit> for RayResult {
  fn from(hit: Hit) -> Self {
    RayResult::hit(hit.distance, hit.mesh_id)
  }
}

/// How origins and directions of a batch pair up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchShape {
  /// Ray i uses origin i and direction i.
  Paired(usize),
  /// Every origin fires along the single direction.
  ManyOrigins(usize),
  /// The single origin fires along every direction.
  ManyDirections(usize),
}

impl BatchShape {
  /// Classify a batch, rejecting length combinations that cannot pair up.
  pub fn classify(origins: usize, directions: usize) -> Result<Self> {
    if origins == directions {
      Ok(BatchShape::Paired(origins))
    } else if directions == 1 {
      Ok(BatchShape::ManyOrigins(origins))
    } else if origins == 1 {
      Ok(BatchShape::ManyDirections(directions))
    } else {
      Err(EngineError::BatchShapeMismatch { origins, directions })
    }
  }

  pub fn len(&self) -> usize {
    match *self {
      BatchShape::Paired(n) | BatchShape::ManyOrigins(n) | BatchShape::ManyDirections(n) => n,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  #[inline]
  fn ray(&self, i: usize, origins: &[Vec3], directions: &[Vec3]) -> (Vec3, Vec3) {
    match *self {
      BatchShape::Paired(_) => (origins[i], directions[i]),
      BatchShape::ManyOrigins(_) => (origins[i], directions[0]),
      BatchShape::ManyDirections(_) => (origins[0], directions[i]),
    }
  }
}

/// Map the caller's distance convention (`< 0` = unbounded) to a ray limit.
#[inline]
fn ray_limit(max_distance: f32) -> f32 {
  if max_distance < 0.0 {
    f32::INFINITY
  } else {
    max_distance
  }
}

/// Immutable triangle index over one or more meshes.
pub struct GeometryIndex {
  meshes: Vec<Mesh>,
  triangles: Vec<Triangle>,
  bvh: Bvh,
}

impl GeometryIndex {
  /// Build an index over `meshes`.
  ///
  /// Meshes are validated on construction, so the only failure here is an
  /// empty mesh list.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "geometry::build"))]
  pub fn build(meshes: Vec<Mesh>) -> Result<Self> {
    if meshes.is_empty() {
      return Err(EngineError::invalid_mesh("<none>", "no meshes supplied"));
    }
    let start = Instant::now();

    let triangles: Vec<Triangle> = meshes
      .iter()
      .flat_map(|mesh| {
        (0..mesh.triangle_count()).map(move |i| {
          let [a, b, c] = mesh.triangle(i);
          Triangle::new(a, b, c, mesh.id())
        })
      })
      .collect();
    let bvh = Bvh::build(&triangles);

    let elapsed_us = start.elapsed().as_micros() as u64;
    metrics::record(|m| m.record_index_build(elapsed_us));
    tracing::debug!(
      meshes = meshes.len(),
      triangles = triangles.len(),
      elapsed_us,
      "built geometry index"
    );

    Ok(Self {
      meshes,
      triangles,
      bvh,
    })
  }

  /// Build from a single mesh.
  pub fn from_mesh(mesh: Mesh) -> Result<Self> {
    Self::build(vec![mesh])
  }

  /// Rebuild with one more mesh. The index itself is never mutated.
  pub fn with_mesh(&self, mesh: Mesh) -> Result<Self> {
    let mut meshes = self.meshes.clone();
    meshes.push(mesh);
    Self::build(meshes)
  }

  pub fn meshes(&self) -> &[Mesh] {
    &self.meshes
  }

  pub fn mesh_ids(&self) -> Vec<i32> {
    self.meshes.iter().map(Mesh::id).collect()
  }

  pub fn triangle_count(&self) -> usize {
    self.triangles.len()
  }

  pub fn bounds(&self) -> Aabb {
    self.bvh.bounds()
  }

  pub fn bvh_stats(&self) -> BvhStats {
    self.bvh.stats()
  }

  // ===========================================================================
  // Single rays
  // ===========================================================================

  /// Nearest hit with its location.
  pub fn intersect(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<Hit> {
    let dir = direction.normalize_or_zero();
    if dir == Vec3::ZERO {
      return None;
    }
    self
      .bvh
      .closest_hit(&self.triangles, origin, dir, ray_limit(max_distance))
      .map(|(t, prim)| Hit {
        point: origin + dir * t,
        distance: t,
        mesh_id: self.triangles[prim as usize].mesh_id,
      })
  }

  /// Nearest-hit query; `max_distance < 0` means unbounded.
  pub fn fire_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> RayResult {
    self
      .intersect(origin, direction, max_distance)
      .map_or(RayResult::MISS, RayResult::from)
  }

  /// Hit/miss only; stops at the first intersection in range.
  pub fn fire_occlusion_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> bool {
    let dir = direction.normalize_or_zero();
    if dir == Vec3::ZERO {
      return false;
    }
    self
      .bvh
      .any_hit(&self.triangles, origin, dir, ray_limit(max_distance))
  }

  // ===========================================================================
  // Batches
  // ===========================================================================

  /// Fire a batch of nearest-hit rays. See [`BatchShape`] for valid shapes.
  /// Result `i` always belongs to ray `i`.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "geometry::fire_rays"))]
  pub fn fire_rays(&self, origins: &[Vec3], directions: &[Vec3], max_distance: f32) -> Result<Vec<RayResult>> {
    let shape = BatchShape::classify(origins.len(), directions.len())?;
    let results: Vec<RayResult> = (0..shape.len())
      .into_par_iter()
      .map(|i| {
        let (o, d) = shape.ray(i, origins, directions);
        self.fire_ray(o, d, max_distance)
      })
      .collect();
    metrics::record(|m| m.record_rays(results.len()));
    Ok(results)
  }

  /// Batched [`fire_ray`](Self::fire_ray) that also returns hit points.
  pub fn intersect_many(&self, origins: &[Vec3], directions: &[Vec3], max_distance: f32) -> Result<Vec<Option<Hit>>> {
    let shape = BatchShape::classify(origins.len(), directions.len())?;
    let results: Vec<Option<Hit>> = (0..shape.len())
      .into_par_iter()
      .map(|i| {
        let (o, d) = shape.ray(i, origins, directions);
        self.intersect(o, d, max_distance)
      })
      .collect();
    metrics::record(|m| m.record_rays(results.len()));
    Ok(results)
  }

  /// Fire a batch of occlusion rays.
  pub fn fire_occlusion_rays(&self, origins: &[Vec3], directions: &[Vec3], max_distance: f32) -> Result<Vec<bool>> {
    let shape = BatchShape::classify(origins.len(), directions.len())?;
    let results: Vec<bool> = (0..shape.len())
      .into_par_iter()
      .map(|i| {
        let (o, d) = shape.ray(i, origins, directions);
        self.fire_occlusion_ray(o, d, max_distance)
      })
      .collect();
    metrics::record(|m| m.record_rays(results.len()));
    Ok(results)
  }
}

impl std::fmt::Debug for GeometryIndex {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GeometryIndex")
      .field("meshes", &self.meshes.len())
      .field("triangles", &self.triangles.len())
      .finish()
  }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
