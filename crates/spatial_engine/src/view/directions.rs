//! Evenly spread view directions on the unit sphere.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec3;

/// Golden-angle spiral over the sphere, keeping only directions inside the
/// field of view.
///
/// `up_fov` and `down_fov` are degrees above and below the horizon. The
/// result has at most `count` directions; fewer when the FOV removes some.
pub fn fibonacci_directions(count: usize, up_fov: f32, down_fov: f32) -> Vec<Vec3> {
  if count == 0 {
    return Vec::new();
  }
  let min_polar = FRAC_PI_2 - up_fov.to_radians();
  let max_polar = FRAC_PI_2 + down_fov.to_radians();

  let offset = 2.0 / count as f32;
  let increment = PI * (3.0 - 5f32.sqrt());

  (0..count)
    .filter_map(|i| {
      let y = (i as f32 + 0.5) * offset - 1.0;
      let r = (1.0 - y * y).max(0.0).sqrt();
      let phi = i as f32 * increment;
      let dir = Vec3::new(phi.cos() * r, y, phi.sin() * r).normalize_or_zero();
      if dir == Vec3::ZERO {
        return None;
      }
      // Polar angle measured from +Z
      let polar = dir.z.clamp(-1.0, 1.0).acos();
      (min_polar..=max_polar).contains(&polar).then_some(dir)
    })
    .collect()
}

/// [`fibonacci_directions`] resampled so the realized count approaches
/// `count` after FOV filtering.
pub fn spherical_distribute(count: usize, up_fov: f32, down_fov: f32) -> Vec<Vec3> {
  let first = fibonacci_directions(count, up_fov, down_fov);
  if first.is_empty() || first.len() == count {
    return first;
  }
  let kept = first.len() as f64 / count as f64;
  let resampled = (count as f64 / kept) as usize;
  fibonacci_directions(resampled, up_fov, down_fov)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_full_sphere_keeps_everything() {
    let dirs = fibonacci_directions(500, 90.0, 90.0);
    assert_eq!(dirs.len(), 500);
    assert!(dirs.iter().all(|d| (d.length() - 1.0).abs() < 1e-5));
    // Roughly balanced between hemispheres
    let up = dirs.iter().filter(|d| d.z > 0.0).count();
    assert!((200..=300).contains(&up));
  }

  #[test]
  fn test_fov_band_is_respected() {
    let dirs = spherical_distribute(2000, 50.0, 70.0);
    let max_up = 50f32.to_radians().sin() + 1e-4;
    let max_down = 70f32.to_radians().sin() + 1e-4;
    assert!(dirs.iter().all(|d| d.z <= max_up && d.z >= -max_down));
  }

  #[test]
  fn test_resampling_approaches_request() {
    let filtered = fibonacci_directions(1000, 30.0, 30.0);
    let distributed = spherical_distribute(1000, 30.0, 30.0);
    assert!(filtered.len() < 1000);
    assert!(distributed.len() > filtered.len());
    assert!(distributed.len().abs_diff(1000) < 50);
  }

  #[test]
  fn test_empty_requests() {
    assert!(spherical_distribute(0, 50.0, 70.0).is_empty());
    // An inverted band keeps nothing
    assert!(fibonacci_directions(100, -90.0, -90.0).is_empty());
  }
}
