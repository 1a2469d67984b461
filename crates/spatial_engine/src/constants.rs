//! Engine-wide constants and rounding helpers.

/// Grid used when rounding node coordinates.
pub const ROUNDING_PRECISION: f32 = 0.0001;

/// Lift applied to ground points before line-of-sight checks so rays do not
/// start inside the floor they stand on.
pub const GROUND_OFFSET: f32 = 0.001;

/// Hits closer than this along a ray are ignored.
pub const T_MIN: f32 = 1e-5;

/// Name of the cost set every edge belongs to.
pub const DEFAULT_COST_SET: &str = "Distance";

/// Sentinel for "no edge in this cost set". Stored costs are never
/// negative, so this cannot be mistaken for a real entry.
pub const NO_EDGE: f32 = -1.0;

/// Grid cells per unit, the exact inverse of `ROUNDING_PRECISION`.
const ROUNDING_SCALE: f64 = 10_000.0;

/// Round a coordinate to `ROUNDING_PRECISION`.
///
/// Whole and exactly representable values come back unchanged.
#[inline]
pub fn round_coord(value: f32) -> f32 {
  ((value as f64 * ROUNDING_SCALE).round() / ROUNDING_SCALE) as f32
}

/// Quantize a coordinate onto the rounding grid.
#[inline]
pub fn quantize(value: f32) -> i64 {
  (value as f64 * ROUNDING_SCALE).round() as i64
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_round_coord() {
    assert!((round_coord(1.000_04) - 1.0).abs() < 1e-6);
    assert!((round_coord(1.000_06) - 1.0001).abs() < 1e-6);
    assert!((round_coord(-2.345_67) + 2.3457).abs() < 1e-5);
  }

  #[test]
  fn test_round_coord_keeps_grid_values() {
    for v in [0.0f32, 1.0, 3.0, -7.0, 0.5, 12.25] {
      assert_eq!(round_coord(v), v);
    }
    assert!(((1.0 / ROUNDING_SCALE) as f32 - ROUNDING_PRECISION).abs() < f32::EPSILON);
  }

  #[test]
  fn test_quantize_matches_rounding() {
    assert_eq!(quantize(1.0), 10_000);
    assert_eq!(quantize(round_coord(0.123_456)), quantize(0.1235));
    assert_eq!(quantize(-0.5), -5_000);
  }
}
