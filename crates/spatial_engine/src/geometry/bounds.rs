//! Axis-aligned bounding box used by the BVH.

use glam::Vec3;

/// Single-precision axis-aligned bounding box.
///
/// Starts inverted (`empty`) so that expanding by the first point or box
/// yields that point or box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
	/// Minimum corner (inclusive).
	pub min: Vec3,
	/// Maximum corner (inclusive).
	pub max: Vec3,
}

impl Aabb {
	/// Create a new AABB from min and max corners.
	///
	/// # Panics
	/// Debug-asserts that min <= max on all axes.
	pub fn new(min: Vec3, max: Vec3) -> Self {
		debug_assert!(
			min.x <= max.x && min.y <= max.y && min.z <= max.z,
			"AABB min must be <= max on all axes"
		);
		Self { min, max }
	}

	/// Inverted box, ready for expansion.
	pub fn empty() -> Self {
		Self {
			min: Vec3::splat(f32::INFINITY),
			max: Vec3::splat(f32::NEG_INFINITY),
		}
	}

	/// Tight box around a triangle.
	pub fn from_triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
		Self {
			min: a.min(b).min(c),
			max: a.max(b).max(c),
		}
	}

	/// True until something has been added.
	#[inline]
	pub fn is_empty(&self) -> bool {
		self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
	}

	/// Grow to include a point.
	#[inline]
	pub fn expand_point(&mut self, point: Vec3) {
		self.min = self.min.min(point);
		self.max = self.max.max(point);
	}

	/// Grow to include another box.
	#[inline]
	pub fn expand(&mut self, other: &Aabb) {
		self.min = self.min.min(other.min);
		self.max = self.max.max(other.max);
	}

	/// Check if this AABB contains a point.
	#[inline]
	pub fn contains_point(&self, point: Vec3) -> bool {
		point.cmpge(self.min).all() && point.cmple(self.max).all()
	}

	/// Get the size of the AABB (max - min).
	#[inline]
	pub fn size(&self) -> Vec3 {
		self.max - self.min
	}

	/// Get the center of the AABB.
	#[inline]
	pub fn center(&self) -> Vec3 {
		(self.min + self.max) * 0.5
	}

	/// Index of the longest axis (0 = x, 1 = y, 2 = z).
	pub fn longest_axis(&self) -> usize {
		let size = self.size();
		if size.x >= size.y && size.x >= size.z {
			0
		} else if size.y >= size.z {
			1
		} else {
			2
		}
	}

	/// Slab test against a ray given its inverse direction.
	///
	/// Returns the entry distance when the ray overlaps the box within
	/// `[0, max_t]`.
	#[inline]
	pub fn ray_entry(&self, origin: Vec3, inv_dir: Vec3, max_t: f32) -> Option<f32> {
		let t0 = (self.min - origin) * inv_dir;
		let t1 = (self.max - origin) * inv_dir;
		let t_near = t0.min(t1).max_element().max(0.0);
		let t_far = t0.max(t1).min_element().min(max_t);
		// NaN from 0 * inf on a slab plane is skipped by min/max, keeping the box
		(t_near <= t_far).then_some(t_near)
	}
}

impl Default for Aabb {
	fn default() -> Self {
		Self::empty()
	}
}
