//! FIFO frontier that admits each ground position once.

use std::collections::{HashMap, VecDeque};

use glam::Vec3;
use smallvec::SmallVec;

use crate::constants::quantize;

/// Frontier queue with a spatial-hash "seen" set.
///
/// Positions are bucketed by quantized `(x, y)` cell; each cell keeps the
/// quantized heights seen there, so stacked floors are distinct entries.
#[derive(Debug, Default)]
pub struct UniqueQueue {
  queue: VecDeque<Vec3>,
  seen: HashMap<(i64, i64), SmallVec<[i64; 2]>>,
}

impl UniqueQueue {
  pub fn new() -> Self {
    Self::default()
  }

  /// Enqueue `position` unless it was ever pushed before.
  pub fn push(&mut self, position: Vec3) -> bool {
    if !self.mark_seen(position) {
      return false;
    }
    self.queue.push_back(position);
    true
  }

  /// Enqueue `position` even if it was already seen.
  pub fn force_push(&mut self, position: Vec3) {
    self.mark_seen(position);
    self.queue.push_back(position);
  }

  pub fn pop(&mut self) -> Option<Vec3> {
    self.queue.pop_front()
  }

  /// Pop up to `count` positions in queue order.
  pub fn pop_many(&mut self, count: usize) -> Vec<Vec3> {
    let count = count.min(self.queue.len());
    self.queue.drain(..count).collect()
  }

  pub fn has_seen(&self, position: Vec3) -> bool {
    let (cell, z) = Self::key(position);
    self.seen.get(&cell).is_some_and(|heights| heights.contains(&z))
  }

  pub fn len(&self) -> usize {
    self.queue.len()
  }

  pub fn is_empty(&self) -> bool {
    self.queue.is_empty()
  }

  /// Record `position`; false if it was already present.
  fn mark_seen(&mut self, position: Vec3) -> bool {
    let (cell, z) = Self::key(position);
    let heights = self.seen.entry(cell).or_default();
    if heights.contains(&z) {
      return false;
    }
    heights.push(z);
    true
  }

  #[inline]
  fn key(position: Vec3) -> ((i64, i64), i64) {
    (
      (quantize(position.x), quantize(position.y)),
      quantize(position.z),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_push_once() {
    let mut queue = UniqueQueue::new();
    assert!(queue.push(Vec3::new(1.0, 2.0, 0.0)));
    assert!(!queue.push(Vec3::new(1.0, 2.0, 0.0)));
    assert_eq!(queue.len(), 1);

    // Seen positions stay rejected after popping
    queue.pop();
    assert!(!queue.push(Vec3::new(1.0, 2.0, 0.0)));
    assert!(queue.is_empty());
  }

  #[test]
  fn test_stacked_floors_are_distinct() {
    let mut queue = UniqueQueue::new();
    assert!(queue.push(Vec3::new(1.0, 1.0, 0.0)));
    assert!(queue.push(Vec3::new(1.0, 1.0, 3.0)));
    assert!(queue.has_seen(Vec3::new(1.0, 1.0, 3.0)));
    assert!(!queue.has_seen(Vec3::new(1.0, 1.0, 6.0)));
  }

  #[test]
  fn test_force_push_and_order() {
    let mut queue = UniqueQueue::new();
    queue.push(Vec3::X);
    queue.force_push(Vec3::X);
    queue.push(Vec3::Y);
    assert_eq!(queue.pop_many(10), vec![Vec3::X, Vec3::X, Vec3::Y]);
    assert_eq!(queue.pop(), None);
  }
}
