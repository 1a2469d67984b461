//! Bounding volume hierarchy over indexed triangles.
//!
//! Binary tree split at the centroid median along the longest axis of each
//! node's centroid bounds. Subtrees above `PARALLEL_THRESHOLD` primitives are
//! built on both halves of a `rayon::join`.

use glam::Vec3;
use smallvec::SmallVec;

use super::bounds::Aabb;
use super::triangle::Triangle;

/// Maximum primitives per leaf.
pub const MAX_LEAF_SIZE: usize = 4;

/// Subtrees with at least this many primitives build in parallel.
pub const PARALLEL_THRESHOLD: usize = 4096;

/// BVH node containing either leaf triangles or child nodes.
#[derive(Debug)]
pub enum BvhNode {
  Leaf {
    bbox: Aabb,
    /// Indices into the index's triangle array.
    triangles: SmallVec<[u32; 8]>,
  },
  Internal {
    bbox: Aabb,
    left: Box<BvhNode>,
    right: Box<BvhNode>,
  },
}

impl BvhNode {
  #[inline]
  pub fn bbox(&self) -> &Aabb {
    match self {
      Self::Leaf { bbox, .. } | Self::Internal { bbox, .. } => bbox,
    }
  }
}

/// Shape statistics, mostly for logging and benches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BvhStats {
  pub node_count: usize,
  pub leaf_count: usize,
  pub max_depth: usize,
  pub max_leaf_size: usize,
}

/// Bounding volume hierarchy. Borrows nothing; primitives live in the
/// owning index and are passed to queries.
#[derive(Debug)]
pub struct Bvh {
  root: BvhNode,
}

/// Per-primitive build record.
#[derive(Clone, Copy)]
struct BuildPrim {
  index: u32,
  bbox: Aabb,
  centroid: Vec3,
}

impl Bvh {
  /// Build over a non-empty primitive slice.
  pub fn build(triangles: &[Triangle]) -> Self {
    let mut prims: Vec<BuildPrim> = triangles
      .iter()
      .enumerate()
      .map(|(i, tri)| {
        let [a, b, c] = tri.corners();
        BuildPrim {
          index: i as u32,
          bbox: Aabb::from_triangle(a, b, c),
          centroid: tri.centroid(),
        }
      })
      .collect();
    Self {
      root: build_recursive(&mut prims),
    }
  }

  pub fn bounds(&self) -> Aabb {
    *self.root.bbox()
  }

  pub fn stats(&self) -> BvhStats {
    let mut stats = BvhStats::default();
    collect_stats(&self.root, 1, &mut stats);
    stats
  }

  /// Nearest primitive hit along a unit-length ray, as `(t, primitive)`.
  pub fn closest_hit(&self, triangles: &[Triangle], origin: Vec3, dir: Vec3, max_t: f32) -> Option<(f32, u32)> {
    let inv_dir = dir.recip();
    let mut best: Option<(f32, u32)> = None;
    let mut limit = max_t;
    let mut stack: SmallVec<[&BvhNode; 64]> = SmallVec::new();

    if self.root.bbox().ray_entry(origin, inv_dir, limit).is_none() {
      return None;
    }
    stack.push(&self.root);

    while let Some(node) = stack.pop() {
      match node {
        BvhNode::Leaf { triangles: prims, .. } => {
          for &p in prims {
            if let Some(t) = triangles[p as usize].intersect(origin, dir, limit) {
              // Ties go to the lower primitive index so results do not depend
              // on traversal order.
              let better = match best {
                Some((bt, bp)) => t < bt || (t == bt && p < bp),
                None => true,
              };
              if better {
                best = Some((t, p));
                limit = t;
              }
            }
          }
        }
        BvhNode::Internal { left, right, .. } => {
          let l = left.bbox().ray_entry(origin, inv_dir, limit);
          let r = right.bbox().ray_entry(origin, inv_dir, limit);
          // Push the farther child first so the nearer one is visited next
          match (l, r) {
            (Some(lt), Some(rt)) => {
              if lt <= rt {
                stack.push(right);
                stack.push(left);
              } else {
                stack.push(left);
                stack.push(right);
              }
            }
            (Some(_), None) => stack.push(left),
            (None, Some(_)) => stack.push(right),
            (None, None) => {}
          }
        }
      }
    }
    best
  }

  /// True if any primitive lies along the ray within `max_t`.
  pub fn any_hit(&self, triangles: &[Triangle], origin: Vec3, dir: Vec3, max_t: f32) -> bool {
    let inv_dir = dir.recip();
    let mut stack: SmallVec<[&BvhNode; 64]> = SmallVec::new();
    stack.push(&self.root);

    while let Some(node) = stack.pop() {
      if node.bbox().ray_entry(origin, inv_dir, max_t).is_none() {
        continue;
      }
      match node {
        BvhNode::Leaf { triangles: prims, .. } => {
          if prims
            .iter()
            .any(|&p| triangles[p as usize].intersect(origin, dir, max_t).is_some())
          {
            return true;
          }
        }
        BvhNode::Internal { left, right, .. } => {
          stack.push(right);
          stack.push(left);
        }
      }
    }
    false
  }
}

fn build_recursive(prims: &mut [BuildPrim]) -> BvhNode {
  let mut bbox = Aabb::empty();
  let mut centroid_bounds = Aabb::empty();
  for p in prims.iter() {
    bbox.expand(&p.bbox);
    centroid_bounds.expand_point(p.centroid);
  }

  if prims.len() <= MAX_LEAF_SIZE {
    return BvhNode::Leaf {
      bbox,
      triangles: prims.iter().map(|p| p.index).collect(),
    };
  }

  let axis = centroid_bounds.longest_axis();
  let mid = prims.len() / 2;
  prims.select_nth_unstable_by(mid, |a, b| {
    a.centroid[axis]
      .partial_cmp(&b.centroid[axis])
      .unwrap_or(std::cmp::Ordering::Equal)
      .then(a.index.cmp(&b.index))
  });
  let (left_prims, right_prims) = prims.split_at_mut(mid);

  let (left, right) = if left_prims.len() + right_prims.len() >= PARALLEL_THRESHOLD {
    rayon::join(|| build_recursive(left_prims), || build_recursive(right_prims))
  } else {
    (build_recursive(left_prims), build_recursive(right_prims))
  };

  BvhNode::Internal {
    bbox,
    left: Box::new(left),
    right: Box::new(right),
  }
}

fn collect_stats(node: &BvhNode, depth: usize, stats: &mut BvhStats) {
  stats.node_count += 1;
  stats.max_depth = stats.max_depth.max(depth);
  match node {
    BvhNode::Leaf { triangles, .. } => {
      stats.leaf_count += 1;
      stats.max_leaf_size = stats.max_leaf_size.max(triangles.len());
    }
    BvhNode::Internal { left, right, .. } => {
      collect_stats(left, depth + 1, stats);
      collect_stats(right, depth + 1, stats);
    }
  }
}

#[cfg(test)]
#[path = "bvh_test.rs"]
mod bvh_test;
