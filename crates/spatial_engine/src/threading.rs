//! Worker pool selection for parallel analysis.
//!
//! All data parallelism goes through rayon. Callers pick how many workers a
//! call may use with [`CoreCount`]; [`WorkerPool`] turns that into either the
//! global rayon pool, a dedicated pool, or inline serial execution.
//!
//! # Usage
//!
//! ```ignore
//! let pool = WorkerPool::new(CoreCount::from_raw(4))?;
//!
//! // Runs on the 4-thread pool; par_iter inside uses those threads.
//! let scores = pool.install(|| nodes.par_iter().map(score).collect::<Vec<_>>());
//! ```

use crate::error::{EngineError, Result};

/// How many worker threads a call may use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoreCount {
  /// Everything on the calling thread.
  Serial,
  /// rayon's global pool (one worker per hardware thread).
  #[default]
  All,
  /// A dedicated pool with exactly this many workers.
  Fixed(usize),
}

impl CoreCount {
  /// Host convention: `0` or `1` = serial, negative = all, `n` = `n` workers.
  pub fn from_raw(raw: i32) -> Self {
    match raw {
      i32::MIN..=-1 => CoreCount::All,
      0 | 1 => CoreCount::Serial,
      n => CoreCount::Fixed(n as usize),
    }
  }

  pub fn is_parallel(&self) -> bool {
    !matches!(self, CoreCount::Serial)
  }
}

/// A resolved pool for one analysis call.
pub struct WorkerPool {
  cores: CoreCount,
  pool: Option<rayon::ThreadPool>,
}

impl WorkerPool {
  /// Build the pool. Only `Fixed` allocates threads.
  pub fn new(cores: CoreCount) -> Result<Self> {
    let pool = match cores {
      CoreCount::Fixed(n) => Some(
        rayon::ThreadPoolBuilder::new()
          .num_threads(n)
          .thread_name(|i| format!("spatial-engine-{i}"))
          .build()
          .map_err(|e| EngineError::ThreadPool(e.to_string()))?,
      ),
      CoreCount::Serial | CoreCount::All => None,
    };
    Ok(Self { cores, pool })
  }

  pub fn cores(&self) -> CoreCount {
    self.cores
  }

  pub fn is_parallel(&self) -> bool {
    self.cores.is_parallel()
  }

  /// Number of workers available to `install`.
  pub fn num_threads(&self) -> usize {
    match (&self.pool, self.cores) {
      (Some(pool), _) => pool.current_num_threads(),
      (None, CoreCount::Serial) => 1,
      (None, _) => rayon::current_num_threads(),
    }
  }

  /// Run `op` with this pool as the ambient rayon pool.
  ///
  /// Serial pools still run `op` on the caller; callers check
  /// [`is_parallel`](Self::is_parallel) to pick a serial code path.
  pub fn install<R, F>(&self, op: F) -> R
  where
    F: FnOnce() -> R + Send,
    R: Send,
  {
    match &self.pool {
      Some(pool) => pool.install(op),
      None => op(),
    }
  }
}

impl std::fmt::Debug for WorkerPool {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("WorkerPool")
      .field("cores", &self.cores)
      .field("threads", &self.num_threads())
      .finish()
  }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
  use super::*;
  use rayon::prelude::*;

  #[test]
  fn test_from_raw() {
    assert_eq!(CoreCount::from_raw(-1), CoreCount::All);
    assert_eq!(CoreCount::from_raw(-8), CoreCount::All);
    assert_eq!(CoreCount::from_raw(0), CoreCount::Serial);
    assert_eq!(CoreCount::from_raw(1), CoreCount::Serial);
    assert_eq!(CoreCount::from_raw(3), CoreCount::Fixed(3));
  }

  #[test]
  fn test_fixed_pool_thread_count() {
    let pool = WorkerPool::new(CoreCount::Fixed(2)).unwrap();
    assert_eq!(pool.num_threads(), 2);
    let inside = pool.install(rayon::current_num_threads);
    assert_eq!(inside, 2);
  }

  #[test]
  fn test_serial_pool() {
    let pool = WorkerPool::new(CoreCount::Serial).unwrap();
    assert!(!pool.is_parallel());
    assert_eq!(pool.num_threads(), 1);
    assert_eq!(pool.install(|| 7), 7);
  }

  #[test]
  fn test_install_keeps_order() {
    let pool = WorkerPool::new(CoreCount::Fixed(3)).unwrap();
    let squares: Vec<u64> = pool.install(|| (0..100u64).into_par_iter().map(|i| i * i).collect());
    assert_eq!(squares[10], 100);
    assert_eq!(squares.len(), 100);
  }
}
