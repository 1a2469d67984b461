//! Engine-agnostic metrics collection for analysis runs.
//!
//! Nothing is stored unless the `metrics` feature is on and
//! [`COLLECT_METRICS`] is set.
//!
//! # Usage
//!
//! ```ignore
//! use spatial_engine::metrics::{self, COLLECT_METRICS};
//!
//! // Pause collection without rebuilding
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! // Read what the engine has recorded so far:
//! if let Some(m) = metrics::snapshot() {
//!     println!("avg generation: {} us", m.generation_timings.average());
//! }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::{Mutex, OnceLock};

/// Runtime switch, only read when the `metrics` feature is compiled in.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Process-wide metrics store, created on first use.
static METRICS: OnceLock<Mutex<EngineMetrics>> = OnceLock::new();

/// True when samples are being recorded.
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Apply `update` to the shared metrics if collection is enabled.
///
/// A poisoned lock drops the sample instead of propagating the panic.
#[inline]
pub fn record(update: impl FnOnce(&mut EngineMetrics)) {
    if !is_enabled() {
        return;
    }
    let store = METRICS.get_or_init(|| Mutex::new(EngineMetrics::new()));
    if let Ok(mut metrics) = store.lock() {
        update(&mut metrics);
    }
}

/// Copy of the current metrics, `None` if nothing was recorded yet.
pub fn snapshot() -> Option<EngineMetrics> {
    METRICS.get()?.lock().ok().map(|m| m.clone())
}

/// Clear the shared metrics.
pub fn reset() {
    if let Some(store) = METRICS.get() {
        if let Ok(mut metrics) = store.lock() {
            metrics.reset();
        }
    }
}

/// Recent timings in microseconds, newest last, with a running total.
#[derive(Debug, Clone)]
pub struct TimingWindow {
    samples: VecDeque<u64>,
    limit: usize,
    total: u64,
}

impl TimingWindow {
    /// Samples kept per stage.
    pub const DEFAULT_LIMIT: usize = 128;

    pub fn new(limit: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(limit),
            limit: limit.max(1),
            total: 0,
        }
    }

    /// Record `us`, dropping the oldest sample once the window is full.
    pub fn push(&mut self, us: u64) {
        if self.samples.len() == self.limit {
            if let Some(dropped) = self.samples.pop_front() {
                self.total -= dropped;
            }
        }
        self.samples.push_back(us);
        self.total += us;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.total = 0;
    }

    pub fn sum(&self) -> u64 {
        self.total
    }

    pub fn last(&self) -> Option<u64> {
        self.samples.back().copied()
    }

    /// Mean of the kept samples, 0 when empty.
    pub fn average(&self) -> f64 {
        match self.samples.len() {
            0 => 0.0,
            n => self.total as f64 / n as f64,
        }
    }

    pub fn min_max(&self) -> Option<(u64, u64)> {
        self.samples.iter().fold(None, |acc, &us| match acc {
            None => Some((us, us)),
            Some((lo, hi)) => Some((lo.min(us), hi.max(us))),
        })
    }
}

impl Default for TimingWindow {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT)
    }
}

/// Timings and counters for every analysis stage.
#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    // Timing (microseconds)
    /// Geometry index builds.
    pub index_build_timings: TimingWindow,
    /// Graph generation runs.
    pub generation_timings: TimingWindow,
    /// Pathfinding calls (single, batched or all-pairs).
    pub pathfinding_timings: TimingWindow,
    /// View analysis calls.
    pub view_timings: TimingWindow,
    /// Visibility graph builds.
    pub visibility_timings: TimingWindow,

    // Cumulative counters
    pub total_index_builds: u64,
    /// Rays fired through batched calls.
    pub total_rays: u64,
    pub total_nodes_generated: u64,
    pub total_paths: u64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset timings; cumulative counters survive.
    pub fn reset(&mut self) {
        self.index_build_timings.clear();
        self.generation_timings.clear();
        self.pathfinding_timings.clear();
        self.view_timings.clear();
        self.visibility_timings.clear();
    }

    pub fn record_index_build(&mut self, timing_us: u64) {
        self.index_build_timings.push(timing_us);
        self.total_index_builds += 1;
    }

    pub fn record_rays(&mut self, count: usize) {
        self.total_rays += count as u64;
    }

    pub fn record_generation(&mut self, timing_us: u64, nodes: usize) {
        self.generation_timings.push(timing_us);
        self.total_nodes_generated += nodes as u64;
    }

    pub fn record_pathfinding(&mut self, timing_us: u64, paths: usize) {
        self.pathfinding_timings.push(timing_us);
        self.total_paths += paths as u64;
    }

    pub fn record_view(&mut self, timing_us: u64, rays: usize) {
        self.view_timings.push(timing_us);
        self.total_rays += rays as u64;
    }

    pub fn record_visibility(&mut self, timing_us: u64, rays: usize) {
        self.visibility_timings.push(timing_us);
        self.total_rays += rays as u64;
    }
}
