//! C ABI bridge for spatial_engine.
//!
//! The host owns nothing but integer handles. Every piece of engine state
//! (geometry indices, graphs, paths) lives in a Rust-side handle table and is
//! released by exactly one matching `destroy_*` call.
//!
//! # Conventions
//!
//! ```text
//! Host                                     Rust (spatial_engine_ffi)
//! ┌──────────────────────┐                 ┌──────────────────────────┐
//! │ create_index(...) ───┼── out_handle ──►│ INDICES: Arc<Index>      │
//! │ generate_graph(...) ─┼── out_graph ───►│ GRAPHS:  Graph + buffers │
//! │ create_path(...) ────┼── out_path ────►│ PATHS:   Path            │
//! │                      │                 │                          │
//! │ read pointers ◄──────┼── *const T ─────│ retained Vecs            │
//! │ destroy_*(handle) ───┼────────────────►│ drop state               │
//! └──────────────────────┘                 └──────────────────────────┘
//! ```
//!
//! - Every call returns a status code ([`OK`] on success, see the constants
//!   below). Results go through caller-provided out pointers.
//! - Points are packed `x, y, z` float triples; counts are in points.
//! - Caller buffers come with a capacity; too small a buffer fails with
//!   [`LENGTH_MISMATCH`] and writes nothing.
//! - Pointers handed out stay valid until the next call on the same handle
//!   or its destruction.
//! - A null or empty cost set name means `"Distance"`.
//!
//! # Metrics
//!
//! Built with the `metrics` feature by default. Call
//! `spatial_engine_get_metrics()` for per-stage timings (128-sample rolling
//! windows) and cumulative counters.

use std::ffi::CStr;
use std::os::raw::c_char;

use glam::Vec3;

use spatial_engine::metrics::TimingWindow;
use spatial_engine::{EngineError, DEFAULT_COST_SET};

mod analysis;
mod graph;
mod index;
mod paths;
mod registry;

pub use analysis::*;
pub use graph::*;
pub use index::*;
pub use paths::*;

// =============================================================================
// Status codes
// =============================================================================

pub const OK: i32 = 1;
pub const GENERIC_ERROR: i32 = 0;
pub const NOT_FOUND: i32 = -1;
pub const INVALID_MESH: i32 = -2;
/// No graph was produced, or the graph is not compressed yet.
pub const NO_GRAPH: i32 = -3;
pub const NO_COST: i32 = -4;
pub const INVALID_PTR: i32 = -9;
pub const OUT_OF_RANGE: i32 = -10;
pub const NO_PATH: i32 = -11;
pub const INVALID_COST_OPERATION: i32 = -12;
pub const LENGTH_MISMATCH: i32 = -13;
pub const INVALID_ATTRIBUTE: i32 = -14;
pub const LOCK_POISONED: i32 = -15;

/// Log an engine error and turn it into its status code.
pub(crate) fn fail(err: EngineError) -> i32 {
    let status = err.status();
    tracing::warn!(%err, status, "call failed");
    status
}

/// Collapse a `Result` carrying a status code into that code.
pub(crate) fn status_of(result: Result<(), i32>) -> i32 {
    match result {
        Ok(()) => OK,
        Err(status) => status,
    }
}

// =============================================================================
// Pointer helpers
// =============================================================================

/// Borrow `len` elements at `ptr`. A zero length never touches `ptr`.
///
/// # Safety
/// `ptr` must be valid for `len` reads when `len > 0`.
pub(crate) unsafe fn slice_from<'a, T>(ptr: *const T, len: i32) -> Result<&'a [T], i32> {
    match len {
        0 => Ok(&[]),
        n if n < 0 || ptr.is_null() => Err(INVALID_PTR),
        n => Ok(std::slice::from_raw_parts(ptr, n as usize)),
    }
}

/// Read `count` packed float triples.
///
/// # Safety
/// `ptr` must be valid for `3 * count` reads when `count > 0`.
pub(crate) unsafe fn points_from(ptr: *const f32, count: i32) -> Result<Vec<Vec3>, i32> {
    let floats = slice_from(ptr, count.saturating_mul(3))?;
    Ok(floats.chunks_exact(3).map(Vec3::from_slice).collect())
}

/// Read one packed float triple.
///
/// # Safety
/// `ptr` must be null or valid for three reads.
pub(crate) unsafe fn point_from(ptr: *const f32) -> Result<Vec3, i32> {
    if ptr.is_null() {
        return Err(INVALID_PTR);
    }
    Ok(Vec3::from_slice(std::slice::from_raw_parts(ptr, 3)))
}

/// Read a NUL-terminated UTF-8 string.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
pub(crate) unsafe fn str_from<'a>(ptr: *const c_char) -> Result<&'a str, i32> {
    if ptr.is_null() {
        return Err(INVALID_PTR);
    }
    CStr::from_ptr(ptr).to_str().map_err(|_| INVALID_PTR)
}

/// Cost set name, defaulting to `"Distance"` when null or empty.
///
/// # Safety
/// As [`str_from`].
pub(crate) unsafe fn cost_set_from<'a>(ptr: *const c_char) -> Result<&'a str, i32> {
    if ptr.is_null() {
        return Ok(DEFAULT_COST_SET);
    }
    match str_from(ptr)? {
        "" => Ok(DEFAULT_COST_SET),
        name => Ok(name),
    }
}

/// Node id from the host; negative ids are never valid.
pub(crate) fn node_id(raw: i32) -> Result<usize, i32> {
    usize::try_from(raw).map_err(|_| OUT_OF_RANGE)
}

/// Copy `values` into a caller buffer of `capacity` elements.
///
/// # Safety
/// `out` must be valid for `capacity` writes.
pub(crate) unsafe fn copy_out<T: Copy>(values: &[T], out: *mut T, capacity: i32) -> Result<(), i32> {
    if values.is_empty() {
        return Ok(());
    }
    if out.is_null() {
        return Err(INVALID_PTR);
    }
    if (capacity.max(0) as usize) < values.len() {
        return Err(LENGTH_MISMATCH);
    }
    std::ptr::copy_nonoverlapping(values.as_ptr(), out, values.len());
    Ok(())
}

/// Write `value` through `out` if it is non-null.
///
/// # Safety
/// `out` must be null or valid for one write.
pub(crate) unsafe fn write_opt<T>(out: *mut T, value: T) {
    if !out.is_null() {
        *out = value;
    }
}

// =============================================================================
// Version & metrics
// =============================================================================

/// Returns the library version as a packed u32: 0xMMmmpp (major.minor.patch).
#[no_mangle]
pub extern "C" fn spatial_engine_version() -> u32 {
    0x000100 // v0.1.0
}

/// Summary of one stage's recent timings, all in microseconds.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FfiTimingStats {
    pub last_us: u64,
    pub avg_us: u64,
    pub min_us: u64,
    pub max_us: u64,
    /// Samples behind the summary, at most `TimingWindow::DEFAULT_LIMIT`.
    pub sample_count: u32,
    pub _pad: u32,
}

impl From<&TimingWindow> for FfiTimingStats {
    fn from(window: &TimingWindow) -> Self {
        let (min_us, max_us) = window.min_max().unwrap_or_default();
        Self {
            last_us: window.last().unwrap_or_default(),
            avg_us: window.average().round() as u64,
            min_us,
            max_us,
            sample_count: window.len() as u32,
            _pad: 0,
        }
    }
}

/// Process-wide metrics snapshot for FFI export.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FfiMetricsSnapshot {
    // Timing histograms
    pub index_build: FfiTimingStats,
    pub generation: FfiTimingStats,
    pub pathfinding: FfiTimingStats,
    pub view: FfiTimingStats,
    pub visibility: FfiTimingStats,

    // Operation counts (cumulative)
    pub total_index_builds: u64,
    pub total_rays: u64,
    pub total_nodes_generated: u64,
    pub total_paths: u64,
}

/// Get the current metrics snapshot.
///
/// # Safety
/// - `out` must point to a valid FfiMetricsSnapshot struct.
///
/// # Returns
/// - `OK`, with zeros if nothing was recorded yet
/// - `INVALID_PTR` if out is null
/// - `GENERIC_ERROR` if the metrics feature is not enabled
#[no_mangle]
pub unsafe extern "C" fn spatial_engine_get_metrics(out: *mut FfiMetricsSnapshot) -> i32 {
    #[cfg(not(feature = "metrics"))]
    {
        let _ = out;
        return GENERIC_ERROR;
    }

    #[cfg(feature = "metrics")]
    {
        if out.is_null() {
            return INVALID_PTR;
        }
        let snapshot = spatial_engine::metrics::snapshot().unwrap_or_default();
        *out = FfiMetricsSnapshot {
            index_build: (&snapshot.index_build_timings).into(),
            generation: (&snapshot.generation_timings).into(),
            pathfinding: (&snapshot.pathfinding_timings).into(),
            view: (&snapshot.view_timings).into(),
            visibility: (&snapshot.visibility_timings).into(),
            total_index_builds: snapshot.total_index_builds,
            total_rays: snapshot.total_rays,
            total_nodes_generated: snapshot.total_nodes_generated,
            total_paths: snapshot.total_paths,
        };
        OK
    }
}

/// Clear timing windows. Cumulative counters are kept.
#[no_mangle]
pub extern "C" fn spatial_engine_reset_metrics() -> i32 {
    spatial_engine::metrics::reset();
    OK
}

// =============================================================================
// Test scenes
// =============================================================================


// =============================================================================
// Tests
// =============================================================================
