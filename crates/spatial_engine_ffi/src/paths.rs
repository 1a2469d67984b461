//! Path handles and all-pairs path queries.

use std::os::raw::c_char;

use spatial_engine::{
    all_to_all_paths, distance_and_predecessor, shortest_path, shortest_paths, Path,
};

use crate::graph::GRAPHS;
use crate::registry::Registry;
use crate::{
    copy_out, cost_set_from, fail, node_id, slice_from, status_of, write_opt, INVALID_PTR, LENGTH_MISMATCH, NO_PATH, OK,
};

/// One path step as seen by the host.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FfiPathMember {
    /// Cost of the edge to the next member, `0` on the last member.
    pub cost: f32,
    pub node: i32,
}

/// Members of a stored path, converted once at creation.
pub(crate) static PATHS: Registry<Vec<FfiPathMember>> = Registry::new("path");

fn members_of(path: &Path) -> Vec<FfiPathMember> {
    path.members()
        .iter()
        .map(|m| FfiPathMember {
            cost: m.cost_to_next,
            node: m.node as i32,
        })
        .collect()
}

/// Run `f` on the compressed form of `graph`.
fn with_compressed<R>(
    graph: i32,
    f: impl FnOnce(&spatial_engine::CompressedGraph) -> spatial_engine::Result<R>,
) -> Result<R, i32> {
    GRAPHS
        .with(graph, |state| state.graph.compressed().and_then(f).map_err(fail))
        .and_then(|r| r)
}

/// Register `paths` and write a handle and member count per slot; missing
/// paths get handle 0 and size 0.
unsafe fn store_all(paths: Vec<Option<Path>>, out_paths: *mut i32, out_sizes: *mut i32) -> Result<(), i32> {
    if paths.is_empty() {
        return Ok(());
    }
    let mut handles = Vec::with_capacity(paths.len());
    let mut sizes = Vec::with_capacity(paths.len());
    for path in paths {
        match path {
            Some(path) => {
                sizes.push(path.len() as i32);
                handles.push(PATHS.insert(members_of(&path))?);
            }
            None => {
                sizes.push(0);
                handles.push(0);
            }
        }
    }
    std::ptr::copy_nonoverlapping(handles.as_ptr(), out_paths, handles.len());
    std::ptr::copy_nonoverlapping(sizes.as_ptr(), out_sizes, sizes.len());
    Ok(())
}

/// Cheapest path from `start` to `end` over `cost_set`.
///
/// # Safety
/// - `cost_set` must be null or a NUL-terminated string.
/// - `out_path` and `out_size` must point to writable i32s.
///
/// # Returns
/// - `OK` with the path handle and its member count
/// - `NO_PATH` if `end` is unreachable (nothing is allocated)
/// - `NO_GRAPH`, `NO_COST`, `OUT_OF_RANGE` for bad inputs
#[no_mangle]
pub unsafe extern "C" fn create_path(
    graph: i32,
    start: i32,
    end: i32,
    cost_set: *const c_char,
    out_path: *mut i32,
    out_size: *mut i32,
) -> i32 {
    if out_path.is_null() || out_size.is_null() {
        return INVALID_PTR;
    }
    let found = cost_set_from(cost_set).and_then(|cost_set| {
        let (start, end) = (node_id(start)?, node_id(end)?);
        with_compressed(graph, |g| shortest_path(g, start, end, cost_set))
    });
    match found {
        Ok(Some(path)) => {
            let size = path.len() as i32;
            match PATHS.insert(members_of(&path)) {
                Ok(handle) => {
                    *out_path = handle;
                    *out_size = size;
                    OK
                }
                Err(status) => status,
            }
        }
        Ok(None) => {
            *out_path = 0;
            *out_size = 0;
            NO_PATH
        }
        Err(status) => status,
    }
}

/// Batched paths for `starts[i] -> ends[i]`.
///
/// Slot `i` of `out_paths` / `out_sizes` receives a path handle and member
/// count, or 0 and 0 when no path exists.
///
/// # Safety
/// - `starts` and `ends` must be valid for `count` ints.
/// - `out_paths` and `out_sizes` must be valid for `count` writes.
#[no_mangle]
pub unsafe extern "C" fn create_paths(
    graph: i32,
    starts: *const i32,
    ends: *const i32,
    count: i32,
    cost_set: *const c_char,
    out_paths: *mut i32,
    out_sizes: *mut i32,
) -> i32 {
    if count > 0 && (out_paths.is_null() || out_sizes.is_null()) {
        return INVALID_PTR;
    }
    status_of(batched(graph, starts, ends, count, cost_set, out_paths, out_sizes))
}

unsafe fn batched(
    graph: i32,
    starts: *const i32,
    ends: *const i32,
    count: i32,
    cost_set: *const c_char,
    out_paths: *mut i32,
    out_sizes: *mut i32,
) -> Result<(), i32> {
    let cost_set = cost_set_from(cost_set)?;
    let ids = |raw: &[i32]| raw.iter().map(|&id| node_id(id)).collect::<Result<Vec<usize>, i32>>();
    let starts = ids(slice_from(starts, count)?)?;
    let ends = ids(slice_from(ends, count)?)?;
    let paths = with_compressed(graph, |g| shortest_paths(g, &starts, &ends, cost_set))?;
    store_all(paths, out_paths, out_sizes)
}

/// Paths between every ordered pair of nodes, row-major (`start * n + end`).
///
/// # Safety
/// - `out_paths` and `out_sizes` must be valid for `capacity` writes.
/// - `out_count` may be null; otherwise it receives `n * n`.
#[no_mangle]
pub unsafe extern "C" fn create_all_to_all_paths(
    graph: i32,
    cost_set: *const c_char,
    out_paths: *mut i32,
    out_sizes: *mut i32,
    capacity: i32,
    out_count: *mut i32,
) -> i32 {
    status_of(all_pairs(graph, cost_set, out_paths, out_sizes, capacity, out_count))
}

unsafe fn all_pairs(
    graph: i32,
    cost_set: *const c_char,
    out_paths: *mut i32,
    out_sizes: *mut i32,
    capacity: i32,
    out_count: *mut i32,
) -> Result<(), i32> {
    let cost_set = cost_set_from(cost_set)?;
    let paths = with_compressed(graph, |g| all_to_all_paths(g, cost_set))?;
    write_opt(out_count, paths.len() as i32);
    if paths.is_empty() {
        return Ok(());
    }
    if out_paths.is_null() || out_sizes.is_null() {
        return Err(INVALID_PTR);
    }
    if (capacity.max(0) as usize) < paths.len() {
        return Err(LENGTH_MISMATCH);
    }
    store_all(paths.into_vec(), out_paths, out_sizes)
}

/// All-pairs cheapest costs and predecessors, row-major `n * n`.
///
/// Unreachable pairs report `-1` in both arrays; the diagonal has cost 0 and
/// the node itself as predecessor.
///
/// # Safety
/// - `out_distances` and `out_predecessors` must be valid for `capacity`
///   writes.
#[no_mangle]
pub unsafe extern "C" fn calculate_distance_and_predecessor(
    graph: i32,
    cost_set: *const c_char,
    out_distances: *mut f32,
    out_predecessors: *mut i32,
    capacity: i32,
) -> i32 {
    let computed = cost_set_from(cost_set)
        .and_then(|cost_set| with_compressed(graph, |g| distance_and_predecessor(g, cost_set)));
    let (distances, predecessors) = match computed {
        Ok(buffers) => buffers,
        Err(status) => return status,
    };
    status_of(
        copy_out(distances.as_slice(), out_distances, capacity)
            .and_then(|()| copy_out(predecessors.as_slice(), out_predecessors, capacity)),
    )
}

/// Borrow the members of a path.
///
/// # Safety
/// - `out_members` and `out_size` must be writable. The member pointer stays
///   valid until the path is destroyed.
#[no_mangle]
pub unsafe extern "C" fn path_members(path: i32, out_members: *mut *const FfiPathMember, out_size: *mut i32) -> i32 {
    if out_members.is_null() || out_size.is_null() {
        return INVALID_PTR;
    }
    status_of(PATHS.with(path, |members| {
        *out_members = members.as_ptr();
        *out_size = members.len() as i32;
    }))
}

/// Destroy a path.
///
/// # Returns
/// - `OK` on success
/// - `NOT_FOUND` if the handle does not exist (including double destroy)
#[no_mangle]
pub extern "C" fn destroy_path(path: i32) -> i32 {
    PATHS.remove(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_graph, destroy_graph, graph_add_edge_from_ids, graph_compress, NOT_FOUND, NO_GRAPH, OUT_OF_RANGE};

    /// `0->1 (100), 0->2 (50), 1->3 (10), 2->3 (10)`, compressed.
    unsafe fn diamond() -> i32 {
        let mut graph = 0;
        create_graph(&mut graph);
        for (p, c, cost) in [(0, 1, 100.0), (0, 2, 50.0), (1, 3, 10.0), (2, 3, 10.0)] {
            assert_eq!(graph_add_edge_from_ids(graph, p, c, cost, std::ptr::null()), OK);
        }
        graph_compress(graph);
        graph
    }

    unsafe fn members(path: i32) -> Vec<(i32, f32)> {
        let mut ptr = std::ptr::null();
        let mut size = 0;
        assert_eq!(path_members(path, &mut ptr, &mut size), OK);
        std::slice::from_raw_parts(ptr, size as usize)
            .iter()
            .map(|m| (m.node, m.cost))
            .collect()
    }

    #[test]
    fn test_path_lifecycle() {
        unsafe {
            let graph = diamond();
            let (mut path, mut size) = (0, 0);
            assert_eq!(create_path(graph, 0, 3, std::ptr::null(), &mut path, &mut size), OK);
            assert_eq!(size, 3);
            assert_eq!(members(path), vec![(0, 50.0), (2, 10.0), (3, 0.0)]);
            // Same layout as a `{ float cost; int node; }` struct
            assert_eq!(std::mem::size_of::<FfiPathMember>(), 8);
            assert_eq!(std::mem::align_of::<FfiPathMember>(), 4);

            assert_eq!(destroy_path(path), OK);
            assert_eq!(destroy_path(path), NOT_FOUND, "Double destroy should return NOT_FOUND");
            destroy_graph(graph);
        }
    }

    #[test]
    fn test_path_status_codes() {
        unsafe {
            let graph = diamond();
            let (mut path, mut size) = (0, 0);
            assert_eq!(create_path(graph, 3, 0, std::ptr::null(), &mut path, &mut size), NO_PATH);
            assert_eq!((path, size), (0, 0));
            assert_eq!(create_path(graph, 0, 9, std::ptr::null(), &mut path, &mut size), OUT_OF_RANGE);
            assert_eq!(create_path(graph, -1, 0, std::ptr::null(), &mut path, &mut size), OUT_OF_RANGE);

            let mut open = 0;
            create_graph(&mut open);
            graph_add_edge_from_ids(open, 0, 1, 1.0, std::ptr::null());
            assert_eq!(create_path(open, 0, 1, std::ptr::null(), &mut path, &mut size), NO_GRAPH);
            destroy_graph(open);
            destroy_graph(graph);
        }
    }

    #[test]
    fn test_batched_paths() {
        unsafe {
            let graph = diamond();
            let starts = [0, 0, 3];
            let ends = [3, 1, 0];
            let mut paths = [-5; 3];
            let mut sizes = [-5; 3];
            let status = create_paths(graph, starts.as_ptr(), ends.as_ptr(), 3, std::ptr::null(), paths.as_mut_ptr(), sizes.as_mut_ptr());
            assert_eq!(status, OK);
            assert_eq!(sizes, [3, 2, 0]);
            assert_eq!(paths[2], 0);
            assert_eq!(members(paths[1]), vec![(0, 100.0), (1, 0.0)]);
            destroy_path(paths[0]);
            destroy_path(paths[1]);
            destroy_graph(graph);
        }
    }

    #[test]
    fn test_all_pairs() {
        unsafe {
            let graph = diamond();
            let mut paths = [0; 16];
            let mut sizes = [0; 16];
            let mut count = 0;
            assert_eq!(create_all_to_all_paths(graph, std::ptr::null(), paths.as_mut_ptr(), sizes.as_mut_ptr(), 16, &mut count), OK);
            assert_eq!(count, 16);
            // Row 0 reaches everything, row 3 only itself
            assert_eq!(&sizes[0..4], &[1, 2, 2, 3]);
            assert_eq!(&sizes[12..16], &[0, 0, 0, 1]);
            for handle in paths.into_iter().filter(|&h| h != 0) {
                destroy_path(handle);
            }

            let mut distances = [0.0f32; 16];
            let mut predecessors = [0i32; 16];
            let status = calculate_distance_and_predecessor(graph, std::ptr::null(), distances.as_mut_ptr(), predecessors.as_mut_ptr(), 16);
            assert_eq!(status, OK);
            assert_eq!(&distances[0..4], &[0.0, 100.0, 50.0, 60.0]);
            assert_eq!(&predecessors[0..4], &[0, 0, 0, 2]);
            assert_eq!(distances[3 * 4], -1.0);
            destroy_graph(graph);
        }
    }
}
