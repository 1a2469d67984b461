//! Graph handles: building, compression, cost sets and node attributes.

use std::ffi::CString;
use std::os::raw::c_char;

use spatial_engine::graph::cost_algorithms;
use spatial_engine::{CostAggregate, Direction, Graph, NO_EDGE};

use crate::registry::Registry;
use crate::{
    copy_out, cost_set_from, fail, node_id, point_from, slice_from, status_of, str_from, write_opt, GENERIC_ERROR,
    INVALID_PTR, OK,
};

/// A graph plus buffers whose pointers were handed to the host.
pub(crate) struct GraphState {
    pub(crate) graph: Graph,
    row_ptr: Vec<i32>,
    col_idx: Vec<i32>,
    attribute_values: Vec<CString>,
}

impl GraphState {
    pub(crate) fn new(graph: Graph) -> Self {
        Self {
            graph,
            row_ptr: Vec::new(),
            col_idx: Vec::new(),
            attribute_values: Vec::new(),
        }
    }
}

pub(crate) static GRAPHS: Registry<GraphState> = Registry::new("graph");

/// Run `f` on a graph, flattening lookup and call failures into one status.
fn with_graph<R>(graph: i32, f: impl FnOnce(&mut GraphState) -> Result<R, i32>) -> Result<R, i32> {
    GRAPHS.with(graph, f).and_then(|r| r)
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Create an empty open graph.
///
/// # Safety
/// - `out_handle` must point to a writable i32.
#[no_mangle]
pub unsafe extern "C" fn create_graph(out_handle: *mut i32) -> i32 {
    if out_handle.is_null() {
        return INVALID_PTR;
    }
    match GRAPHS.insert(GraphState::new(Graph::new())) {
        Ok(handle) => {
            *out_handle = handle;
            OK
        }
        Err(status) => status,
    }
}

/// Destroy a graph. Pointers obtained from it become invalid.
///
/// # Returns
/// - `OK` on success
/// - `NOT_FOUND` if the handle does not exist (including double destroy)
#[no_mangle]
pub extern "C" fn destroy_graph(graph: i32) -> i32 {
    GRAPHS.remove(graph)
}

/// Compress the graph. A no-op when already compressed.
#[no_mangle]
pub extern "C" fn graph_compress(graph: i32) -> i32 {
    status_of(GRAPHS.with(graph, |state| state.graph.compress()))
}

/// Drop every node, edge, cost set and attribute.
#[no_mangle]
pub extern "C" fn graph_clear(graph: i32) -> i32 {
    status_of(GRAPHS.with(graph, |state| state.graph.clear()))
}

// =============================================================================
// Edges
// =============================================================================

/// Add an edge between node ids.
///
/// Default-set edges reopen a compressed graph and may introduce new ids,
/// at most `MAX_ID_GAP` past the current node count. Other cost sets require
/// the graph to be compressed and the edge to exist already.
///
/// # Safety
/// - `cost_set` must be null or a NUL-terminated string.
///
/// # Returns
/// - `OK`
/// - `OUT_OF_RANGE` for a negative id or one too far past the node count
/// - `INVALID_COST_OPERATION` for a negative or NaN cost
#[no_mangle]
pub unsafe extern "C" fn graph_add_edge_from_ids(
    graph: i32,
    parent: i32,
    child: i32,
    cost: f32,
    cost_set: *const c_char,
) -> i32 {
    status_of(with_graph(graph, |state| {
        let (parent, child) = (node_id(parent)?, node_id(child)?);
        let cost_set = cost_set_from(cost_set)?;
        state.graph.add_edge_by_id(parent, child, cost, cost_set).map_err(fail)
    }))
}

/// Add an edge between positions (3 floats each), creating nodes as needed.
///
/// # Safety
/// - `parent` and `child` must each point to 3 floats.
/// - `cost_set` must be null or a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn graph_add_edge_from_points(
    graph: i32,
    parent: *const f32,
    child: *const f32,
    cost: f32,
    cost_set: *const c_char,
) -> i32 {
    status_of(with_graph(graph, |state| {
        let (parent, child) = (point_from(parent)?, point_from(child)?);
        let cost_set = cost_set_from(cost_set)?;
        state.graph.add_edge_from_points(parent, child, cost, cost_set).map_err(fail)
    }))
}

/// Cost of `parent -> child` in `cost_set`; `-1` when there is no such edge.
///
/// # Safety
/// - `cost_set` must be null or a NUL-terminated string.
/// - `out_cost` must point to a writable f32.
///
/// # Returns
/// - `OK`
/// - `NO_GRAPH` if the graph is not compressed
/// - `NO_COST` for an unknown cost set
#[no_mangle]
pub unsafe extern "C" fn graph_get_cost(
    graph: i32,
    parent: i32,
    child: i32,
    cost_set: *const c_char,
    out_cost: *mut f32,
) -> i32 {
    if out_cost.is_null() {
        return INVALID_PTR;
    }
    status_of(with_graph(graph, |state| {
        let cost_set = cost_set_from(cost_set)?;
        let compressed = state.graph.compressed().map_err(fail)?;
        *out_cost = match (node_id(parent), node_id(child)) {
            (Ok(p), Ok(c)) => compressed.get_cost(p, c, cost_set).map_err(fail)?,
            // Negative ids name no edge
            _ => compressed.cost_values(cost_set).map(|_| NO_EDGE).map_err(fail)?,
        };
        Ok(())
    }))
}

/// Expose the CSR arrays of a compressed graph for `cost_set`.
///
/// `out_values` points at `nnz` costs (`-1` where the set has no value),
/// `out_row_ptr` at `rows + 1` offsets and `out_col_idx` at `nnz` child ids.
/// The pointers stay valid until the next call on this graph.
///
/// # Safety
/// Every out pointer must be writable.
#[no_mangle]
pub unsafe extern "C" fn graph_get_csr_pointers(
    graph: i32,
    cost_set: *const c_char,
    out_nnz: *mut i32,
    out_rows: *mut i32,
    out_values: *mut *const f32,
    out_row_ptr: *mut *const i32,
    out_col_idx: *mut *const i32,
) -> i32 {
    if out_nnz.is_null()
        || out_rows.is_null()
        || out_values.is_null()
        || out_row_ptr.is_null()
        || out_col_idx.is_null()
    {
        return INVALID_PTR;
    }
    status_of(with_graph(graph, |state| {
        let cost_set = cost_set_from(cost_set)?;
        let csr = state.graph.csr(cost_set).map_err(fail)?;
        state.row_ptr = csr.row_ptr.iter().map(|&v| v as i32).collect();
        state.col_idx = csr.col_idx.iter().map(|&v| v as i32).collect();

        *out_nnz = csr.nnz() as i32;
        *out_rows = csr.rows() as i32;
        *out_values = csr.values.as_ptr();
        *out_row_ptr = state.row_ptr.as_ptr();
        *out_col_idx = state.col_idx.as_ptr();
        Ok(())
    }))
}

// =============================================================================
// Nodes
// =============================================================================

/// Number of nodes.
///
/// # Safety
/// - `out_count` must point to a writable i32.
#[no_mangle]
pub unsafe extern "C" fn graph_node_count(graph: i32, out_count: *mut i32) -> i32 {
    if out_count.is_null() {
        return INVALID_PTR;
    }
    status_of(GRAPHS.with(graph, |state| *out_count = state.graph.node_count() as i32))
}

/// Number of edges in the default cost set.
///
/// # Safety
/// - `out_count` must point to a writable i32.
#[no_mangle]
pub unsafe extern "C" fn graph_edge_count(graph: i32, out_count: *mut i32) -> i32 {
    if out_count.is_null() {
        return INVALID_PTR;
    }
    status_of(GRAPHS.with(graph, |state| *out_count = state.graph.edge_count() as i32))
}

/// Copy node positions (3 floats per node, id order) into `out_positions`.
/// Nodes created from ids alone report NaN coordinates.
///
/// # Safety
/// - `out_positions` must be valid for `capacity` floats.
/// - `out_count` may be null; otherwise it receives the node count.
#[no_mangle]
pub unsafe extern "C" fn graph_get_nodes(
    graph: i32,
    out_positions: *mut f32,
    capacity: i32,
    out_count: *mut i32,
) -> i32 {
    status_of(with_graph(graph, |state| {
        let nodes = match &state.graph {
            Graph::Open(builder) => builder.nodes(),
            Graph::Compressed(compressed) => compressed.nodes(),
        };
        let flat: Vec<f32> = nodes.iter().flat_map(|n| n.to_array()).collect();
        write_opt(out_count, nodes.len() as i32);
        copy_out(&flat, out_positions, capacity)
    }))
}

// =============================================================================
// Attributes
// =============================================================================

/// Store `values[i]` under `name` for node `ids[i]`.
///
/// # Safety
/// - `ids` must be valid for `id_count` ints, `values` for `value_count`
///   NUL-terminated strings.
/// - `name` must be a NUL-terminated string.
///
/// # Returns
/// - `OK`
/// - `LENGTH_MISMATCH` if the counts differ
/// - `OUT_OF_RANGE` for an id outside the graph
#[no_mangle]
pub unsafe extern "C" fn graph_add_node_attributes(
    graph: i32,
    ids: *const i32,
    id_count: i32,
    name: *const c_char,
    values: *const *const c_char,
    value_count: i32,
) -> i32 {
    status_of(with_graph(graph, |state| {
        let name = str_from(name)?;
        let ids = slice_from(ids, id_count)?
            .iter()
            .map(|&id| node_id(id))
            .collect::<Result<Vec<usize>, i32>>()?;
        let values = slice_from(values, value_count)?
            .iter()
            .map(|&v| str_from(v))
            .collect::<Result<Vec<&str>, i32>>()?;
        state.graph.add_node_attributes(&ids, name, &values).map_err(fail)
    }))
}

/// Read attribute `name` for every node (`""` where unset) as C strings.
///
/// String pointers stay valid until the next call on this graph. Unknown
/// names report zero values.
///
/// # Safety
/// - `name` must be a NUL-terminated string.
/// - `out_values` must be valid for `capacity` pointers.
/// - `out_count` must point to a writable i32.
#[no_mangle]
pub unsafe extern "C" fn graph_get_node_attributes(
    graph: i32,
    name: *const c_char,
    out_values: *mut *const c_char,
    capacity: i32,
    out_count: *mut i32,
) -> i32 {
    if out_count.is_null() {
        return INVALID_PTR;
    }
    status_of(with_graph(graph, |state| {
        let name = str_from(name)?;
        state.attribute_values = state
            .graph
            .node_attributes(name)
            .into_iter()
            .map(|v| CString::new(v).unwrap_or_default())
            .collect();
        let pointers: Vec<*const c_char> = state.attribute_values.iter().map(|s| s.as_ptr()).collect();
        *out_count = pointers.len() as i32;
        copy_out(&pointers, out_values, capacity)
    }))
}

/// Remove attribute `name` from every node.
///
/// # Safety
/// - `name` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn graph_clear_attribute(graph: i32, name: *const c_char) -> i32 {
    status_of(with_graph(graph, |state| {
        state.graph.clear_node_attribute(str_from(name)?);
        Ok(())
    }))
}

/// Turn numeric attribute values into cost set `cost_set`.
///
/// `direction`: 0 = value of the child, 1 = value of the parent, 2 = mean.
///
/// # Safety
/// - `attribute` and `cost_set` must be NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn graph_attrs_to_costs(
    graph: i32,
    attribute: *const c_char,
    cost_set: *const c_char,
    direction: i32,
) -> i32 {
    let Ok(direction) = Direction::try_from(direction) else {
        return GENERIC_ERROR;
    };
    status_of(with_graph(graph, |state| {
        let attribute = str_from(attribute)?;
        let cost_set = str_from(cost_set)?;
        state.graph.attrs_to_costs(attribute, cost_set, direction).map_err(fail)
    }))
}

/// Per-node reduction of `cost_set` into `out_values` (one per node).
///
/// `aggregate`: 0 = sum, 1 = average, 2 = count. `directed != 0` counts
/// incoming edges only; otherwise incoming and outgoing.
///
/// # Safety
/// - `cost_set` must be null or a NUL-terminated string.
/// - `out_values` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn graph_aggregate_costs(
    graph: i32,
    cost_set: *const c_char,
    aggregate: i32,
    directed: u8,
    out_values: *mut f32,
    capacity: i32,
) -> i32 {
    let Ok(aggregate) = CostAggregate::try_from(aggregate) else {
        return GENERIC_ERROR;
    };
    status_of(with_graph(graph, |state| {
        let cost_set = cost_set_from(cost_set)?;
        let values = state
            .graph
            .aggregate_costs(cost_set, aggregate, directed != 0)
            .map_err(fail)?;
        copy_out(&values, out_values, capacity)
    }))
}

/// Fill a derived cost set on a compressed graph.
///
/// `algorithm`: 0 = `"EnergyExpenditure"`, 1 = `"CrossSlope"`.
#[no_mangle]
pub extern "C" fn graph_calculate_cost_set(graph: i32, algorithm: i32) -> i32 {
    status_of(with_graph(graph, |state| {
        let compressed = state.graph.compressed_mut().map_err(fail)?;
        let computed = match algorithm {
            0 => cost_algorithms::energy_expenditure(compressed),
            1 => cost_algorithms::cross_slope(compressed),
            _ => return Err(GENERIC_ERROR),
        };
        computed.map(|_| ()).map_err(fail)
    }))
}
