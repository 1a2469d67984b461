//! Analyses that read a geometry index: graph generation, view analysis and
//! visibility graphs.

use glam::Vec3;

use spatial_engine::view::spherical_distribute as view_directions;
use spatial_engine::{
    generate, view_analysis_aggregate, visibility, CompressedGraph, CoreCount, GeneratorConfig,
    RayResult, ViewAggregate, ViewAnalysis, ViewConfig, VisibilityConfig,
};

use crate::graph::{GraphState, GRAPHS};
use crate::index::INDICES;
use crate::{
    copy_out, fail, point_from, points_from, slice_from, status_of, write_opt, GENERIC_ERROR, INVALID_PTR,
    LENGTH_MISMATCH, NO_GRAPH, OK,
};

// =============================================================================
// FFI Types
// =============================================================================

/// Generation settings passed from the host.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct FfiGeneratorConfig {
    /// Horizontal spacing between nodes.
    pub spacing_x: f32,
    pub spacing_y: f32,
    /// Height above each parent from which ground rays are cast.
    pub spacing_z: f32,
    /// Cap on expanded parents; `<= 0` means unlimited.
    pub max_nodes: i32,
    pub up_step: f32,
    pub down_step: f32,
    /// Degrees.
    pub up_slope: f32,
    /// Degrees.
    pub down_slope: f32,
    /// Neighbor ring count (1 = the 8 compass neighbors).
    pub step_connection: i32,
    /// `0`/`1` = serial, negative = all cores, `n` = `n` threads.
    pub cores: i32,
    /// Meshes that are never walkable (null when `obstacle_count` is 0).
    pub obstacle_ids: *const i32,
    pub obstacle_count: i32,
}

impl FfiGeneratorConfig {
    unsafe fn to_config(self) -> Result<GeneratorConfig, i32> {
        let obstacles = slice_from(self.obstacle_ids, self.obstacle_count)?;
        Ok(GeneratorConfig::default()
            .with_spacing(Vec3::new(self.spacing_x, self.spacing_y, self.spacing_z))
            .with_max_nodes(self.max_nodes.max(0) as usize)
            .with_steps(self.up_step, self.down_step)
            .with_slopes(self.up_slope, self.down_slope)
            .with_step_connection(self.step_connection.max(1) as u32)
            .with_obstacles(obstacles.iter().copied())
            .with_cores(CoreCount::from_raw(self.cores)))
    }
}

/// View analysis settings passed from the host.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct FfiViewConfig {
    /// Requested rays per node before field-of-view filtering.
    pub ray_count: i32,
    /// Degrees above the horizon.
    pub up_fov: f32,
    /// Degrees below the horizon.
    pub down_fov: f32,
    /// Eye height above each node.
    pub height: f32,
}

impl From<FfiViewConfig> for ViewConfig {
    fn from(cfg: FfiViewConfig) -> Self {
        ViewConfig::default()
            .with_ray_count(cfg.ray_count.max(0) as usize)
            .with_fov(cfg.up_fov, cfg.down_fov)
            .with_height(cfg.height)
    }
}

/// Store an optional graph and report its handle (0 and `NO_GRAPH` for
/// `None`).
unsafe fn store_graph(graph: Option<CompressedGraph>, out_graph: *mut i32) -> i32 {
    let Some(graph) = graph else {
        *out_graph = 0;
        return NO_GRAPH;
    };
    match GRAPHS.insert(GraphState::new(graph.into())) {
        Ok(handle) => {
            *out_graph = handle;
            OK
        }
        Err(status) => status,
    }
}

// =============================================================================
// Generation
// =============================================================================

/// Grow a walkable graph over `index` from `start` (3 floats).
///
/// The result is compressed. A null `config` uses the defaults.
///
/// # Safety
/// - `start` must point to 3 floats.
/// - `config` must be null or point to a valid FfiGeneratorConfig.
/// - `out_graph` must point to a writable i32.
///
/// # Returns
/// - `OK` with the new graph handle
/// - `NO_GRAPH` if nothing walkable was found from `start`
#[no_mangle]
pub unsafe extern "C" fn generate_graph(
    index: i32,
    start: *const f32,
    config: *const FfiGeneratorConfig,
    out_graph: *mut i32,
) -> i32 {
    if out_graph.is_null() {
        return INVALID_PTR;
    }
    let start = match point_from(start) {
        Ok(start) => start,
        Err(status) => return status,
    };
    let config = if config.is_null() {
        GeneratorConfig::default()
    } else {
        match (*config).to_config() {
            Ok(config) => config,
            Err(status) => return status,
        }
    };

    match INDICES.get(index).map(|state| generate(&state, start, config).map_err(fail)) {
        Ok(Ok(graph)) => store_graph(graph, out_graph),
        Ok(Err(status)) | Err(status) => status,
    }
}

// =============================================================================
// View analysis
// =============================================================================

/// Directions a view analysis with these settings fires, as 3 floats each.
///
/// Call with a null `out_directions` to learn the count first.
///
/// # Safety
/// - `out_directions` must be null or valid for `capacity` floats.
/// - `out_count` must point to a writable i32.
#[no_mangle]
pub unsafe extern "C" fn spherical_distribute(
    ray_count: i32,
    up_fov: f32,
    down_fov: f32,
    out_directions: *mut f32,
    capacity: i32,
    out_count: *mut i32,
) -> i32 {
    if out_count.is_null() {
        return INVALID_PTR;
    }
    let directions = view_directions(ray_count.max(0) as usize, up_fov, down_fov);
    *out_count = directions.len() as i32;
    if out_directions.is_null() {
        return OK;
    }
    let flat: Vec<f32> = directions.iter().flat_map(|d| d.to_array()).collect();
    status_of(copy_out(&flat, out_directions, capacity))
}

/// Score each node by aggregating the hit distances of its view rays.
///
/// `aggregate`: 0 = count, 1 = sum, 2 = average, 3 = max, 4 = min. Misses
/// never contribute; nodes without hits score 0.
///
/// # Safety
/// - `nodes` must be valid for `node_count` points.
/// - `config` must point to a valid FfiViewConfig.
/// - `out_scores` must be valid for `capacity` floats.
#[no_mangle]
pub unsafe extern "C" fn spherical_view_analysis_aggregate(
    index: i32,
    nodes: *const f32,
    node_count: i32,
    config: *const FfiViewConfig,
    aggregate: i32,
    out_scores: *mut f32,
    capacity: i32,
) -> i32 {
    if config.is_null() {
        return INVALID_PTR;
    }
    let Ok(aggregate) = ViewAggregate::try_from(aggregate) else {
        return GENERIC_ERROR;
    };
    let nodes = match points_from(nodes, node_count) {
        Ok(nodes) => nodes,
        Err(status) => return status,
    };
    if (capacity.max(0) as usize) < nodes.len() {
        return LENGTH_MISMATCH;
    }
    let view = ViewConfig::from(*config);

    match INDICES.get(index).map(|state| view_analysis_aggregate(&state, &nodes, view, aggregate)) {
        Ok(scores) => status_of(copy_out(&scores, out_scores, capacity)),
        Err(status) => status,
    }
}

/// Raw view results: `node_count` rows of one RayResult per direction.
///
/// `out_rays_per_node` receives the realized direction count (see
/// [`spherical_distribute`]), also when the buffer is too small. The buffer
/// must hold `node_count * rays_per_node` results; a smaller one returns
/// `LENGTH_MISMATCH` before any ray is cast.
///
/// # Safety
/// - `nodes` must be valid for `node_count` points.
/// - `config` must point to a valid FfiViewConfig.
/// - `out_results` must be valid for `capacity` RayResults.
/// - `out_rays_per_node` must point to a writable i32.
#[no_mangle]
pub unsafe extern "C" fn spherical_view_analysis_no_aggregate(
    index: i32,
    nodes: *const f32,
    node_count: i32,
    config: *const FfiViewConfig,
    out_results: *mut RayResult,
    capacity: i32,
    out_rays_per_node: *mut i32,
) -> i32 {
    if config.is_null() || out_rays_per_node.is_null() {
        return INVALID_PTR;
    }
    let nodes = match points_from(nodes, node_count) {
        Ok(nodes) => nodes,
        Err(status) => return status,
    };
    let state = match INDICES.get(index) {
        Ok(state) => state,
        Err(status) => return status,
    };
    let analysis = ViewAnalysis::new(&state, ViewConfig::from(*config));
    let rays_per_node = analysis.directions().len();
    *out_rays_per_node = rays_per_node as i32;
    if (capacity.max(0) as usize) < nodes.len() * rays_per_node {
        return LENGTH_MISMATCH;
    }

    match analysis.ray_results(&nodes) {
        Ok(grid) => status_of(copy_out(grid.as_slice(), out_results, capacity)),
        Err(err) => fail(err),
    }
}

// =============================================================================
// Visibility graphs
// =============================================================================

/// Visibility graph between every pair of `points`.
///
/// Node `i` is `points[i]`. `directed == 0` stores each visible pair once,
/// on the lower id.
///
/// # Safety
/// - `points` must be valid for `count` points.
/// - `out_graph` must point to a writable i32.
///
/// # Returns
/// - `OK` with the new (compressed) graph handle
/// - `NO_GRAPH` if no pair is visible
#[no_mangle]
pub unsafe extern "C" fn visibility_all_to_all(
    index: i32,
    points: *const f32,
    count: i32,
    height: f32,
    directed: u8,
    out_graph: *mut i32,
) -> i32 {
    if out_graph.is_null() {
        return INVALID_PTR;
    }
    let points = match points_from(points, count) {
        Ok(points) => points,
        Err(status) => return status,
    };
    let config = VisibilityConfig::default().with_height(height);

    match INDICES.get(index).map(|state| visibility::all_to_all(&state, &points, config, directed != 0)) {
        Ok(graph) => store_graph(graph, out_graph),
        Err(status) => status,
    }
}

/// Visibility graph from every point of group A to every point of group B.
///
/// Ids `0..a_count` are group A, then group B. Edges run from A to B only.
///
/// # Safety
/// - `group_a` / `group_b` must be valid for their counts in points.
/// - `out_graph` must point to a writable i32.
#[no_mangle]
pub unsafe extern "C" fn visibility_group_to_group(
    index: i32,
    group_a: *const f32,
    a_count: i32,
    group_b: *const f32,
    b_count: i32,
    height: f32,
    out_graph: *mut i32,
) -> i32 {
    if out_graph.is_null() {
        return INVALID_PTR;
    }
    let groups = points_from(group_a, a_count).and_then(|a| Ok((a, points_from(group_b, b_count)?)));
    let (group_a, group_b) = match groups {
        Ok(groups) => groups,
        Err(status) => return status,
    };
    let config = VisibilityConfig::default().with_height(height);

    match INDICES.get(index).map(|state| visibility::group_to_group(&state, &group_a, &group_b, config)) {
        Ok(graph) => store_graph(graph, out_graph),
        Err(status) => status,
    }
}

/// Whether the segment between two points (3 floats each) is unobstructed.
///
/// # Safety
/// - `a` and `b` must each point to 3 floats.
/// - `out_visible` must point to a writable byte.
#[no_mangle]
pub unsafe extern "C" fn points_visible(index: i32, a: *const f32, b: *const f32, out_visible: *mut u8) -> i32 {
    let (a, b) = match (point_from(a), point_from(b)) {
        (Ok(a), Ok(b)) => (a, b),
        _ => return INVALID_PTR,
    };
    match INDICES.get(index).map(|state| visibility::points_visible(&state, a, b)) {
        Ok(visible) => {
            write_opt(out_visible, u8::from(visible));
            OK
        }
        Err(status) => status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_scene::{floor_index, walled_index};
    use crate::{destroy_graph, destroy_index, fire_ray, graph_get_cost, graph_node_count, NOT_FOUND};

    fn generator_config() -> FfiGeneratorConfig {
        FfiGeneratorConfig {
            spacing_x: 1.0,
            spacing_y: 1.0,
            spacing_z: 1.0,
            max_nodes: 0,
            up_step: 0.2,
            down_step: 0.2,
            up_slope: 20.0,
            down_slope: 20.0,
            step_connection: 1,
            cores: -1,
            obstacle_ids: std::ptr::null(),
            obstacle_count: 0,
        }
    }

    #[test]
    fn test_generate_graph() {
        unsafe {
            let index = walled_index();
            let config = generator_config();
            let mut graph = 0;
            assert_eq!(generate_graph(index, [-2.0, 0.0, 1.0].as_ptr(), &config, &mut graph), OK);
            assert!(graph > 0);

            // The wall splits the floor; only the west half is reached
            let mut count = 0;
            graph_node_count(graph, &mut count);
            assert!(count > 1);
            let mut cost = 0.0;
            assert_eq!(graph_get_cost(graph, 0, 1, std::ptr::null(), &mut cost), OK);
            assert_eq!(destroy_graph(graph), OK);

            // Same result with defaults
            assert_eq!(generate_graph(index, [-2.0, 0.0, 1.0].as_ptr(), std::ptr::null(), &mut graph), OK);
            destroy_graph(graph);

            // Above nothing
            assert_eq!(generate_graph(index, [50.0, 50.0, 1.0].as_ptr(), &config, &mut graph), NO_GRAPH);
            assert_eq!(graph, 0);
            destroy_index(index);

            assert_eq!(generate_graph(index, [-2.0, 0.0, 1.0].as_ptr(), &config, &mut graph), NOT_FOUND);
        }
    }

    #[test]
    fn test_generate_respects_obstacles() {
        unsafe {
            let index = floor_index();
            let obstacles = [0];
            let config = FfiGeneratorConfig {
                obstacle_ids: obstacles.as_ptr(),
                obstacle_count: 1,
                ..generator_config()
            };
            let mut graph = 0;
            assert_eq!(generate_graph(index, [0.0, 0.0, 1.0].as_ptr(), &config, &mut graph), NO_GRAPH);
            destroy_index(index);
        }
    }

    #[test]
    fn test_rays_run_during_generation() {
        let index = unsafe { floor_index() };
        std::thread::scope(|scope| {
            let generation = scope.spawn(|| unsafe {
                let config = generator_config();
                let mut graph = 0;
                let status = generate_graph(index, [0.0, 0.0, 1.0].as_ptr(), &config, &mut graph);
                destroy_graph(graph);
                status
            });
            let rays = scope.spawn(|| unsafe {
                let mut hits = 0;
                for i in 0..200 {
                    let origin = [i as f32 * 0.05 - 5.0, 1.0, 3.0];
                    let mut result = RayResult::MISS;
                    let status = fire_ray(index, origin.as_ptr(), [0.0, 0.0, -1.0].as_ptr(), -1.0, &mut result, std::ptr::null_mut());
                    if status == OK && result.mesh_id == 0 {
                        hits += 1;
                    }
                }
                hits
            });
            assert_eq!(generation.join().unwrap(), OK);
            assert_eq!(rays.join().unwrap(), 200);
        });
        destroy_index(index);
    }

    #[test]
    fn test_view_analysis() {
        unsafe {
            let index = floor_index();
            let config = FfiViewConfig {
                ray_count: 200,
                up_fov: 50.0,
                down_fov: 70.0,
                height: 1.7,
            };
            let nodes = [0.0f32, 0.0, 0.0, 1.0, 1.0, 0.0];

            let mut counts = [0.0f32; 2];
            let status = spherical_view_analysis_aggregate(index, nodes.as_ptr(), 2, &config, 0, counts.as_mut_ptr(), 2);
            assert_eq!(status, OK);
            assert!(counts[0] > 0.0);
            let status = spherical_view_analysis_aggregate(index, nodes.as_ptr(), 2, &config, 9, counts.as_mut_ptr(), 2);
            assert_eq!(status, GENERIC_ERROR);

            let mut rays = 0;
            assert_eq!(spherical_distribute(200, 50.0, 70.0, std::ptr::null_mut(), 0, &mut rays), OK);
            let mut results = vec![RayResult::MISS; 2 * rays as usize];
            let mut per_node = 0;
            let status = spherical_view_analysis_no_aggregate(
                index,
                nodes.as_ptr(),
                2,
                &config,
                results.as_mut_ptr(),
                results.len() as i32,
                &mut per_node,
            );
            assert_eq!(status, OK);
            assert_eq!(per_node, rays);
            let hits = results[..rays as usize].iter().filter(|r| r.is_hit()).count();
            assert_eq!(hits as f32, counts[0]);

            destroy_index(index);
        }
    }

    #[test]
    fn test_raw_view_rejects_small_buffer_up_front() {
        unsafe {
            let index = floor_index();
            let config = FfiViewConfig {
                ray_count: 200,
                up_fov: 50.0,
                down_fov: 70.0,
                height: 1.7,
            };
            let nodes = [0.0f32, 0.0, 0.0, 1.0, 1.0, 0.0];
            let mut rays = 0;
            spherical_distribute(200, 50.0, 70.0, std::ptr::null_mut(), 0, &mut rays);

            // Room for one node's rays, not two
            let marker = RayResult { mesh_id: 77, distance: 7.0 };
            let mut results = vec![marker; rays as usize];
            let mut per_node = 0;
            let status = spherical_view_analysis_no_aggregate(
                index,
                nodes.as_ptr(),
                2,
                &config,
                results.as_mut_ptr(),
                rays,
                &mut per_node,
            );
            assert_eq!(status, LENGTH_MISMATCH);
            assert_eq!(per_node, rays, "Direction count is reported so the host can resize");
            assert!(results.iter().all(|r| *r == marker));

            let status = spherical_view_analysis_no_aggregate(
                index,
                nodes.as_ptr(),
                2,
                &config,
                std::ptr::null_mut(),
                0,
                &mut per_node,
            );
            assert_eq!(status, LENGTH_MISMATCH);
            destroy_index(index);
        }
    }

    #[test]
    fn test_visibility_graphs() {
        unsafe {
            let index = walled_index();
            let points = [-2.0f32, 0.0, 0.0, -1.0, 0.0, 0.0, 2.0, 0.0, 0.0];

            let mut graph = 0;
            assert_eq!(visibility_all_to_all(index, points.as_ptr(), 3, 1.7, 0, &mut graph), OK);
            let mut cost = 0.0;
            graph_get_cost(graph, 0, 1, std::ptr::null(), &mut cost);
            assert_eq!(cost, 1.0);
            graph_get_cost(graph, 1, 0, std::ptr::null(), &mut cost);
            assert_eq!(cost, -1.0);
            graph_get_cost(graph, 1, 2, std::ptr::null(), &mut cost);
            assert_eq!(cost, -1.0);
            destroy_graph(graph);

            let group_b = [-1.0f32, 0.0, 0.0];
            assert_eq!(visibility_group_to_group(index, points.as_ptr(), 1, group_b.as_ptr(), 1, 1.7, &mut graph), OK);
            let mut count = 0;
            graph_node_count(graph, &mut count);
            assert_eq!(count, 2);
            destroy_graph(graph);

            // Across the wall only
            let across = [2.0f32, 0.0, 0.0];
            assert_eq!(visibility_group_to_group(index, points.as_ptr(), 1, across.as_ptr(), 1, 1.7, &mut graph), NO_GRAPH);

            let mut visible = 9;
            assert_eq!(points_visible(index, [-2.0, 0.0, 1.0].as_ptr(), [2.0, 0.0, 1.0].as_ptr(), &mut visible), OK);
            assert_eq!(visible, 0);
            destroy_index(index);
        }
    }
}
