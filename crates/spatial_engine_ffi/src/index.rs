//! Geometry index handles and ray queries.
//!
//! Indexes are immutable once built, so the table stores them behind `Arc`
//! and every query runs on a clone taken outside the table lock.

use std::sync::Arc;

use spatial_engine::{BatchShape, GeometryIndex, Mesh, RayResult};

use crate::registry::Registry;
use crate::{copy_out, fail, point_from, points_from, slice_from, status_of, INVALID_PTR, OK};

pub(crate) static INDICES: Registry<Arc<GeometryIndex>> = Registry::new("index");

/// Build a mesh from flat arrays (`vertex_len` floats, `index_len` indices).
unsafe fn mesh_from(
    vertices: *const f32,
    vertex_len: i32,
    indices: *const u32,
    index_len: i32,
    mesh_id: i32,
) -> Result<Mesh, i32> {
    let vertices = slice_from(vertices, vertex_len)?;
    let indices = slice_from(indices, index_len)?;
    Mesh::from_flat(format!("mesh_{mesh_id}"), mesh_id, vertices, indices).map_err(fail)
}

/// Create a geometry index over one mesh.
///
/// # Safety
/// - `vertices` must be valid for `vertex_len` floats (x, y, z triples).
/// - `indices` must be valid for `index_len` vertex indices (triples).
/// - `out_handle` must point to a writable i32.
///
/// # Returns
/// - `OK` with the new handle in `out_handle`
/// - `INVALID_MESH` if the buffers do not describe any valid triangle
/// - `INVALID_PTR` on null pointers
#[no_mangle]
pub unsafe extern "C" fn create_index(
    vertices: *const f32,
    vertex_len: i32,
    indices: *const u32,
    index_len: i32,
    mesh_id: i32,
    out_handle: *mut i32,
) -> i32 {
    if out_handle.is_null() {
        return INVALID_PTR;
    }
    let built = mesh_from(vertices, vertex_len, indices, index_len, mesh_id)
        .and_then(|mesh| GeometryIndex::from_mesh(mesh).map_err(fail))
        .and_then(|index| INDICES.insert(Arc::new(index)));
    match built {
        Ok(handle) => {
            *out_handle = handle;
            OK
        }
        Err(status) => status,
    }
}

/// Add a mesh to an existing index and rebuild it.
///
/// On failure the index keeps its previous meshes.
///
/// # Safety
/// Same buffer requirements as [`create_index`].
#[no_mangle]
pub unsafe extern "C" fn add_mesh_and_rebuild(
    index: i32,
    vertices: *const f32,
    vertex_len: i32,
    indices: *const u32,
    index_len: i32,
    mesh_id: i32,
) -> i32 {
    let mesh = match mesh_from(vertices, vertex_len, indices, index_len, mesh_id) {
        Ok(mesh) => mesh,
        Err(status) => return status,
    };
    let current = match INDICES.get(index) {
        Ok(current) => current,
        Err(status) => return status,
    };
    let rebuilt = match current.with_mesh(mesh) {
        Ok(rebuilt) => Arc::new(rebuilt),
        Err(err) => return fail(err),
    };
    status_of(INDICES.with(index, |state| *state = rebuilt))
}

/// Destroy an index.
///
/// # Returns
/// - `OK` on success
/// - `NOT_FOUND` if the handle does not exist (including double destroy)
#[no_mangle]
pub extern "C" fn destroy_index(index: i32) -> i32 {
    INDICES.remove(index)
}

/// Fire one nearest-hit ray. `max_distance < 0` means unbounded.
///
/// A miss is not an error: `out_result` receives `{-1, -1}`.
///
/// # Safety
/// - `origin` and `direction` must each point to 3 floats.
/// - `out_result` must point to a writable RayResult.
/// - `out_point` may be null; otherwise it receives the hit point (3
///   floats) and is left untouched on a miss.
#[no_mangle]
pub unsafe extern "C" fn fire_ray(
    index: i32,
    origin: *const f32,
    direction: *const f32,
    max_distance: f32,
    out_result: *mut RayResult,
    out_point: *mut f32,
) -> i32 {
    if out_result.is_null() {
        return INVALID_PTR;
    }
    let (origin, direction) = match (point_from(origin), point_from(direction)) {
        (Ok(o), Ok(d)) => (o, d),
        _ => return INVALID_PTR,
    };
    let hit = match INDICES.get(index).map(|state| state.intersect(origin, direction, max_distance)) {
        Ok(hit) => hit,
        Err(status) => return status,
    };

    *out_result = hit.map_or(RayResult::MISS, RayResult::from);
    if let (Some(hit), false) = (hit, out_point.is_null()) {
        std::ptr::copy_nonoverlapping(hit.point.to_array().as_ptr(), out_point, 3);
    }
    OK
}

/// Fire a batch of nearest-hit rays.
///
/// Shapes: `n` origins with `n` directions, `n` origins with one direction,
/// or one origin with `n` directions. Result `i` belongs to ray `i`.
///
/// # Safety
/// - `origins` / `directions` must be valid for their counts in points.
/// - `out_results` must be valid for `capacity` RayResults.
///
/// # Returns
/// - `OK`
/// - `LENGTH_MISMATCH` for an invalid shape or a too-small output buffer
#[no_mangle]
pub unsafe extern "C" fn fire_rays(
    index: i32,
    origins: *const f32,
    origin_count: i32,
    directions: *const f32,
    direction_count: i32,
    max_distance: f32,
    out_results: *mut RayResult,
    capacity: i32,
) -> i32 {
    status_of(run_batch(
        index,
        origins,
        origin_count,
        directions,
        direction_count,
        capacity,
        |state, o, d| state.fire_rays(o, d, max_distance),
        out_results,
    ))
}

/// Fire a batch of occlusion rays; `out_results[i]` is 1 when ray `i` hit
/// anything within `max_distance`.
///
/// # Safety
/// As [`fire_rays`], with `out_results` valid for `capacity` bytes.
#[no_mangle]
pub unsafe extern "C" fn fire_occlusion_rays(
    index: i32,
    origins: *const f32,
    origin_count: i32,
    directions: *const f32,
    direction_count: i32,
    max_distance: f32,
    out_results: *mut u8,
    capacity: i32,
) -> i32 {
    status_of(run_batch(
        index,
        origins,
        origin_count,
        directions,
        direction_count,
        capacity,
        |state, o, d| {
            state
                .fire_occlusion_rays(o, d, max_distance)
                .map(|hits| hits.into_iter().map(u8::from).collect())
        },
        out_results,
    ))
}

#[allow(clippy::too_many_arguments)]
unsafe fn run_batch<T: Copy>(
    index: i32,
    origins: *const f32,
    origin_count: i32,
    directions: *const f32,
    direction_count: i32,
    capacity: i32,
    fire: impl FnOnce(&GeometryIndex, &[glam::Vec3], &[glam::Vec3]) -> spatial_engine::Result<Vec<T>>,
    out: *mut T,
) -> Result<(), i32> {
    let origins = points_from(origins, origin_count)?;
    let directions = points_from(directions, direction_count)?;
    // Reject before any ray is cast
    BatchShape::classify(origins.len(), directions.len()).map_err(fail)?;
    let state = INDICES.get(index)?;
    let results = fire(&state, &origins, &directions).map_err(fail)?;
    copy_out(&results, out, capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_scene::{floor_index, walled_index, FLOOR_INDICES};
    use crate::{INVALID_MESH, LENGTH_MISMATCH, NOT_FOUND};

    #[test]
    fn test_index_lifecycle() {
        unsafe {
            let index = floor_index();
            assert!(index > 0);
            assert_eq!(destroy_index(index), OK);
            assert_eq!(destroy_index(index), NOT_FOUND, "Double destroy should return NOT_FOUND");
        }
    }

    #[test]
    fn test_invalid_mesh() {
        unsafe {
            let degenerate = [0.0f32; 9];
            let mut handle = 0;
            let status = create_index(degenerate.as_ptr(), 9, FLOOR_INDICES.as_ptr(), 3, 0, &mut handle);
            assert_eq!(status, INVALID_MESH);
            assert_eq!(handle, 0);

            let status = create_index(std::ptr::null(), 9, FLOOR_INDICES.as_ptr(), 3, 0, &mut handle);
            assert_eq!(status, INVALID_PTR);
        }
    }

    #[test]
    fn test_fire_ray_hit_and_miss() {
        unsafe {
            let index = floor_index();
            let mut result = RayResult::MISS;
            let mut point = [0.0f32; 3];

            let status = fire_ray(index, [1.0, 2.0, 5.0].as_ptr(), [0.0, 0.0, -1.0].as_ptr(), -1.0, &mut result, point.as_mut_ptr());
            assert_eq!(status, OK);
            assert_eq!(result.mesh_id, 0);
            assert!((result.distance - 5.0).abs() < 1e-4);
            assert!((point[0] - 1.0).abs() < 1e-4 && point[2].abs() < 1e-4);

            let status = fire_ray(index, [1.0, 2.0, 5.0].as_ptr(), [0.0, 0.0, 1.0].as_ptr(), -1.0, &mut result, std::ptr::null_mut());
            assert_eq!(status, OK);
            assert_eq!(result, RayResult::MISS);

            destroy_index(index);
            let status = fire_ray(index, [0.0; 3].as_ptr(), [0.0, 0.0, -1.0].as_ptr(), -1.0, &mut result, std::ptr::null_mut());
            assert_eq!(status, NOT_FOUND);
        }
    }

    #[test]
    fn test_batch_shapes() {
        unsafe {
            let index = walled_index();
            let origins = [-2.0f32, 0.0, 1.0, -3.0, 0.0, 1.0];
            let mut results = [RayResult::MISS; 2];

            // Two origins, one direction toward the wall
            let status = fire_rays(index, origins.as_ptr(), 2, [1.0, 0.0, 0.0].as_ptr(), 1, -1.0, results.as_mut_ptr(), 2);
            assert_eq!(status, OK);
            assert_eq!(results[0].mesh_id, 1);
            assert!((results[0].distance - 2.0).abs() < 1e-4);
            assert!((results[1].distance - 3.0).abs() < 1e-4);

            // 2 origins against 3 directions cannot pair up
            let directions = [1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
            let status = fire_rays(index, origins.as_ptr(), 2, directions.as_ptr(), 3, -1.0, results.as_mut_ptr(), 2);
            assert_eq!(status, LENGTH_MISMATCH);

            // Output buffer too small
            let status = fire_rays(index, origins.as_ptr(), 2, [1.0, 0.0, 0.0].as_ptr(), 1, -1.0, results.as_mut_ptr(), 1);
            assert_eq!(status, LENGTH_MISMATCH);

            destroy_index(index);
        }
    }

    #[test]
    fn test_occlusion_rays() {
        unsafe {
            let index = walled_index();
            let origin = [-2.0f32, 0.0, 1.0];
            let directions = [1.0f32, 0.0, 0.0, -1.0, 0.0, 0.0];
            let mut hits = [9u8; 2];
            let status = fire_occlusion_rays(index, origin.as_ptr(), 1, directions.as_ptr(), 2, 100.0, hits.as_mut_ptr(), 2);
            assert_eq!(status, OK);
            assert_eq!(hits, [1, 0]);

            // The wall is out of reach
            let status = fire_occlusion_rays(index, origin.as_ptr(), 1, directions.as_ptr(), 2, 1.0, hits.as_mut_ptr(), 2);
            assert_eq!(status, OK);
            assert_eq!(hits, [0, 0]);
            destroy_index(index);
        }
    }
}
