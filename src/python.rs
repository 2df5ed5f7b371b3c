// src/python.rs
// Python operator surface. Arguments follow array-indexing conventions
// (dimensions, centres and returned pixels are y first); the swap to the
// crate's x-first convention happens here and nowhere else.

use numpy::{PyArray2, PyReadonlyArray2, PyUntypedArrayMethods};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::op::{project_visual_mesh, MeshParams};

/// Compute the on-screen visual mesh for one camera view.
///
/// Returns `(pixels, neighbours)`: an (N, 2) float array of (y, x) pixel
/// coordinates and an (N + 1, 7) int array whose row k is
/// `[k, tl, tr, l, r, bl, br]`, with the final row repeating the off-screen
/// index N.
#[pyfunction]
#[allow(clippy::too_many_arguments)]
#[pyo3(signature = (
    image_dimensions,
    projection,
    focal_length,
    fov,
    lens_centre,
    cam_to_observation_plane,
    height,
    n_intersections,
    cached_meshes,
    intersection_tolerance,
    max_distance,
    geometry,
    radius,
))]
fn visual_mesh<'py>(
    py: Python<'py>,
    image_dimensions: (i32, i32),
    projection: &str,
    focal_length: f64,
    fov: f64,
    lens_centre: (f64, f64),
    cam_to_observation_plane: PyReadonlyArray2<'py, f64>,
    height: f64,
    n_intersections: f64,
    cached_meshes: usize,
    intersection_tolerance: f64,
    max_distance: f64,
    geometry: &str,
    radius: f64,
) -> PyResult<(Bound<'py, PyArray2<f64>>, Bound<'py, PyArray2<i32>>)> {
    let shape = cam_to_observation_plane.shape();
    if shape.len() != 2 || shape[0] != 3 || shape[1] != 3 {
        return Err(PyValueError::new_err(
            "cam_to_observation_plane must be a 3x3 matrix",
        ));
    }
    let rot = cam_to_observation_plane.as_array();
    let mut roc = [[0.0; 3]; 3];
    for (i, mut_row) in roc.iter_mut().enumerate() {
        for (j, value) in mut_row.iter_mut().enumerate() {
            *value = rot[[i, j]];
        }
    }

    let params = MeshParams {
        // Callers index images (row, column); the crate works x first.
        dimensions: [image_dimensions.1, image_dimensions.0],
        projection: projection.to_string(),
        focal_length,
        fov,
        centre: [lens_centre.1, lens_centre.0],
        roc,
        height,
        n_intersections,
        cached_meshes,
        intersection_tolerance,
        max_distance,
        geometry: geometry.to_string(),
        radius,
    };

    let output = py.allow_threads(|| project_visual_mesh(&params))?;

    let pixels: Vec<Vec<f64>> = output.pixels.iter().map(|p| p.to_vec()).collect();
    let neighbours: Vec<Vec<i32>> = output.neighbours.iter().map(|n| n.to_vec()).collect();
    Ok((
        PyArray2::from_vec2_bound(py, &pixels)?,
        PyArray2::from_vec2_bound(py, &neighbours)?,
    ))
}

#[pymodule]
fn _visualmesh(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(visual_mesh, m)?)?;
    Ok(())
}
