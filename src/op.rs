// src/op.rs
// Operator surface for ML and imperative callers: one call from raw parameters
// to projected pixel coordinates and the neighbour table. Keeps process-wide
// mesh caches so repeated calls at similar heights reuse their lattice.

use glam::DVec2;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::cache::MeshCache;
use crate::camera::CameraPose;
use crate::error::{MeshError, MeshResult};
use crate::geometry::{Circle, Shape, Sphere};
use crate::lens::{Lens, LensModel, Projection};
use crate::project::{project, ProjectedMesh};
use crate::visibility::visible_ranges;
use crate::Scalar;

/// Floor on ring and node spacing used by the operator-owned generator.
pub const MIN_ANGULAR_RESOLUTION: Scalar = 1e-3;

/// Everything one operator invocation needs, in caller conventions.
///
/// `dimensions` and `centre` are x first; callers that index images row major
/// swap at their own boundary (the Python wrapper does).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshParams {
    pub dimensions: [i32; 2],
    /// One of EQUISOLID, EQUIDISTANT, RECTILINEAR.
    pub projection: String,
    /// Focal length in pixels.
    pub focal_length: Scalar,
    /// Full field of view in radians.
    pub fov: Scalar,
    /// Optical centre offset from the image centre, pixels.
    pub centre: [Scalar; 2],
    /// Row-major rotation from the camera frame to the observation frame.
    pub roc: [[Scalar; 3]; 3],
    /// Camera height above the ground plane, metres.
    pub height: Scalar,
    /// Desired intersections with the target object.
    pub n_intersections: Scalar,
    /// Number of meshes the operator cache may hold.
    pub cached_meshes: usize,
    /// Fractional intersection tolerance before a new mesh is generated.
    pub intersection_tolerance: Scalar,
    /// Ground distance at which mesh generation stops, metres.
    pub max_distance: Scalar,
    /// One of SPHERE, CIRCLE.
    pub geometry: String,
    /// Object radius, metres.
    pub radius: Scalar,
}

/// Result of one operator invocation.
///
/// `pixels[k]` is y first (row, column) to match array-indexing callers.
/// `neighbours` has one row per on-screen node plus a final sentinel row;
/// row k is `[k, tl, tr, l, r, bl, br]` and the sentinel row repeats the
/// off-screen index in every column.
#[derive(Debug, Clone)]
pub struct MeshOutput {
    pub pixels: Vec<[Scalar; 2]>,
    pub neighbours: Vec<[i32; 7]>,
}

static SPHERE_MESHES: Lazy<MeshCache> = Lazy::new(MeshCache::new);
static CIRCLE_MESHES: Lazy<MeshCache> = Lazy::new(MeshCache::new);

/// Run the full pipeline: cache lookup or generation, visibility culling,
/// projection, and neighbour table assembly.
pub fn project_visual_mesh(params: &MeshParams) -> MeshResult<MeshOutput> {
    validate(params)?;

    let lens = build_lens(params)?;
    lens.validate()?;
    let pose = CameraPose::from_rows(params.roc, params.height);
    pose.validate()?;

    let projected = match params.geometry.as_str() {
        "SPHERE" => {
            let shape = Sphere::new(params.radius, params.n_intersections);
            run(&SPHERE_MESHES, &shape, params, &pose, &lens)?
        }
        "CIRCLE" => {
            let shape = Circle::new(params.radius, params.n_intersections);
            run(&CIRCLE_MESHES, &shape, params, &pose, &lens)?
        }
        other => {
            return Err(MeshError::invalid_input(format!(
                "geometry must be one of SPHERE or CIRCLE, got {other:?}"
            )))
        }
    };

    Ok(assemble(projected))
}

fn run<S: Shape>(
    cache: &MeshCache,
    shape: &S,
    params: &MeshParams,
    pose: &CameraPose,
    lens: &Lens,
) -> MeshResult<ProjectedMesh> {
    let mesh = cache.get(
        shape,
        params.height,
        params.intersection_tolerance,
        params.cached_meshes,
        params.max_distance,
        MIN_ANGULAR_RESOLUTION,
    )?;
    let ranges = visible_ranges(&mesh, pose, lens)?;
    Ok(project(&mesh, &ranges, pose, lens))
}

fn validate(params: &MeshParams) -> MeshResult<()> {
    if !(params.height.is_finite() && params.height > 0.0) {
        return Err(MeshError::invalid_input("height must be finite and positive"));
    }
    if !(params.radius.is_finite() && params.radius > 0.0) {
        return Err(MeshError::invalid_input("radius must be finite and positive"));
    }
    if !(params.n_intersections.is_finite() && params.n_intersections > 0.0) {
        return Err(MeshError::invalid_input(
            "number of intersections must be finite and positive",
        ));
    }
    if !(params.intersection_tolerance.is_finite() && params.intersection_tolerance >= 0.0) {
        return Err(MeshError::invalid_input(
            "intersection tolerance must be finite and non-negative",
        ));
    }
    if !(params.max_distance.is_finite() && params.max_distance > 0.0) {
        return Err(MeshError::invalid_input(
            "max distance must be finite and positive",
        ));
    }
    let finite_rot = params.roc.iter().flatten().all(|v| v.is_finite());
    if !finite_rot {
        return Err(MeshError::invalid_input("rotation entries must be finite"));
    }
    Ok(())
}

/// Map the operator's flat lens description onto a lens model. Rectilinear
/// lenses cull with a rectangular frustum whose vertical angle follows the
/// sensor aspect ratio; fisheye projections cull with a circular one.
fn build_lens(params: &MeshParams) -> MeshResult<Lens> {
    let projection = Projection::parse(&params.projection)?;
    let model = match projection {
        Projection::Rectilinear => {
            let [w, h] = params.dimensions;
            let half_tan = (params.fov * 0.5).tan();
            let fov_y = 2.0 * (half_tan * h as Scalar / w as Scalar).atan();
            LensModel::Equirectangular {
                fov: DVec2::new(params.fov, fov_y),
                focal_length: params.focal_length,
            }
        }
        Projection::Equidistant | Projection::Equisolid => LensModel::Radial {
            projection,
            fov: params.fov,
            pixels_per_radian: params.focal_length,
        },
    };
    Ok(Lens {
        model,
        dimensions: params.dimensions,
        centre: params.centre,
    })
}

/// Swap pixel coordinates to y first and append the sentinel neighbour row.
fn assemble(projected: ProjectedMesh) -> MeshOutput {
    let n = projected.pixel_coordinates.len();
    let pixels = projected
        .pixel_coordinates
        .iter()
        .map(|&[x, y]| [y, x])
        .collect();

    let mut neighbours = Vec::with_capacity(n + 1);
    for (k, local) in projected.neighbourhood.iter().enumerate() {
        let mut row = [0i32; 7];
        row[0] = k as i32;
        for (j, &idx) in local.iter().enumerate() {
            row[j + 1] = idx as i32;
        }
        neighbours.push(row);
    }
    neighbours.push([n as i32; 7]);

    MeshOutput { pixels, neighbours }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> MeshParams {
        MeshParams {
            dimensions: [640, 480],
            projection: "EQUIDISTANT".to_string(),
            focal_length: 200.0,
            fov: 2.0,
            centre: [0.0, 0.0],
            // Optical axis straight down.
            roc: [[0.0, 0.0, -1.0], [0.0, -1.0, 0.0], [-1.0, 0.0, 0.0]],
            height: 1.0,
            n_intersections: 5.0,
            cached_meshes: 4,
            intersection_tolerance: 0.1,
            max_distance: 10.0,
            geometry: "SPHERE".to_string(),
            radius: 0.1,
        }
    }

    #[test]
    fn unknown_strings_are_rejected_before_any_work() {
        let mut params = base_params();
        params.projection = "PINHOLE".to_string();
        assert!(matches!(
            project_visual_mesh(&params),
            Err(MeshError::InvalidInput(_))
        ));

        let mut params = base_params();
        params.geometry = "CUBE".to_string();
        assert!(matches!(
            project_visual_mesh(&params),
            Err(MeshError::InvalidInput(_))
        ));
    }

    #[test]
    fn non_finite_parameters_are_rejected() {
        let mut params = base_params();
        params.height = Scalar::NAN;
        assert!(project_visual_mesh(&params).is_err());

        let mut params = base_params();
        params.roc[1][1] = Scalar::INFINITY;
        assert!(project_visual_mesh(&params).is_err());
    }

    #[test]
    fn output_shapes_are_consistent() {
        let output = project_visual_mesh(&base_params()).unwrap();
        let n = output.pixels.len();
        assert!(n > 0);
        assert_eq!(output.neighbours.len(), n + 1);
        for (k, row) in output.neighbours.iter().take(n).enumerate() {
            assert_eq!(row[0], k as i32);
            for &idx in &row[1..] {
                assert!(idx >= 0 && idx <= n as i32);
            }
        }
        assert_eq!(output.neighbours[n], [n as i32; 7]);
    }

    #[test]
    fn pixels_are_emitted_y_first() {
        let output = project_visual_mesh(&base_params()).unwrap();
        let [w, h] = [640.0, 480.0];
        for &[y, x] in &output.pixels {
            assert!((0.0..=h - 1.0).contains(&y));
            assert!((0.0..=w - 1.0).contains(&x));
        }
        // With a straight-down camera some pixels use the wider x range, which
        // only works if the coordinate order was swapped.
        assert!(output.pixels.iter().any(|&[_, x]| x > h - 1.0));
    }

    #[test]
    fn params_round_trip_through_json() {
        let params = base_params();
        let text = serde_json::to_string(&params).unwrap();
        let back: MeshParams = serde_json::from_str(&text).unwrap();
        assert_eq!(back.projection, params.projection);
        assert_eq!(back.dimensions, params.dimensions);
        assert_eq!(back.roc, params.roc);
        assert_eq!(back.height, params.height);
    }
}
