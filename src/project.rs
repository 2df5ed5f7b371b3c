// src/project.rs
// CPU projection bridge: flattens the visible index ranges, projects the
// selected rays to pixel coordinates and remaps the neighbour graph onto the
// projected subset with an off-screen sentinel.

use glam::DVec3;
use rayon::prelude::*;

use crate::camera::CameraPose;
use crate::lens::Lens;
use crate::mesh::Mesh;
use crate::Scalar;

/// The on-screen subset of a mesh after projection.
///
/// `neighbourhood[k]` holds indices into `pixel_coordinates` for the six
/// neighbours of node `k`, or the sentinel `pixel_coordinates.len()` when a
/// neighbour fell outside the frustum. The sentinel names a virtual node that
/// never appears in `pixel_coordinates`.
#[derive(Debug, Clone)]
pub struct ProjectedMesh {
    /// Pixel positions, x first.
    pub pixel_coordinates: Vec<[Scalar; 2]>,
    pub neighbourhood: Vec<[usize; 6]>,
    /// For each projected node, its index in the source mesh node table.
    pub global_indices: Vec<usize>,
}

impl ProjectedMesh {
    /// Index used for neighbours that are not on screen.
    pub fn off_screen(&self) -> usize {
        self.pixel_coordinates.len()
    }
}

/// Project the nodes selected by `ranges` through `lens` at `pose`.
///
/// Ranges must be ascending and disjoint, which is what the visibility oracle
/// produces; the flattened index vector is then sorted and the neighbour remap
/// can binary search it.
pub fn project(
    mesh: &Mesh,
    ranges: &[(usize, usize)],
    pose: &CameraPose,
    lens: &Lens,
) -> ProjectedMesh {
    let global_indices: Vec<usize> = ranges.iter().flat_map(|&(b, e)| b..e).collect();
    let rco = pose.rco();

    let pixel_coordinates: Vec<[Scalar; 2]> = global_indices
        .par_iter()
        .map(|&i| project_ray(rco * mesh.nodes[i].ray, lens))
        .collect();

    let n = global_indices.len();
    let neighbourhood: Vec<[usize; 6]> = global_indices
        .par_iter()
        .map(|&gi| {
            let mut local = [n; 6];
            for (slot, &off) in mesh.nodes[gi].neighbours.iter().enumerate() {
                let neighbour = (gi as i64 + off as i64) as usize;
                if let Ok(j) = global_indices.binary_search(&neighbour) {
                    local[slot] = j;
                }
            }
            local
        })
        .collect();

    ProjectedMesh {
        pixel_coordinates,
        neighbourhood,
        global_indices,
    }
}

/// Map one camera-frame ray to pixel coordinates.
fn project_ray(rc: DVec3, lens: &Lens) -> [Scalar; 2] {
    // Incidence angle from the optical axis (camera x).
    let theta = rc.x.clamp(-1.0, 1.0).acos();
    let r = lens.projection().r(theta, lens.focal());

    // Unit direction of the pixel offset in the image plane. An on-axis ray
    // has no defined direction and lands on the optical centre.
    let rho = rc.y.hypot(rc.z);
    let (dir_y, dir_z) = if rho > 1e-12 {
        (rc.y / rho, rc.z / rho)
    } else {
        (0.0, 0.0)
    };

    let w = lens.dimensions[0] as Scalar;
    let h = lens.dimensions[1] as Scalar;
    // Camera y points left and z up while image x grows right and y down.
    let x = (w - 1.0) * 0.5 + lens.centre[0] - r * dir_y;
    let y = (h - 1.0) * 0.5 + lens.centre[1] - r * dir_z;
    [x.clamp(0.0, w - 1.0), y.clamp(0.0, h - 1.0)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lens::{LensModel, Projection};
    use glam::DMat3;

    fn test_lens() -> Lens {
        Lens {
            model: LensModel::Radial {
                projection: Projection::Equidistant,
                fov: 2.0,
                pixels_per_radian: 100.0,
            },
            dimensions: [640, 480],
            centre: [0.0, 0.0],
        }
    }

    #[test]
    fn on_axis_ray_lands_on_the_image_centre() {
        let px = project_ray(DVec3::X, &test_lens());
        assert!((px[0] - 319.5).abs() < 1e-9);
        assert!((px[1] - 239.5).abs() < 1e-9);
    }

    #[test]
    fn off_axis_ray_moves_opposite_the_camera_y_axis() {
        // A ray to the camera's left (positive y) lands left of centre.
        let rc = DVec3::new(0.9, 0.435889894354, 0.0).normalize();
        let px = project_ray(rc, &test_lens());
        assert!(px[0] < 319.5);
        assert!((px[1] - 239.5).abs() < 1e-9);
    }

    #[test]
    fn equidistant_radius_is_linear_in_angle() {
        let lens = test_lens();
        let angle: f64 = 0.4;
        let rc = DVec3::new(angle.cos(), angle.sin(), 0.0);
        let px = project_ray(rc, &lens);
        let r = (319.5 - px[0]).abs();
        assert!((r - 100.0 * angle).abs() < 1e-6);
    }

    #[test]
    fn projection_clamps_to_the_image_rectangle() {
        let lens = Lens {
            model: LensModel::Radial {
                projection: Projection::Rectilinear,
                fov: 3.0,
                pixels_per_radian: 100.0,
            },
            dimensions: [640, 480],
            centre: [0.0, 0.0],
        };
        // 1.5 rad off axis through a rectilinear mapping: a huge radius that
        // must pin to the image edge.
        let angle: Scalar = 1.5;
        let rc = DVec3::new(angle.cos(), angle.sin(), 0.0);
        let px = project_ray(rc, &lens);
        assert_eq!(px[0], 0.0);
        assert!((px[1] - 239.5).abs() < 1e-9);
    }

    #[test]
    fn sentinel_marks_neighbours_outside_the_selection() {
        use crate::geometry::Sphere;

        let shape = Sphere::new(0.1, 5.0);
        let mesh = Mesh::generate(&shape, 1.0, 10.0, 1e-3).unwrap();
        // Select only the second row; its TL/TR and BL/BR neighbours are gone.
        let row = mesh.rows[1];
        let pose = CameraPose::new(
            DMat3::from_cols(
                DVec3::new(0.0, 0.0, -1.0),
                DVec3::new(0.0, -1.0, 0.0),
                DVec3::new(-1.0, 0.0, 0.0),
            ),
            1.0,
        );
        let projected = project(&mesh, &[(row.begin, row.end)], &pose, &test_lens());

        let sentinel = projected.off_screen();
        assert_eq!(projected.pixel_coordinates.len(), row.len());
        for (k, local) in projected.neighbourhood.iter().enumerate() {
            // Left and right stay within the selected ring.
            assert_ne!(local[2], sentinel);
            assert_ne!(local[3], sentinel);
            assert_ne!(local[2], k);
            // Vertical links left the selection.
            assert_eq!(local[0], sentinel);
            assert_eq!(local[1], sentinel);
            assert_eq!(local[4], sentinel);
            assert_eq!(local[5], sentinel);
        }
    }
}
