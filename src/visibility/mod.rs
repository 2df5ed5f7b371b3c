// src/visibility/mod.rs
// Culls mesh rings against the camera frustum: azimuth intervals per ring are
// computed by the lens-specific oracle and converted to node index ranges.

mod equirectangular;
mod radial;

pub use equirectangular::Frustum;
pub use radial::RadialCone;

use std::f64::consts::TAU;

use crate::camera::CameraPose;
use crate::error::MeshResult;
use crate::lens::{Lens, LensModel};
use crate::mesh::{Mesh, Row};
use crate::Scalar;

/// Half-open index ranges of `mesh.nodes` that fall inside the camera frustum,
/// in ascending node order.
pub fn visible_ranges(
    mesh: &Mesh,
    pose: &CameraPose,
    lens: &Lens,
) -> MeshResult<Vec<(usize, usize)>> {
    pose.validate()?;
    lens.validate()?;

    let mut ranges = Vec::new();
    match lens.model {
        LensModel::Equirectangular { fov, .. } => {
            let frustum = Frustum::new(pose, fov);
            for row in &mesh.rows {
                let intervals = frustum.theta_limits(row.phi)?;
                index_ranges(row, &intervals, &mut ranges);
            }
        }
        LensModel::Radial { fov, .. } => {
            let cone = RadialCone::new(pose, fov);
            for row in &mesh.rows {
                let intervals = cone.theta_limits(row.phi);
                index_ranges(row, &intervals, &mut ranges);
            }
        }
    }
    Ok(ranges)
}

/// Convert azimuth intervals on one ring into half-open node index ranges.
///
/// Values that round one past the ring size come from angles within floating
/// point error of a full turn and wrap back to the ring boundary. An interval
/// whose start rounds above its end crosses theta = 0 and splits in two.
fn index_ranges(row: &Row, intervals: &[(Scalar, Scalar)], out: &mut Vec<(usize, usize)>) {
    let m = row.len();
    for &(a, b) in intervals {
        let mut begin = (m as Scalar * a / TAU).ceil() as usize;
        let mut end = (m as Scalar * b / TAU).ceil() as usize;
        if begin > m {
            begin = 0;
        }
        if end > m {
            end = m;
        }
        if begin == end {
            continue;
        }
        if begin < end {
            out.push((row.begin + begin, row.begin + end));
        } else {
            out.push((row.begin, row.begin + end));
            out.push((row.begin + begin, row.end));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(begin: usize, len: usize) -> Row {
        Row {
            phi: 0.5,
            begin,
            end: begin + len,
        }
    }

    #[test]
    fn full_turn_covers_the_whole_ring() {
        let mut out = Vec::new();
        index_ranges(&row(10, 8), &[(0.0, TAU)], &mut out);
        assert_eq!(out, vec![(10, 18)]);
    }

    #[test]
    fn plain_interval_maps_to_a_single_range() {
        let mut out = Vec::new();
        // Slightly over a quarter turn starting at zero on a ring of 8.
        index_ranges(&row(0, 8), &[(0.1, TAU / 4.0)], &mut out);
        assert_eq!(out, vec![(1, 2)]);
    }

    #[test]
    fn wrapping_interval_splits_in_two() {
        let mut out = Vec::new();
        // An arc through zero: from 7/8 of a turn around to 1/8.
        index_ranges(&row(0, 8), &[(TAU * 7.0 / 8.0, TAU / 8.0)], &mut out);
        assert_eq!(out, vec![(0, 1), (7, 8)]);
    }

    #[test]
    fn empty_interval_emits_nothing() {
        let mut out = Vec::new();
        index_ranges(&row(0, 8), &[(0.2, 0.2)], &mut out);
        assert!(out.is_empty());
    }
}
