// tests/visibility.rs
// Oracle behaviour against whole meshes: full enclosure, rotational symmetry
// and the visible-arc geometry of tilted circular lenses.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::{DMat3, DVec2, DVec3};
use visualmesh::geometry::Sphere;
use visualmesh::mesh::Mesh;
use visualmesh::visibility::{visible_ranges, Frustum, RadialCone};
use visualmesh::{CameraPose, Lens, LensModel, Projection, Scalar};

fn straight_down(height: Scalar) -> CameraPose {
    CameraPose::new(
        DMat3::from_cols(
            DVec3::new(0.0, 0.0, -1.0),
            DVec3::new(0.0, -1.0, 0.0),
            DVec3::new(-1.0, 0.0, 0.0),
        ),
        height,
    )
}

fn tilted(pitch: Scalar, height: Scalar) -> CameraPose {
    let forward = DVec3::new(pitch.sin(), 0.0, -pitch.cos());
    let right = DVec3::new(0.0, -1.0, 0.0);
    let up = forward.cross(right);
    CameraPose::new(DMat3::from_cols(forward, right, up), height)
}

fn ball_mesh() -> Mesh {
    Mesh::generate(&Sphere::new(0.1, 5.0), 1.0, 10.0, 1e-3).unwrap()
}

#[test]
fn all_enclosing_radial_lens_sees_every_node() {
    let mesh = ball_mesh();
    let lens = Lens {
        model: LensModel::Radial {
            projection: Projection::Equidistant,
            fov: 1.9 * PI,
            pixels_per_radian: 100.0,
        },
        dimensions: [640, 480],
        centre: [0.0, 0.0],
    };
    let ranges = visible_ranges(&mesh, &straight_down(1.0), &lens).unwrap();
    // One full range per ring, covering the whole table.
    assert_eq!(ranges.len(), mesh.rows.len());
    for (range, row) in ranges.iter().zip(&mesh.rows) {
        assert_eq!(*range, (row.begin, row.end));
    }
    let selected: usize = ranges.iter().map(|(b, e)| e - b).sum();
    assert_eq!(selected, mesh.nodes.len());
}

#[test]
fn straight_down_rectangular_frustum_has_no_partial_ring_inside_the_inscribed_circle() {
    let mesh = ball_mesh();
    let frustum = Frustum::new(&straight_down(1.0), DVec2::splat(FRAC_PI_2));
    let inscribed = PI / 4.0;
    let circumscribed = 2.0f64.sqrt().atan();
    for row in &mesh.rows {
        let limits = frustum.theta_limits(row.phi).unwrap();
        if row.phi < inscribed - 0.01 {
            assert_eq!(limits, vec![(0.0, TAU)], "ring at {} must be whole", row.phi);
        } else if row.phi > circumscribed + 0.01 {
            assert!(limits.is_empty(), "ring at {} must be culled", row.phi);
        }
    }
}

#[test]
fn rotating_the_pose_about_the_vertical_rotates_the_limits() {
    let delta = 0.3;
    let base = tilted(0.4, 1.0);
    let spun = CameraPose::new(DMat3::from_rotation_z(delta) * base.roc, base.height);

    // Rectangular frustum.
    let fov = DVec2::new(1.0, 0.8);
    let a = Frustum::new(&base, fov);
    let b = Frustum::new(&spun, fov);
    for phi in [0.5, 0.8, 1.1, 1.3] {
        assert_rotated(
            &a.theta_limits(phi).unwrap(),
            &b.theta_limits(phi).unwrap(),
            delta,
        );
    }

    // Circular frustum.
    let a = RadialCone::new(&base, 1.0);
    let b = RadialCone::new(&spun, 1.0);
    for phi in [0.3, 0.6, 0.9] {
        assert_rotated(&a.theta_limits(phi), &b.theta_limits(phi), delta);
    }
}

fn assert_rotated(base: &[(Scalar, Scalar)], spun: &[(Scalar, Scalar)], delta: Scalar) {
    assert_eq!(base.len(), spun.len());
    let full = |(a, b): &(Scalar, Scalar)| *a == 0.0 && (*b - TAU).abs() < 1e-12;
    if base.iter().all(full) {
        // Fully visible rings have no boundary to rotate.
        assert!(spun.iter().all(full));
        return;
    }
    let mut expected: Vec<Scalar> = base
        .iter()
        .flat_map(|&(a, b)| [(a + delta).rem_euclid(TAU), (b + delta).rem_euclid(TAU)])
        .collect();
    let mut actual: Vec<Scalar> = spun.iter().flat_map(|&(a, b)| [a, b]).collect();
    // Boundaries of 2 pi and 0 are the same point on the circle.
    for v in expected.iter_mut().chain(actual.iter_mut()) {
        if (*v - TAU).abs() < 1e-9 {
            *v = 0.0;
        }
    }
    expected.sort_by(Scalar::total_cmp);
    actual.sort_by(Scalar::total_cmp);
    for (e, a) in expected.iter().zip(&actual) {
        assert!((e - a).abs() < 1e-6, "expected {expected:?}, got {actual:?}");
    }
}

#[test]
fn tilted_radial_lens_sees_the_down_tilt_side_only() {
    let mesh = ball_mesh();
    // Forward 30 degrees off vertical, 60 degree circular fov: rings beyond
    // 60 degrees from the nadir never enter the frustum.
    let cone = RadialCone::new(&tilted(PI / 6.0, 1.0), PI / 3.0);
    let mut saw_partial = false;
    for row in &mesh.rows {
        let limits = cone.theta_limits(row.phi);
        if row.phi > PI / 3.0 + 0.01 {
            assert!(limits.is_empty(), "ring at {} is past the fov", row.phi);
        } else if limits.len() == 1 && limits[0] != (0.0, TAU) {
            // Partial arcs wrap through the tilt azimuth theta = 0.
            let (a, b) = limits[0];
            assert!(a > b, "arc must cross zero: ({a}, {b})");
            assert!(((TAU - a) - b).abs() < 1e-6, "arc must be symmetric about zero");
            saw_partial = true;
        }
    }
    assert!(saw_partial);
}

#[test]
fn ranges_are_sorted_and_disjoint() {
    let mesh = ball_mesh();
    let lens = Lens {
        model: LensModel::Equirectangular {
            fov: DVec2::new(1.2, 0.9),
            focal_length: 300.0,
        },
        dimensions: [800, 600],
        centre: [0.0, 0.0],
    };
    let ranges = visible_ranges(&mesh, &tilted(0.5, 1.0), &lens).unwrap();
    assert!(!ranges.is_empty());
    for &(b, e) in &ranges {
        assert!(b < e && e <= mesh.nodes.len());
    }
    for pair in ranges.windows(2) {
        assert!(pair[0].1 <= pair[1].0);
    }
}
