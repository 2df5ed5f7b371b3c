// src/visibility/equirectangular.rs
// Rectangular frustum against the cone of a constant-phi ring.
// Each frustum edge is a parametric segment; its intersection with the cone is
// one quadratic whose coefficients split into phi-independent parts.

use std::f64::consts::{FRAC_PI_2, TAU};

use glam::{DVec2, DVec3};

use crate::camera::CameraPose;
use crate::error::{MeshError, MeshResult};
use crate::Scalar;

/// Precomputed view frustum for a rectangular field of view.
///
/// Corners, edge directions, inward edge normals and the six per-edge
/// quadratic constants depend only on the pose and lens, so they are built
/// once and reused for every ring.
#[derive(Debug, Clone)]
pub struct Frustum {
    corners: [DVec3; 4],
    edges: [DVec3; 4],
    normals: [DVec3; 4],
    eq: [[Scalar; 6]; 4],
    forward_z: Scalar,
}

impl Frustum {
    /// Build the frustum for a camera pose and a full-angle rectangular fov.
    pub fn new(pose: &CameraPose, fov: DVec2) -> Self {
        let y_extent = (fov.x * 0.5).tan();
        let z_extent = (fov.y * 0.5).tan();

        // Corner rays in the camera frame, clockwise as seen from behind the
        // camera, rotated to world space.
        let corners_cam = [
            DVec3::new(1.0, y_extent, z_extent),
            DVec3::new(1.0, -y_extent, z_extent),
            DVec3::new(1.0, -y_extent, -z_extent),
            DVec3::new(1.0, y_extent, -z_extent),
        ];
        let corners = corners_cam.map(|c| pose.roc * c);

        // Corner-to-next-corner vectors, scaled to the full edge length so the
        // segment parameter runs over [0, 1].
        let y_axis = pose.roc.y_axis;
        let z_axis = pose.roc.z_axis;
        let edges = [
            -y_axis * (2.0 * y_extent),
            -z_axis * (2.0 * z_extent),
            y_axis * (2.0 * y_extent),
            z_axis * (2.0 * z_extent),
        ];

        let normals = [
            corners[0].cross(corners[1]),
            corners[1].cross(corners[2]),
            corners[2].cross(corners[3]),
            corners[3].cross(corners[0]),
        ];

        // Quadratic constants per edge. With o the corner, d the edge and
        // c2 = tan^2(phi), the segment parameter of a cone crossing is
        //   t = (c2*p0 + p1 +- sqrt(c2*p2 + p3)) / (c2*p4 + p5).
        let mut eq = [[0.0; 6]; 4];
        for i in 0..4 {
            let o = corners[i];
            let d = edges[i];
            eq[i][0] = d.z * o.z;
            eq[i][1] = -d.y * o.y - d.x * o.x;
            eq[i][2] = d.x * d.x * o.z * o.z - 2.0 * d.x * d.z * o.x * o.z
                + d.y * d.y * o.z * o.z
                - 2.0 * d.y * d.z * o.y * o.z
                + d.z * d.z * o.x * o.x
                + d.z * d.z * o.y * o.y;
            eq[i][3] =
                -d.x * d.x * o.y * o.y + 2.0 * d.x * d.y * o.x * o.y - d.y * d.y * o.x * o.x;
            eq[i][4] = -d.z * d.z;
            eq[i][5] = d.x * d.x + d.y * d.y;
        }

        Self {
            corners,
            edges,
            normals,
            eq,
            forward_z: pose.forward().z,
        }
    }

    /// Azimuth intervals of the ring at `phi` that lie inside the frustum.
    ///
    /// The quadratic is evaluated with every term multiplied through by
    /// cos^2(phi), which keeps it finite across the horizon where tan(phi)
    /// blows up.
    pub fn theta_limits(&self, phi: Scalar) -> MeshResult<Vec<(Scalar, Scalar)>> {
        let (sin_phi, cos_phi) = phi.sin_cos();
        let s2 = sin_phi * sin_phi;
        let c2 = cos_phi * cos_phi;
        let upper = phi > FRAC_PI_2;

        let mut limits: Vec<Scalar> = Vec::new();
        let mut complex = 0;

        for i in 0..4 {
            let p = &self.eq[i];
            let num = s2 * p[0] + c2 * p[1];
            let disc = s2 * p[2] + c2 * p[3];
            let denom = s2 * p[4] + c2 * p[5];

            if disc <= 0.0 {
                complex += 1;
                continue;
            }
            if denom == 0.0 {
                continue;
            }

            let root = cos_phi.abs() * disc.sqrt();
            let o = self.corners[i];
            let d = self.edges[i];
            for t in [(num + root) / denom, (num - root) / denom] {
                if !(0.0..=1.0).contains(&t) {
                    continue;
                }
                // Both cone nappes satisfy the squared equation; keep the one
                // on the same side of the horizon as the ring.
                let z = o.z + d.z * t;
                if (z > 0.0) != upper {
                    continue;
                }
                let x = o.x + d.x * t;
                let y = o.y + d.y * t;
                let theta = y.atan2(x);
                limits.push(if theta > 0.0 { theta } else { theta + TAU });
            }
        }

        // No edge crossing at all: the ring is either entirely inside or
        // entirely outside, decided by a single point on the cone.
        if complex == 4 && ((cos_phi > 0.0) == (self.forward_z < 0.0)) {
            let probe = DVec3::new(sin_phi, 0.0, -cos_phi);
            if self.contains(probe) {
                return Ok(vec![(0.0, TAU)]);
            }
        } else if !limits.is_empty() {
            if limits.len() % 2 != 0 {
                return Err(MeshError::numerical(format!(
                    "odd number of frustum intersections ({}) on ring at phi={phi}",
                    limits.len()
                )));
            }
            limits.sort_by(Scalar::total_cmp);

            // Probe halfway between the first two crossings to learn whether
            // the first one opens or closes a visible arc.
            let mid = (limits[0] + limits[1]) * 0.5;
            let probe = DVec3::new(mid.cos() * sin_phi, mid.sin() * sin_phi, -cos_phi);
            let first_is_end = !self.contains(probe);

            let mut out = Vec::with_capacity(limits.len() / 2 + 1);
            let start = usize::from(first_is_end);
            let mut i = start;
            while i + 1 < limits.len() {
                out.push((limits[i], limits[i + 1]));
                i += 2;
            }
            if first_is_end {
                out.push((limits[limits.len() - 1], limits[0]));
            }
            return Ok(out);
        }

        Ok(Vec::new())
    }

    fn contains(&self, v: DVec3) -> bool {
        self.normals.iter().all(|n| n.dot(v) >= 0.0)
    }
}
