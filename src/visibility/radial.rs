// src/visibility/radial.rs
// Circular frustum against the cone of a constant-phi ring: the intersection of
// the unit sphere, the fov boundary plane and the ring cone, solved in 2D after
// rotating the optical axis into the x/z plane.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use glam::DVec3;

use crate::camera::CameraPose;
use crate::Scalar;

/// Precomputed circular field of view around the optical axis.
#[derive(Debug, Clone, Copy)]
pub struct RadialCone {
    forward: DVec3,
    half_fov: Scalar,
    cos_half_fov: Scalar,
}

impl RadialCone {
    pub fn new(pose: &CameraPose, fov: Scalar) -> Self {
        Self {
            forward: pose.forward(),
            half_fov: fov * 0.5,
            cos_half_fov: (fov * 0.5).cos(),
        }
    }

    /// Azimuth intervals of the ring at `phi` inside the field of view.
    /// At most one interval exists because both surfaces are circular cones.
    pub fn theta_limits(&self, phi: Scalar) -> Vec<(Scalar, Scalar)> {
        let upper = phi > FRAC_PI_2;

        // Camera inclination measured like phi, from straight down.
        let inclination = (-self.forward.z).clamp(-1.0, 1.0).acos();

        // Entirely inside: the fov swallows the whole ring.
        let inside = if upper {
            self.half_fov - (PI - inclination) > PI - phi
        } else {
            self.half_fov - inclination > phi
        };
        if inside {
            return vec![(0.0, TAU)];
        }

        // Entirely outside: the ring never reaches the fov boundary.
        let outside = if upper {
            self.half_fov + (PI - inclination) < PI - phi
        } else {
            self.half_fov + inclination < phi
        };
        if outside {
            return Vec::new();
        }

        // Rotate the forward vector about z so its y component vanishes; the
        // early outs above guarantee it is off axis, so the offset is defined.
        let offset = self.forward.y.atan2(self.forward.x);
        let r_x = self.forward.x.hypot(self.forward.y);

        let z = -phi.cos();
        let a = 1.0 - z * z;
        let x = (self.cos_half_fov - self.forward.z * z) / r_x;

        let y_disc = a - x * x;
        if !y_disc.is_finite() || y_disc < 0.0 {
            return Vec::new();
        }

        let y = y_disc.sqrt();
        let t1 = offset + (-y).atan2(x);
        let t2 = offset + y.atan2(x);
        vec![(wrap_tau(t1), wrap_tau(t2))]
    }
}

fn wrap_tau(theta: Scalar) -> Scalar {
    if theta > 0.0 {
        theta % TAU
    } else {
        theta % TAU + TAU
    }
}
