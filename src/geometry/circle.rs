// src/geometry/circle.rs
// Ring geometry for a flat disc on the observation plane.

use std::f64::consts::FRAC_PI_2;

use super::{Shape, ShapeSignature};
use crate::Scalar;

/// A disc of radius `radius` painted on the ground, sampled so that a slice
/// through it crosses `intersections` mesh rings.
///
/// Discs have no height, so only the downward sweep exists. A ray at polar
/// angle phi lands at ground distance `h * tan(phi)`; consecutive tangent
/// discs sit at `(2n + 1) * r`, giving `tan(phi_n) = (2n + 1) * r / h`.
#[derive(Debug, Clone, Copy)]
pub struct Circle {
    pub radius: Scalar,
    pub intersections: Scalar,
}

impl Circle {
    pub fn new(radius: Scalar, intersections: Scalar) -> Self {
        Self {
            radius,
            intersections,
        }
    }
}

impl Shape for Circle {
    fn phi(&self, phi: Scalar, h: Scalar) -> Scalar {
        if phi < FRAC_PI_2 && h > 0.0 {
            let n = (h * phi.tan() / self.radius - 1.0) * 0.5 + 1.0 / self.intersections;
            ((2.0 * n + 1.0) * self.radius / h).atan()
        } else {
            Scalar::NAN
        }
    }

    fn theta(&self, phi: Scalar, h: Scalar) -> Scalar {
        if phi < FRAC_PI_2 && h > 0.0 {
            2.0 * (self.radius / (h * phi.tan())).asin() / self.intersections
        } else {
            Scalar::NAN
        }
    }

    fn k(&self, h0: Scalar, h1: Scalar) -> Scalar {
        h0 / h1
    }

    fn signature(&self) -> ShapeSignature {
        ShapeSignature {
            kind: "circle",
            radius: self.radius,
            intersections: self.intersections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phi_advances_by_one_object_per_intersection_count() {
        let c = Circle::new(0.05, 1.0);
        let h = 1.0;
        // With one intersection per object, consecutive ring ground distances
        // differ by a full disc diameter.
        let phi0 = c.phi(0.0, h);
        let phi1 = c.phi(phi0, h);
        let d0 = h * phi0.tan();
        let d1 = h * phi1.tan();
        assert!((d0 - 2.0 * c.radius).abs() < 1e-9);
        assert!(((d1 - d0) - 2.0 * c.radius).abs() < 1e-9);
    }

    #[test]
    fn no_upward_sweep_for_a_flat_disc() {
        let c = Circle::new(0.05, 5.0);
        assert!(c.phi(std::f64::consts::PI, 1.0).is_nan());
        assert!(c.theta(2.0, 1.0).is_nan());
    }

    #[test]
    fn k_scales_inversely_with_height() {
        let c = Circle::new(0.05, 5.0);
        assert!((c.k(1.0, 2.0) - 0.5).abs() < 1e-12);
        assert!((c.k(2.0, 1.0) - 2.0).abs() < 1e-12);
    }
}
