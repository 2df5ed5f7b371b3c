// src/geometry/sphere.rs
// Ring geometry for a sphere resting on the observation plane.

use std::f64::consts::{FRAC_PI_2, PI};

use super::{Shape, ShapeSignature};
use crate::Scalar;

/// A sphere of radius `radius` sitting on the ground, sampled so that a slice
/// through it crosses `intersections` mesh rings.
///
/// The construction works in the plane of sphere centres (z = radius). With
/// the tangent length from the camera to the sphere directly below it,
/// `D = sqrt(h * (h - 2r))`, consecutive tangent spheres along the ground sit
/// at `tan(phi_n) = (2n + 1) * r / D`; one ring step advances the jump
/// variable n by `1 / intersections`. Above the horizon (camera below the
/// sphere centre plane) the same construction applies mirrored about the
/// zenith with `D = sqrt(h * (2r - h))`.
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub radius: Scalar,
    pub intersections: Scalar,
}

impl Sphere {
    pub fn new(radius: Scalar, intersections: Scalar) -> Self {
        Self {
            radius,
            intersections,
        }
    }

    /// Jump variable for a ring angle below the horizon.
    fn n_below(&self, phi: Scalar, h: Scalar) -> Scalar {
        let d = (h * (h - 2.0 * self.radius)).sqrt();
        (d * phi.tan() / self.radius - 1.0) * 0.5
    }

    /// Jump variable for a ring angle above the horizon.
    fn n_above(&self, phi: Scalar, h: Scalar) -> Scalar {
        let d = (h * (2.0 * self.radius - h)).sqrt();
        (d * (PI - phi).tan() / self.radius - 1.0) * 0.5
    }
}

impl Shape for Sphere {
    fn phi(&self, phi: Scalar, h: Scalar) -> Scalar {
        if h > self.radius && phi < FRAC_PI_2 {
            let d = (h * (h - 2.0 * self.radius)).sqrt();
            let n = self.n_below(phi, h) + 1.0 / self.intersections;
            ((2.0 * n + 1.0) * self.radius / d).atan()
        } else if h < self.radius && phi > FRAC_PI_2 {
            let d = (h * (2.0 * self.radius - h)).sqrt();
            let n = self.n_above(phi, h) + 1.0 / self.intersections;
            PI - ((2.0 * n + 1.0) * self.radius / d).atan()
        } else {
            Scalar::NAN
        }
    }

    fn theta(&self, phi: Scalar, h: Scalar) -> Scalar {
        // Ring radius measured in the plane of sphere centres. asin goes NaN
        // when the object subtends more than the whole ring, which skips the
        // ring rather than ending the sweep.
        if h > self.radius && phi < FRAC_PI_2 {
            let ring = (h - self.radius) * phi.tan();
            2.0 * (self.radius / ring).asin() / self.intersections
        } else if h < self.radius && phi > FRAC_PI_2 {
            let ring = (self.radius - h) * (PI - phi).tan();
            2.0 * (self.radius / ring).asin() / self.intersections
        } else {
            Scalar::NAN
        }
    }

    fn k(&self, h0: Scalar, h1: Scalar) -> Scalar {
        (h0 * (h0 - 2.0 * self.radius)).sqrt() / (h1 * (h1 - 2.0 * self.radius)).sqrt()
    }

    fn signature(&self) -> ShapeSignature {
        ShapeSignature {
            kind: "sphere",
            radius: self.radius,
            intersections: self.intersections,
        }
    }
}
