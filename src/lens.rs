// src/lens.rs
// Lens models consumed by the visibility oracle and the projection bridge.
// Two frustum families exist: rectangular (equirectangular model) and circular (radial model).

use glam::DVec2;

use crate::error::{MeshError, MeshResult};
use crate::Scalar;

/// Mapping from incidence angle to radial pixel distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// r = f * theta
    Equidistant,
    /// r = 2f * sin(theta / 2)
    Equisolid,
    /// r = f * tan(theta)
    Rectilinear,
}

impl Projection {
    /// Parse the operator-level projection name.
    pub fn parse(name: &str) -> MeshResult<Self> {
        match name {
            "EQUIDISTANT" => Ok(Projection::Equidistant),
            "EQUISOLID" => Ok(Projection::Equisolid),
            "RECTILINEAR" => Ok(Projection::Rectilinear),
            other => Err(MeshError::invalid_input(format!(
                "projection must be one of EQUISOLID, EQUIDISTANT or RECTILINEAR, got {other:?}"
            ))),
        }
    }

    /// Radial pixel distance for an incidence angle, with `f` in pixels.
    pub fn r(&self, theta: Scalar, f: Scalar) -> Scalar {
        match self {
            Projection::Equidistant => f * theta,
            Projection::Equisolid => 2.0 * f * (theta * 0.5).sin(),
            Projection::Rectilinear => f * theta.tan(),
        }
    }
}

/// The optical model, which also fixes the frustum shape used for culling.
#[derive(Debug, Clone, Copy)]
pub enum LensModel {
    /// Rectangular field of view; fov holds the full horizontal and vertical angles.
    Equirectangular { fov: DVec2, focal_length: Scalar },
    /// Circular field of view of full angle `fov` around the optical axis.
    Radial {
        projection: Projection,
        fov: Scalar,
        pixels_per_radian: Scalar,
    },
}

/// A complete lens: optical model plus sensor geometry.
#[derive(Debug, Clone, Copy)]
pub struct Lens {
    pub model: LensModel,
    /// Image size in pixels, x first.
    pub dimensions: [i32; 2],
    /// Offset of the optical centre from the image centre, in pixels.
    pub centre: [Scalar; 2],
}

impl Lens {
    /// Reject lenses with unusable numbers before any projection runs.
    pub fn validate(&self) -> MeshResult<()> {
        if self.dimensions[0] <= 0 || self.dimensions[1] <= 0 {
            return Err(MeshError::invalid_input("image dimensions must be positive"));
        }
        if !self.centre[0].is_finite() || !self.centre[1].is_finite() {
            return Err(MeshError::invalid_input("lens centre must be finite"));
        }
        match self.model {
            LensModel::Equirectangular { fov, focal_length } => {
                if !(fov.x > 0.0 && fov.x < std::f64::consts::PI)
                    || !(fov.y > 0.0 && fov.y < std::f64::consts::PI)
                {
                    return Err(MeshError::invalid_input(
                        "rectangular field of view must be in (0, pi) per axis",
                    ));
                }
                if !(focal_length.is_finite() && focal_length > 0.0) {
                    return Err(MeshError::invalid_input("focal length must be positive"));
                }
            }
            LensModel::Radial {
                fov,
                pixels_per_radian,
                ..
            } => {
                if !(fov > 0.0 && fov <= std::f64::consts::TAU) {
                    return Err(MeshError::invalid_input(
                        "circular field of view must be in (0, 2pi]",
                    ));
                }
                if !(pixels_per_radian.is_finite() && pixels_per_radian > 0.0) {
                    return Err(MeshError::invalid_input(
                        "pixels per radian must be positive",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Focal scale in pixels for the projection function.
    pub fn focal(&self) -> Scalar {
        match self.model {
            LensModel::Equirectangular { focal_length, .. } => focal_length,
            LensModel::Radial {
                pixels_per_radian, ..
            } => pixels_per_radian,
        }
    }

    /// The projection kind used when converting rays to pixels.
    pub fn projection(&self) -> Projection {
        match self.model {
            LensModel::Equirectangular { .. } => Projection::Rectilinear,
            LensModel::Radial { projection, .. } => projection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_known_projections() {
        assert_eq!(
            Projection::parse("EQUIDISTANT").unwrap(),
            Projection::Equidistant
        );
        assert_eq!(Projection::parse("EQUISOLID").unwrap(), Projection::Equisolid);
        assert_eq!(
            Projection::parse("RECTILINEAR").unwrap(),
            Projection::Rectilinear
        );
        assert!(Projection::parse("FISHEYE").is_err());
    }

    #[test]
    fn projection_radii_match_their_closed_forms() {
        let f = 420.0;
        let theta = 0.35;
        assert!((Projection::Equidistant.r(theta, f) - f * theta).abs() < 1e-12);
        assert!(
            (Projection::Equisolid.r(theta, f) - 2.0 * f * (theta / 2.0).sin()).abs() < 1e-12
        );
        assert!((Projection::Rectilinear.r(theta, f) - f * theta.tan()).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_degenerate_dimensions() {
        let lens = Lens {
            model: LensModel::Radial {
                projection: Projection::Equidistant,
                fov: 1.0,
                pixels_per_radian: 100.0,
            },
            dimensions: [0, 480],
            centre: [0.0, 0.0],
        };
        assert!(lens.validate().is_err());
    }
}
