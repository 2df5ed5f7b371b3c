// src/camera.rs
// Camera pose over the observation plane: rotation from camera frame to world frame plus height.
// The world frame has z up with the ground at z = 0; the camera optical axis is its local x.

use glam::{DMat3, DVec3};

use crate::error::{MeshError, MeshResult};
use crate::Scalar;

/// Rigid camera pose above the observation plane.
///
/// `roc` maps camera-frame vectors into world coordinates; its first column is
/// the optical axis expressed in the world frame. `height` is the camera's
/// elevation above the ground plane (the z translation of the homogeneous
/// camera-to-world transform).
#[derive(Debug, Clone, Copy)]
pub struct CameraPose {
    pub roc: DMat3,
    pub height: Scalar,
}

impl CameraPose {
    pub fn new(roc: DMat3, height: Scalar) -> Self {
        Self { roc, height }
    }

    /// Build a pose from a row-major 3x3 rotation and a height.
    pub fn from_rows(rows: [[Scalar; 3]; 3], height: Scalar) -> Self {
        let roc = DMat3::from_cols(
            DVec3::new(rows[0][0], rows[1][0], rows[2][0]),
            DVec3::new(rows[0][1], rows[1][1], rows[2][1]),
            DVec3::new(rows[0][2], rows[1][2], rows[2][2]),
        );
        Self { roc, height }
    }

    /// Build a pose from a row-major homogeneous camera-to-world transform.
    /// The height is read from the z component of the translation column.
    pub fn from_homogeneous(hoc: [[Scalar; 4]; 4]) -> Self {
        let rows = [
            [hoc[0][0], hoc[0][1], hoc[0][2]],
            [hoc[1][0], hoc[1][1], hoc[1][2]],
            [hoc[2][0], hoc[2][1], hoc[2][2]],
        ];
        Self::from_rows(rows, hoc[2][3])
    }

    /// The optical axis in world coordinates.
    pub fn forward(&self) -> DVec3 {
        self.roc.x_axis
    }

    /// Rotation from world frame into the camera frame.
    pub fn rco(&self) -> DMat3 {
        self.roc.transpose()
    }

    /// Reject poses that cannot be worked with before any geometry runs.
    pub fn validate(&self) -> MeshResult<()> {
        let finite = self.roc.x_axis.is_finite()
            && self.roc.y_axis.is_finite()
            && self.roc.z_axis.is_finite();
        if !finite {
            return Err(MeshError::invalid_input("rotation must be finite"));
        }
        if !self.height.is_finite() {
            return Err(MeshError::invalid_input("height must be finite"));
        }
        Ok(())
    }
}
