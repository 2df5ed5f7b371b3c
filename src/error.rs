//! Central error handling for the visual mesh crate.
//!
//! Provides a unified MeshError enum with consistent categorization
//! and conversion to Python exceptions when built as an extension module.

/// Centralized error type for all mesh operations.
#[derive(thiserror::Error, Debug)]
pub enum MeshError {
    /// Malformed caller input, detected before any work begins.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A numerical invariant was violated mid computation.
    #[error("numerical failure: {0}")]
    NumericalFailure(String),

    /// The compute device could not be acquired or driven.
    #[error("device error: {0}")]
    Device(String),
}

impl MeshError {
    pub fn invalid_input<T: ToString>(msg: T) -> Self {
        MeshError::InvalidInput(msg.to_string())
    }

    pub fn numerical<T: ToString>(msg: T) -> Self {
        MeshError::NumericalFailure(msg.to_string())
    }

    pub fn device<T: ToString>(msg: T) -> Self {
        MeshError::Device(msg.to_string())
    }
}

/// Result type alias for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;

#[cfg(feature = "extension-module")]
impl From<MeshError> for pyo3::PyErr {
    fn from(err: MeshError) -> Self {
        match err {
            MeshError::InvalidInput(_) => {
                pyo3::exceptions::PyValueError::new_err(err.to_string())
            }
            _ => pyo3::exceptions::PyRuntimeError::new_err(err.to_string()),
        }
    }
}
