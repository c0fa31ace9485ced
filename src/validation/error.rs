//! Error conditions raised by the calibration flow
//!
//! Triangulation and blind estimation never fail with an error: their
//! failures are carried by `succeeded` on the result value.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalibrationError {
    /// The operation needs a run in the collecting state
    #[error("no calibration run is collecting samples")]
    NotCollecting,
    /// The run was cancelled or superseded before it completed
    #[error("calibration run was cancelled")]
    Cancelled,
    #[error("calibration run has no samples yet")]
    NoSamples,
}
