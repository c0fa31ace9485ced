//! Stateful processing: noise calibration and throw bookkeeping

pub mod calibration;
pub mod session;

pub use calibration::{
    CalibrationEngine, CalibrationOutcome, CalibrationProgress, CalibrationState, CancelHandle,
    SharedNoiseModel,
};
pub use session::{ObservationSet, ThrowSession};
