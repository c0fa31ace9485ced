//! Stronghold Locator
//!
//! Estimates the cell holding a hidden target on a ring-shaped world grid from
//! a handful of noisy bearing observations, and learns the bearing noise from
//! calibration throws at a known target.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod validation;
pub mod utils;
pub mod api;

// Re-export commonly used types
pub use crate::core::{Observation, RawPosition, GridCandidate, NoiseModel, MAX_OBSERVATIONS};
pub use crate::algorithms::{GridPrior, GridGeometry, RingSpec, TriangulationEngine, BlindEstimator};
pub use crate::processing::{
    CalibrationEngine, CalibrationOutcome, CalibrationProgress, CalibrationState, CancelHandle,
    SharedNoiseModel, ObservationSet, ThrowSession,
};
pub use crate::validation::CalibrationError;
pub use crate::utils::{ConfigurationManager, LocatorConfig, ConfigError};
pub use crate::api::{CalculatorResult, BlindResult, RankedCandidate, StrongholdLocator};
