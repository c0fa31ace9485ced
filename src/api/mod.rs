//! Caller-facing API
//!
//! Result values returned after every estimate and the [`StrongholdLocator`]
//! facade that owns the shared prior and noise model.

pub mod types;
pub mod locator;

pub use types::{CalculatorResult, BlindResult, RankedCandidate};
pub use locator::StrongholdLocator;
