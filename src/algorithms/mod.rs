//! Estimation algorithms over the discrete candidate grid

pub mod prior;
pub mod likelihood;
pub mod triangulation;
pub mod blind;

pub use prior::{GridPrior, GridGeometry, RingSpec};
pub use likelihood::ResidualLikelihood;
pub use triangulation::TriangulationEngine;
pub use blind::BlindEstimator;
