//! Result types handed back to the caller after every estimate

use serde::{Deserialize, Serialize};

use crate::core::{GridCandidate, Observation};

/// A candidate with its normalized posterior probability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate: GridCandidate,
    pub probability: f64,
}

/// Outcome of a triangulation call
///
/// When `succeeded` is false the optional fields are absent and
/// `angle_residuals` is empty, which callers render as "insufficient data".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorResult {
    pub succeeded: bool,
    pub best_candidate: Option<GridCandidate>,
    /// 1-sigma position uncertainty around the best candidate (blocks)
    pub uncertainty_radius: Option<f64>,
    /// Signed residual (degrees) of each input observation against the best candidate, in input order
    pub angle_residuals: Vec<f64>,
    /// Highest posterior candidates, best first
    pub top_candidates: Vec<RankedCandidate>,
    /// Number of candidates that received a finite score
    pub scored_candidates: usize,
}

impl CalculatorResult {
    pub fn failed() -> Self {
        Self {
            succeeded: false,
            best_candidate: None,
            uncertainty_radius: None,
            angle_residuals: Vec::new(),
            top_candidates: Vec::new(),
            scored_candidates: 0,
        }
    }

    /// Posterior probability of the best candidate
    pub fn best_probability(&self) -> Option<f64> {
        self.top_candidates.first().map(|ranked| ranked.probability)
    }

    /// Distance from an observation's origin to the best candidate
    pub fn distance_from(&self, observation: &Observation) -> Option<f64> {
        self.best_candidate
            .map(|best| best.distance_to(observation.origin_x, observation.origin_z))
    }

    pub fn nether_coords(&self) -> Option<(i32, i32)> {
        self.best_candidate.map(|best| best.nether_coords())
    }
}

/// Outcome of a blind (position only) estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlindResult {
    pub succeeded: bool,
    pub nearest_candidate: Option<GridCandidate>,
    /// Distance from the queried position to the nearest candidate (blocks)
    pub distance: Option<f64>,
}

impl BlindResult {
    pub fn failed() -> Self {
        Self {
            succeeded: false,
            nearest_candidate: None,
            distance: None,
        }
    }
}
