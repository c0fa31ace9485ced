//! Core data types for the stronghold locator

use serde::{Deserialize, Serialize};

use crate::core::constants::{DEFAULT_SIGMA_DEGREES, NETHER_SCALE};
use crate::core::geometry::normalize_angle;

/// One directional measurement (a throw) taken from a known position
///
/// Observations are values: edits produce a new observation and leave the
/// original untouched, which is what lets callers keep the previous
/// collection around for undo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ObservationRecord")]
pub struct Observation {
    /// Observer x position (blocks)
    pub origin_x: f64,
    /// Observer z position (blocks)
    pub origin_z: f64,
    /// Raw bearing reading in degrees, in `(-180, 180]`
    pub measured_angle: f64,
    /// Bearing after manual nudges, in `(-180, 180]`
    pub corrected_angle: f64,
    /// Score this observation with the heavy-tailed likelihood
    pub use_robust_weighting: bool,
}

impl Observation {
    pub fn new(origin_x: f64, origin_z: f64, angle: f64) -> Self {
        let angle = normalize_angle(angle);
        Self {
            origin_x,
            origin_z,
            measured_angle: angle,
            corrected_angle: angle,
            use_robust_weighting: false,
        }
    }

    /// Same observation with robust weighting switched on
    pub fn robust(mut self) -> Self {
        self.use_robust_weighting = true;
        self
    }

    /// Copy with `delta` degrees added to the corrected angle
    pub fn with_angle_nudged(&self, delta: f64) -> Self {
        Self {
            corrected_angle: normalize_angle(self.corrected_angle + delta),
            ..*self
        }
    }

    /// Copy with the robust weighting flag flipped
    pub fn with_robust_toggled(&self) -> Self {
        Self {
            use_robust_weighting: !self.use_robust_weighting,
            ..*self
        }
    }

    /// Accumulated manual offset between corrected and measured angle
    pub fn correction(&self) -> f64 {
        normalize_angle(self.corrected_angle - self.measured_angle)
    }

    pub fn origin(&self) -> RawPosition {
        RawPosition::new(self.origin_x, self.origin_z)
    }
}

/// Wire form of an [`Observation`]; angles are normalized on the way in
#[derive(Deserialize)]
struct ObservationRecord {
    origin_x: f64,
    origin_z: f64,
    measured_angle: f64,
    #[serde(default)]
    corrected_angle: Option<f64>,
    #[serde(default)]
    use_robust_weighting: bool,
}

impl From<ObservationRecord> for Observation {
    fn from(record: ObservationRecord) -> Self {
        Self {
            origin_x: record.origin_x,
            origin_z: record.origin_z,
            measured_angle: normalize_angle(record.measured_angle),
            corrected_angle: normalize_angle(record.corrected_angle.unwrap_or(record.measured_angle)),
            use_robust_weighting: record.use_robust_weighting,
        }
    }
}

/// A position with no directional information
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPosition {
    pub x: f64,
    pub z: f64,
}

impl RawPosition {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }
}

/// One admissible target cell and its prior probability mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCandidate {
    /// Target x position (blocks)
    pub x: i32,
    /// Target z position (blocks)
    pub z: i32,
    /// Prior probability mass
    pub prior_weight: f64,
}

impl GridCandidate {
    pub fn new(x: i32, z: i32, prior_weight: f64) -> Self {
        Self { x, z, prior_weight }
    }

    /// Euclidean distance to a world position
    pub fn distance_to(&self, x: f64, z: f64) -> f64 {
        (self.x as f64 - x).hypot(self.z as f64 - z)
    }

    /// Matching coordinates in the nether
    pub fn nether_coords(&self) -> (i32, i32) {
        (
            (self.x as f64 / NETHER_SCALE).floor() as i32,
            (self.z as f64 / NETHER_SCALE).floor() as i32,
        )
    }

    pub(crate) fn coords(&self) -> (i32, i32) {
        (self.x, self.z)
    }
}

/// Standard deviation of the angle measurement error
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseModel {
    pub sigma_degrees: f64,
    /// Number of samples the estimate was computed from (0 for a configured default)
    pub sample_count: usize,
}

impl NoiseModel {
    pub fn new(sigma_degrees: f64) -> Self {
        Self { sigma_degrees, sample_count: 0 }
    }
}

impl Default for NoiseModel {
    fn default() -> Self {
        Self::new(DEFAULT_SIGMA_DEGREES)
    }
}
