use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::algorithms::prior::GridGeometry;
use crate::core::constants::{
    DEFAULT_CALIBRATION_SAMPLES, DEFAULT_PRIOR_SPREAD_BLOCKS, DEFAULT_ROBUST_DOF,
    DEFAULT_SIGMA_DEGREES, MAX_OBSERVATIONS, MIN_CALIBRATION_SAMPLES, SIGMA_FLOOR_DEGREES,
};
use crate::core::NoiseModel;

/// Top-level locator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub noise: NoiseConfig,
    pub grid: GridGeometry,
    pub triangulation: TriangulationConfig,
    pub calibration: CalibrationConfig,
    /// Number of live observations a session keeps
    pub max_observations: usize,
}

/// Angle measurement noise settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Sigma used until a calibration run completes (degrees)
    pub default_sigma_degrees: f64,
}

/// Triangulation engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangulationConfig {
    /// Degrees of freedom of the robust likelihood
    pub robust_dof: f64,
    /// Number of ranked candidates reported
    pub top_candidates: usize,
    /// Positional prior spread regularizing the uncertainty radius (blocks)
    pub prior_spread_blocks: f64,
}

/// Calibration run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Samples that complete a run
    pub target_samples: usize,
    /// Smallest sigma a run may publish (degrees)
    pub sigma_floor_degrees: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            noise: NoiseConfig::default(),
            grid: GridGeometry::default(),
            triangulation: TriangulationConfig::default(),
            calibration: CalibrationConfig::default(),
            max_observations: MAX_OBSERVATIONS,
        }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            default_sigma_degrees: DEFAULT_SIGMA_DEGREES,
        }
    }
}

impl NoiseConfig {
    /// Noise model before any calibration
    pub fn initial_model(&self) -> NoiseModel {
        NoiseModel::new(self.default_sigma_degrees)
    }
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        Self {
            robust_dof: DEFAULT_ROBUST_DOF,
            top_candidates: 5,
            prior_spread_blocks: DEFAULT_PRIOR_SPREAD_BLOCKS,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            target_samples: DEFAULT_CALIBRATION_SAMPLES,
            sigma_floor_degrees: SIGMA_FLOOR_DEGREES,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value {value} for {parameter}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("config I/O error: {message}")]
    IoError { message: String },
    #[error("config serialization error: {message}")]
    SerializationError { message: String },
}

/// Configuration validation result
#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ConfigError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    fn into_first_error(self) -> Option<ConfigError> {
        self.errors.into_iter().next()
    }
}

/// Loads, validates and stores the locator configuration
pub struct ConfigurationManager {
    config: LocatorConfig,
    config_file_path: Option<String>,
    is_modified: bool,
}

impl Default for ConfigurationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationManager {
    /// Create a new configuration manager with default settings
    pub fn new() -> Self {
        Self {
            config: LocatorConfig::default(),
            config_file_path: None,
            is_modified: false,
        }
    }

    /// Create configuration manager and load from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Replace the configuration after validation
    pub fn update_config(&mut self, config: LocatorConfig) -> Result<(), ConfigError> {
        if let Some(error) = Self::validate_config(&config).into_first_error() {
            return Err(error);
        }

        self.config = config;
        self.is_modified = true;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: LocatorConfig = serde_json::from_str(&content).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to parse config file '{}': {}", path_str, e),
        })?;

        let validation = Self::validate_config(&config);
        for warning in &validation.warnings {
            warn!("{}: {}", path_str, warning);
        }
        if let Some(error) = validation.into_first_error() {
            return Err(error);
        }

        info!("Loaded locator configuration from {}", path_str);
        self.config = config;
        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save configuration to JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(&self.config).map_err(|e| ConfigError::SerializationError {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })?;

        self.config_file_path = Some(path_str);
        self.is_modified = false;
        Ok(())
    }

    /// Save to the currently loaded file path
    pub fn save(&mut self) -> Result<(), ConfigError> {
        if let Some(path) = self.config_file_path.clone() {
            self.save_to_file(path)
        } else {
            Err(ConfigError::IoError {
                message: "No file path set for saving configuration".to_string(),
            })
        }
    }

    /// Check if configuration has been modified since last save
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }

    /// Update the pre-calibration sigma, returning the previous value
    pub fn set_default_sigma(&mut self, sigma_degrees: f64) -> Result<f64, ConfigError> {
        let old_value = self.config.noise.default_sigma_degrees;

        if !(sigma_degrees.is_finite() && sigma_degrees > 0.0) {
            return Err(ConfigError::InvalidParameter {
                parameter: "noise.default_sigma_degrees".to_string(),
                value: sigma_degrees.to_string(),
                reason: "Sigma must be a positive number of degrees".to_string(),
            });
        }

        self.config.noise.default_sigma_degrees = sigma_degrees;
        self.is_modified = true;
        Ok(old_value)
    }

    /// Update the number of samples that completes a calibration run
    pub fn set_calibration_samples(&mut self, samples: usize) -> Result<usize, ConfigError> {
        let old_value = self.config.calibration.target_samples;

        if samples < MIN_CALIBRATION_SAMPLES {
            return Err(ConfigError::InvalidParameter {
                parameter: "calibration.target_samples".to_string(),
                value: samples.to_string(),
                reason: format!("At least {} samples are needed for a deviation", MIN_CALIBRATION_SAMPLES),
            });
        }

        self.config.calibration.target_samples = samples;
        self.is_modified = true;
        Ok(old_value)
    }

    pub fn validate_config(config: &LocatorConfig) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let sigma = config.noise.default_sigma_degrees;
        if !(sigma.is_finite() && sigma > 0.0) {
            errors.push(ConfigError::InvalidParameter {
                parameter: "noise.default_sigma_degrees".to_string(),
                value: sigma.to_string(),
                reason: "Sigma must be a positive number of degrees".to_string(),
            });
        } else if sigma > 5.0 {
            warnings.push("Very large default sigma will make single throws nearly uninformative".to_string());
        }

        if config.grid.cell_size <= 0 {
            errors.push(ConfigError::InvalidParameter {
                parameter: "grid.cell_size".to_string(),
                value: config.grid.cell_size.to_string(),
                reason: "Cell size must be positive".to_string(),
            });
        }

        if config.grid.rings.is_empty() {
            errors.push(ConfigError::InvalidParameter {
                parameter: "grid.rings".to_string(),
                value: "[]".to_string(),
                reason: "At least one ring is required to build candidates".to_string(),
            });
        }

        for (index, ring) in config.grid.rings.iter().enumerate() {
            if !(ring.inner_radius >= 0.0 && ring.outer_radius > ring.inner_radius) {
                errors.push(ConfigError::InvalidParameter {
                    parameter: format!("grid.rings[{}]", index),
                    value: format!("{}..{}", ring.inner_radius, ring.outer_radius),
                    reason: "Ring radii must satisfy 0 <= inner < outer".to_string(),
                });
            }
            if ring.strongholds == 0 {
                warnings.push(format!("Ring {} holds no targets and contributes no candidates", index));
            }
        }

        if !(config.triangulation.robust_dof.is_finite() && config.triangulation.robust_dof > 0.0) {
            errors.push(ConfigError::InvalidParameter {
                parameter: "triangulation.robust_dof".to_string(),
                value: config.triangulation.robust_dof.to_string(),
                reason: "Degrees of freedom must be positive".to_string(),
            });
        }

        if !(config.triangulation.prior_spread_blocks.is_finite() && config.triangulation.prior_spread_blocks > 0.0) {
            errors.push(ConfigError::InvalidParameter {
                parameter: "triangulation.prior_spread_blocks".to_string(),
                value: config.triangulation.prior_spread_blocks.to_string(),
                reason: "Prior spread must be positive".to_string(),
            });
        }

        if config.calibration.target_samples < MIN_CALIBRATION_SAMPLES {
            errors.push(ConfigError::InvalidParameter {
                parameter: "calibration.target_samples".to_string(),
                value: config.calibration.target_samples.to_string(),
                reason: format!("At least {} samples are needed for a deviation", MIN_CALIBRATION_SAMPLES),
            });
        }

        if !(config.calibration.sigma_floor_degrees.is_finite() && config.calibration.sigma_floor_degrees > 0.0) {
            errors.push(ConfigError::InvalidParameter {
                parameter: "calibration.sigma_floor_degrees".to_string(),
                value: config.calibration.sigma_floor_degrees.to_string(),
                reason: "Sigma floor must be positive".to_string(),
            });
        }

        if config.max_observations == 0 {
            errors.push(ConfigError::InvalidParameter {
                parameter: "max_observations".to_string(),
                value: "0".to_string(),
                reason: "Sessions must hold at least one observation".to_string(),
            });
        } else if config.max_observations > 50 {
            warnings.push("Large observation capacity slows every triangulation".to_string());
        }

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}
