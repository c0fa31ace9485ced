//! Facade tying the prior, engines and shared noise model together

use log::info;
use std::path::Path;
use std::sync::Arc;

use crate::algorithms::blind::BlindEstimator;
use crate::algorithms::prior::GridPrior;
use crate::algorithms::triangulation::TriangulationEngine;
use crate::api::types::{BlindResult, CalculatorResult};
use crate::core::{NoiseModel, Observation, RawPosition};
use crate::processing::calibration::{CalibrationEngine, SharedNoiseModel};
use crate::processing::session::ThrowSession;
use crate::utils::config::{ConfigError, ConfigurationManager, LocatorConfig};

/// Synchronous entry point for callers
///
/// The prior is built once and shared; every triangulation reads a snapshot of
/// the noise model that the calibration engine publishes.
pub struct StrongholdLocator {
    config: LocatorConfig,
    prior: Arc<GridPrior>,
    engine: TriangulationEngine,
    blind: BlindEstimator,
    noise: SharedNoiseModel,
    calibration: CalibrationEngine,
}

impl StrongholdLocator {
    /// Validate the config and build the prior from its grid geometry
    pub fn new(config: LocatorConfig) -> Result<Self, ConfigError> {
        Self::check(&config)?;
        let prior = Arc::new(GridPrior::from_geometry(&config.grid));
        Ok(Self::assemble(config, prior))
    }

    /// Use an already built prior, e.g. one shared with another locator
    pub fn with_prior(config: LocatorConfig, prior: Arc<GridPrior>) -> Result<Self, ConfigError> {
        Self::check(&config)?;
        Ok(Self::assemble(config, prior))
    }

    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let manager = ConfigurationManager::from_file(path)?;
        Self::new(manager.config().clone())
    }

    pub fn triangulate(&self, observations: &[Observation]) -> CalculatorResult {
        let noise = self.noise.get();
        self.engine.triangulate(observations, &self.prior, &noise)
    }

    pub fn estimate_blind(&self, position: RawPosition) -> BlindResult {
        self.blind.estimate_blind(position, &self.prior)
    }

    /// Handle on the calibration engine writing this locator's noise model
    pub fn calibration(&self) -> CalibrationEngine {
        self.calibration.clone()
    }

    pub fn noise_model(&self) -> NoiseModel {
        self.noise.get()
    }

    /// Restore a noise model persisted by the caller
    pub fn set_noise_model(&self, model: NoiseModel) -> NoiseModel {
        self.noise.replace(model)
    }

    pub fn new_session(&self) -> ThrowSession {
        ThrowSession::new(self.config.max_observations)
    }

    pub fn prior(&self) -> &Arc<GridPrior> {
        &self.prior
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    fn check(config: &LocatorConfig) -> Result<(), ConfigError> {
        match ConfigurationManager::validate_config(config).errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn assemble(config: LocatorConfig, prior: Arc<GridPrior>) -> Self {
        let noise = SharedNoiseModel::new(config.noise.initial_model());
        let calibration = CalibrationEngine::new(config.calibration.clone(), noise.clone());
        info!(
            "Locator ready with {} candidates, sigma {} deg",
            prior.len(),
            config.noise.default_sigma_degrees
        );

        Self {
            engine: TriangulationEngine::new(&config.triangulation),
            blind: BlindEstimator::new(),
            prior,
            noise,
            calibration,
            config,
        }
    }
}
