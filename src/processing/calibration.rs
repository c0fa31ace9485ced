//! Learning the angle noise sigma from throws at a known target
//!
//! A run moves through `Idle -> Collecting -> Computing -> Idle`. Samples can
//! be submitted without blocking, or added with [`CalibrationEngine::add_sample`],
//! which parks the calling thread until the run completes or is cancelled.
//! The published [`NoiseModel`] is replaced as a whole, so readers on the
//! triangulation side always see either the old or the new record.

use log::{debug, info, warn};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};

use crate::core::constants::MIN_CALIBRATION_SAMPLES;
use crate::core::{bearing_degrees, normalize_angle, NoiseModel, Observation, RawPosition};
use crate::utils::config::CalibrationConfig;
use crate::validation::error::CalibrationError;

/// Noise model shared between the calibration writer and triangulation readers
#[derive(Debug, Clone)]
pub struct SharedNoiseModel {
    inner: Arc<RwLock<NoiseModel>>,
}

impl SharedNoiseModel {
    pub fn new(model: NoiseModel) -> Self {
        Self {
            inner: Arc::new(RwLock::new(model)),
        }
    }

    /// Snapshot of the current model
    pub fn get(&self) -> NoiseModel {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the whole model, returning the previous one
    pub fn replace(&self, model: NoiseModel) -> NoiseModel {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, model)
    }
}

impl Default for SharedNoiseModel {
    fn default() -> Self {
        Self::new(NoiseModel::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Idle,
    Collecting,
    Computing,
}

/// Result of a completed calibration run
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationOutcome {
    /// False when fewer than two usable samples were collected
    pub succeeded: bool,
    /// Model in effect after the run (unchanged when the run failed)
    pub noise_model: NoiseModel,
    /// Residual of every usable sample against the true bearing (degrees)
    pub residuals: Vec<f64>,
    /// Systematic bias of the samples (degrees)
    pub mean_residual: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationProgress {
    Collecting { collected: usize, target: usize },
    Completed(CalibrationOutcome),
}

struct RunState {
    state: CalibrationState,
    target: Option<RawPosition>,
    samples: Vec<Observation>,
    run_id: u64,
    finished: Option<(u64, Result<CalibrationOutcome, CalibrationError>)>,
}

struct Shared {
    run: Mutex<RunState>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Abort the collecting run; the noise model is never touched here
    fn cancel(&self) -> bool {
        let mut run = self.lock();
        if run.state != CalibrationState::Collecting {
            return false;
        }
        Self::abort(&mut run);
        self.changed.notify_all();
        true
    }

    fn abort(run: &mut RunState) {
        warn!(
            "Calibration run {} cancelled with {} samples discarded",
            run.run_id,
            run.samples.len()
        );
        run.samples.clear();
        run.target = None;
        run.state = CalibrationState::Idle;
        run.finished = Some((run.run_id, Err(CalibrationError::Cancelled)));
    }
}

/// Cloneable handle that cancels the current run from any thread
#[derive(Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    /// Returns whether a collecting run was cancelled
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }
}

/// Collects calibration samples and publishes the learned noise model
///
/// Clones share the same run, so producers on several threads can feed one run.
#[derive(Clone)]
pub struct CalibrationEngine {
    config: CalibrationConfig,
    noise: SharedNoiseModel,
    shared: Arc<Shared>,
}

impl CalibrationEngine {
    pub fn new(config: CalibrationConfig, noise: SharedNoiseModel) -> Self {
        Self {
            config,
            noise,
            shared: Arc::new(Shared {
                run: Mutex::new(RunState {
                    state: CalibrationState::Idle,
                    target: None,
                    samples: Vec::new(),
                    run_id: 0,
                    finished: None,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    /// Start collecting throws aimed at `target`
    ///
    /// A run that is still collecting is cancelled and replaced. A run that is
    /// computing is allowed to publish its estimate first.
    pub fn begin_calibration(&self, target: RawPosition) {
        let mut run = self.shared.lock();
        while run.state == CalibrationState::Computing {
            run = self
                .shared
                .changed
                .wait(run)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if run.state == CalibrationState::Collecting {
            Shared::abort(&mut run);
            self.shared.changed.notify_all();
        }

        run.run_id += 1;
        run.samples.clear();
        run.target = Some(target);
        run.state = CalibrationState::Collecting;
        info!(
            "Calibration run {} started towards ({:.1}, {:.1}), {} samples required",
            run.run_id, target.x, target.z, self.config.target_samples
        );
    }

    /// Append a sample without waiting for the run to complete
    pub fn submit_sample(&self, observation: Observation) -> Result<CalibrationProgress, CalibrationError> {
        let mut run = self.shared.lock();
        self.push_sample(&mut run, observation)?;

        if run.samples.len() >= self.config.target_samples {
            return Ok(CalibrationProgress::Completed(self.complete(run)));
        }

        Ok(CalibrationProgress::Collecting {
            collected: run.samples.len(),
            target: self.config.target_samples,
        })
    }

    /// Append a sample and wait until the run completes or is cancelled
    ///
    /// The call that brings the run to its target performs the estimate and
    /// wakes every other waiting producer with the same outcome.
    pub fn add_sample(&self, observation: Observation) -> Result<CalibrationOutcome, CalibrationError> {
        let mut run = self.shared.lock();
        self.push_sample(&mut run, observation)?;
        let run_id = run.run_id;

        if run.samples.len() >= self.config.target_samples {
            return Ok(self.complete(run));
        }

        while run.run_id == run_id && run.state != CalibrationState::Idle {
            run = self
                .shared
                .changed
                .wait(run)
                .unwrap_or_else(PoisonError::into_inner);
        }

        match &run.finished {
            Some((finished_id, result)) if *finished_id == run_id => result.clone(),
            _ => {
                debug!("Calibration run {} was superseded while waiting", run_id);
                Err(CalibrationError::Cancelled)
            }
        }
    }

    /// Compute the estimate from the samples collected so far
    pub fn finish(&self) -> Result<CalibrationOutcome, CalibrationError> {
        let mut run = self.shared.lock();
        if run.state != CalibrationState::Collecting {
            return Err(CalibrationError::NotCollecting);
        }
        Ok(self.complete(run))
    }

    /// Nudge the corrected angle of the most recent sample
    pub fn change_last_angle(&self, delta: f64) -> Result<Observation, CalibrationError> {
        let mut run = self.shared.lock();
        if run.state != CalibrationState::Collecting {
            return Err(CalibrationError::NotCollecting);
        }
        let last = run.samples.last_mut().ok_or(CalibrationError::NoSamples)?;
        *last = last.with_angle_nudged(delta);
        Ok(*last)
    }

    /// Returns whether a collecting run was cancelled
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.shared.lock().state
    }

    pub fn is_calibrating(&self) -> bool {
        self.state() != CalibrationState::Idle
    }

    pub fn sample_count(&self) -> usize {
        self.shared.lock().samples.len()
    }

    pub fn noise_model(&self) -> NoiseModel {
        self.noise.get()
    }

    pub fn noise_handle(&self) -> SharedNoiseModel {
        self.noise.clone()
    }

    fn push_sample(&self, run: &mut RunState, observation: Observation) -> Result<(), CalibrationError> {
        if run.state != CalibrationState::Collecting {
            return Err(CalibrationError::NotCollecting);
        }
        run.samples.push(observation);
        debug!(
            "Calibration run {}: sample {}/{}",
            run.run_id,
            run.samples.len(),
            self.config.target_samples
        );
        Ok(())
    }

    /// Run the estimate outside the run lock, then publish it
    ///
    /// While the run is `Computing` no samples are accepted, cancel is a no-op
    /// and a new run waits for this one to publish.
    fn complete(&self, mut run: MutexGuard<'_, RunState>) -> CalibrationOutcome {
        run.state = CalibrationState::Computing;
        let run_id = run.run_id;
        let target = run.target.take();
        let samples = std::mem::take(&mut run.samples);
        drop(run);

        let outcome = match target {
            Some(target) => self.estimate(&samples, target),
            None => self.failed_outcome(Vec::new()),
        };

        if outcome.succeeded {
            self.noise.replace(outcome.noise_model);
            info!(
                "Calibration run {} finished: sigma {:.4} deg from {} samples (bias {:.4})",
                run_id,
                outcome.noise_model.sigma_degrees,
                outcome.noise_model.sample_count,
                outcome.mean_residual.unwrap_or(0.0)
            );
        } else {
            warn!(
                "Calibration run {} finished with {} usable samples, {} required; noise model kept",
                run_id,
                outcome.residuals.len(),
                MIN_CALIBRATION_SAMPLES
            );
        }

        let mut run = self.shared.lock();
        run.state = CalibrationState::Idle;
        run.finished = Some((run_id, Ok(outcome.clone())));
        self.shared.changed.notify_all();
        outcome
    }

    /// Sample standard deviation of the residuals against the true bearing
    fn estimate(&self, samples: &[Observation], target: RawPosition) -> CalibrationOutcome {
        let residuals: Vec<f64> = samples
            .iter()
            .filter_map(|sample| {
                bearing_degrees(sample.origin_x, sample.origin_z, target.x, target.z)
                    .map(|bearing| normalize_angle(sample.corrected_angle - bearing))
            })
            .collect();

        if residuals.len() < MIN_CALIBRATION_SAMPLES {
            return self.failed_outcome(residuals);
        }

        let count = residuals.len() as f64;
        let mean = residuals.iter().sum::<f64>() / count;
        let variance = residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (count - 1.0);
        let sigma_degrees = variance.sqrt().max(self.config.sigma_floor_degrees);

        CalibrationOutcome {
            succeeded: true,
            noise_model: NoiseModel {
                sigma_degrees,
                sample_count: residuals.len(),
            },
            residuals,
            mean_residual: Some(mean),
        }
    }

    fn failed_outcome(&self, residuals: Vec<f64>) -> CalibrationOutcome {
        CalibrationOutcome {
            succeeded: false,
            noise_model: self.noise.get(),
            residuals,
            mean_residual: None,
        }
    }
}
