//! Bayesian point estimation of the target cell from angle observations

use log::{debug, warn};
use nalgebra::Matrix2;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::algorithms::likelihood::ResidualLikelihood;
use crate::algorithms::prior::GridPrior;
use crate::api::types::{CalculatorResult, RankedCandidate};
use crate::core::constants::SIGMA_FLOOR_DEGREES;
use crate::core::{bearing_degrees, bearing_gradient, normalize_angle, GridCandidate, NoiseModel, Observation};
use crate::utils::config::TriangulationConfig;

/// Scores every candidate against every observation and keeps the maximum posterior
///
/// The candidate set is finite, so the search is exhaustive and the output is
/// fully reproducible for a given prior and observation sequence.
#[derive(Debug, Clone)]
pub struct TriangulationEngine {
    likelihood: ResidualLikelihood,
    /// Number of ranked candidates reported alongside the best one
    top_candidates: usize,
    /// Spread of the positional prior used to regularize the uncertainty radius (blocks)
    prior_spread_blocks: f64,
}

impl Default for TriangulationEngine {
    fn default() -> Self {
        Self::new(&TriangulationConfig::default())
    }
}

impl TriangulationEngine {
    pub fn new(config: &TriangulationConfig) -> Self {
        Self {
            likelihood: ResidualLikelihood::new(config.robust_dof),
            top_candidates: config.top_candidates,
            prior_spread_blocks: config.prior_spread_blocks,
        }
    }

    pub fn triangulate(
        &self,
        observations: &[Observation],
        prior: &GridPrior,
        noise: &NoiseModel,
    ) -> CalculatorResult {
        if observations.is_empty() {
            debug!("Triangulation requested without observations");
            return CalculatorResult::failed();
        }

        let sigma = effective_sigma(noise);
        let candidates = prior.candidates();

        // Single pass: running evidence plus a bounded heap of the leaders
        let mut best: Option<Scored> = None;
        let mut leaders = BinaryHeap::with_capacity(self.top_candidates + 1);
        let mut evidence = LogSumExp::default();
        let mut scored_candidates = 0;

        for (index, candidate) in candidates.iter().enumerate() {
            let Some(score) = self.score_candidate(candidate, observations, sigma) else {
                continue;
            };
            let entry = Scored::new(index, candidate, score);
            scored_candidates += 1;
            evidence.add(score);
            if best.map_or(true, |current| entry > current) {
                best = Some(entry);
            }
            if self.top_candidates > 0 {
                leaders.push(Reverse(entry));
                if leaders.len() > self.top_candidates {
                    leaders.pop();
                }
            }
        }

        let Some(best) = best else {
            warn!(
                "No candidate out of {} could be scored against {} observations",
                candidates.len(),
                observations.len()
            );
            return CalculatorResult::failed();
        };
        let log_evidence = evidence.value();
        let best = candidates[best.index];

        let angle_residuals: Vec<f64> = observations
            .iter()
            .map(|obs| residual_to(obs, &best).unwrap_or(0.0))
            .collect();

        let uncertainty_radius = self.uncertainty_radius(&best, observations, &angle_residuals, sigma);
        let top_candidates = leaders
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(entry)| RankedCandidate {
                candidate: candidates[entry.index],
                probability: (entry.score - log_evidence).exp(),
            })
            .collect();

        debug!(
            "Triangulated {} observations over {} candidates: best ({}, {}) radius {:.1}",
            observations.len(),
            scored_candidates,
            best.x,
            best.z,
            uncertainty_radius
        );

        CalculatorResult {
            succeeded: true,
            best_candidate: Some(best),
            uncertainty_radius: Some(uncertainty_radius),
            angle_residuals,
            top_candidates,
            scored_candidates,
        }
    }

    /// Log posterior of one candidate, `None` when it cannot be scored
    fn score_candidate(&self, candidate: &GridCandidate, observations: &[Observation], sigma: f64) -> Option<f64> {
        let mut score = candidate.prior_weight.ln();
        if !score.is_finite() {
            return None;
        }

        for obs in observations {
            let residual = residual_to(obs, candidate)?;
            score += self
                .likelihood
                .log_likelihood(residual / sigma, obs.use_robust_weighting);
        }

        score.is_finite().then_some(score)
    }

    /// Laplace approximation of the posterior at the best candidate
    ///
    /// Every observation adds a positive semi-definite term to the information
    /// matrix, so the radius never grows when evidence is added at a fixed
    /// best candidate.
    fn uncertainty_radius(
        &self,
        best: &GridCandidate,
        observations: &[Observation],
        residuals: &[f64],
        sigma: f64,
    ) -> f64 {
        let sigma_rad = sigma.to_radians();
        let mut information = Matrix2::<f64>::identity() / (self.prior_spread_blocks * self.prior_spread_blocks);

        for (obs, residual) in observations.iter().zip(residuals) {
            let Some(gradient) = bearing_gradient(obs.origin_x, obs.origin_z, best.x as f64, best.z as f64) else {
                continue;
            };
            let weight = self
                .likelihood
                .information_weight(residual / sigma, obs.use_robust_weighting);
            information += gradient * gradient.transpose() * (weight / (sigma_rad * sigma_rad));
        }

        match information.try_inverse() {
            Some(covariance) => covariance.trace().max(0.0).sqrt(),
            None => self.prior_spread_blocks,
        }
    }
}

/// A scored candidate; higher score ranks first, equal scores prefer the lowest `(x, z)`
#[derive(Debug, Clone, Copy)]
struct Scored {
    index: usize,
    coords: (i32, i32),
    score: f64,
}

impl Scored {
    fn new(index: usize, candidate: &GridCandidate, score: f64) -> Self {
        Self {
            index,
            coords: candidate.coords(),
            score,
        }
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.coords.cmp(&self.coords))
    }
}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

/// Streaming `ln(sum(exp(x)))`, rescaled whenever a larger term arrives
#[derive(Debug, Default)]
struct LogSumExp {
    max: Option<f64>,
    sum: f64,
}

impl LogSumExp {
    fn add(&mut self, value: f64) {
        match self.max {
            Some(max) if value <= max => self.sum += (value - max).exp(),
            Some(max) => {
                self.sum = self.sum * (max - value).exp() + 1.0;
                self.max = Some(value);
            }
            None => {
                self.max = Some(value);
                self.sum = 1.0;
            }
        }
    }

    fn value(&self) -> f64 {
        self.max.map_or(f64::NEG_INFINITY, |max| max + self.sum.ln())
    }
}

fn residual_to(obs: &Observation, candidate: &GridCandidate) -> Option<f64> {
    let bearing = bearing_degrees(obs.origin_x, obs.origin_z, candidate.x as f64, candidate.z as f64)?;
    Some(normalize_angle(obs.corrected_angle - bearing))
}

fn effective_sigma(noise: &NoiseModel) -> f64 {
    if noise.sigma_degrees.is_finite() && noise.sigma_degrees > 0.0 {
        noise.sigma_degrees
    } else {
        warn!("Unusable noise sigma {}, falling back to {}", noise.sigma_degrees, SIGMA_FLOOR_DEGREES);
        SIGMA_FLOOR_DEGREES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn lattice(min: i32, max: i32, step: usize) -> GridPrior {
        let axis: Vec<i32> = (min..=max).step_by(step).collect();
        GridPrior::uniform(axis.iter().flat_map(|&x| axis.iter().map(move |&z| (x, z))))
    }

    fn aimed(origin_x: f64, origin_z: f64, target_x: f64, target_z: f64) -> Observation {
        Observation::new(
            origin_x,
            origin_z,
            bearing_degrees(origin_x, origin_z, target_x, target_z).unwrap(),
        )
    }

    fn best_of(result: &CalculatorResult) -> (i32, i32) {
        let best = result.best_candidate.expect("best candidate");
        (best.x, best.z)
    }

    #[test]
    fn test_two_throws_meet_at_candidate() {
        let engine = TriangulationEngine::default();
        let prior = lattice(-100, 200, 10);
        let observations = vec![aimed(0.0, 0.0, 50.0, 50.0), aimed(100.0, 0.0, 50.0, 50.0)];

        let result = engine.triangulate(&observations, &prior, &NoiseModel::default());

        assert!(result.succeeded);
        assert_eq!(best_of(&result), (50, 50));
        assert_eq!(result.angle_residuals.len(), 2);
        for residual in &result.angle_residuals {
            assert_abs_diff_eq!(*residual, 0.0, epsilon = 1e-9);
        }
        // Both origins sit on a candidate, which leaves those two unscored
        assert_eq!(result.scored_candidates, prior.len() - 2);
    }

    #[test]
    fn test_single_throw_picks_candidate_on_its_line() {
        let engine = TriangulationEngine::default();
        let prior = lattice(0, 100, 50);
        let observations = vec![aimed(-1000.0, -1000.0, 100.0, 0.0)];

        let result = engine.triangulate(&observations, &prior, &NoiseModel::default());

        assert!(result.succeeded);
        assert_eq!(best_of(&result), (100, 0));
        assert_abs_diff_eq!(result.angle_residuals[0], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_residuals_follow_input_order() {
        let engine = TriangulationEngine::default();
        let prior = lattice(-200, 200, 20);
        let observations = vec![
            aimed(-900.0, 40.0, 20.0, 60.0).with_angle_nudged(0.05),
            aimed(300.0, -800.0, 20.0, 60.0),
            aimed(700.0, 650.0, 20.0, 60.0).with_angle_nudged(-0.08),
        ];

        let result = engine.triangulate(&observations, &prior, &NoiseModel::new(0.1));
        let best = result.best_candidate.unwrap();

        assert_eq!(result.angle_residuals.len(), observations.len());
        for (obs, residual) in observations.iter().zip(&result.angle_residuals) {
            let expected = normalize_angle(
                obs.corrected_angle
                    - bearing_degrees(obs.origin_x, obs.origin_z, best.x as f64, best.z as f64).unwrap(),
            );
            assert_abs_diff_eq!(*residual, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_consistent_throw_never_widens_radius() {
        let engine = TriangulationEngine::default();
        let prior = lattice(-300, 300, 10);
        let noise = NoiseModel::new(0.5);

        let one = vec![aimed(-1000.0, 0.0, 0.0, 0.0)];
        let two = vec![one[0], aimed(0.0, -1000.0, 0.0, 0.0)];
        let radius_one = engine.triangulate(&one, &prior, &noise).uncertainty_radius.unwrap();
        let result_two = engine.triangulate(&two, &prior, &noise);
        let radius_two = result_two.uncertainty_radius.unwrap();
        assert_eq!(best_of(&result_two), (0, 0));

        let three = vec![two[0], two[1], aimed(700.0, 700.0, 0.0, 0.0)];
        let result_three = engine.triangulate(&three, &prior, &noise);
        let radius_three = result_three.uncertainty_radius.unwrap();

        assert_eq!(best_of(&result_three), (0, 0));
        assert!(radius_two < radius_one);
        assert!(radius_three <= radius_two);
    }

    #[test]
    fn test_robust_flag_does_not_tighten_radius() {
        let engine = TriangulationEngine::default();
        let prior = lattice(-300, 300, 10);
        let noise = NoiseModel::new(0.5);
        let plain = vec![aimed(-1000.0, 0.0, 0.0, 0.0), aimed(0.0, -1000.0, 0.0, 0.0)];
        let robust = vec![plain[0], plain[1].with_robust_toggled()];

        let plain_result = engine.triangulate(&plain, &prior, &noise);
        let robust_result = engine.triangulate(&robust, &prior, &noise);

        assert_eq!(best_of(&plain_result), (0, 0));
        assert_eq!(best_of(&robust_result), (0, 0));
        assert!(robust_result.uncertainty_radius.unwrap() >= plain_result.uncertainty_radius.unwrap());
    }

    #[test]
    fn test_radius_shrinks_with_sigma() {
        let engine = TriangulationEngine::default();
        let prior = lattice(-300, 300, 10);
        let observations = vec![aimed(-1000.0, 0.0, 0.0, 0.0), aimed(0.0, -1000.0, 0.0, 0.0)];

        let wide = engine.triangulate(&observations, &prior, &NoiseModel::new(1.0));
        let narrow = engine.triangulate(&observations, &prior, &NoiseModel::new(0.5));

        assert_eq!(best_of(&wide), best_of(&narrow));
        assert!(narrow.uncertainty_radius.unwrap() < wide.uncertainty_radius.unwrap());
    }

    #[test]
    fn test_robust_weighting_limits_outlier_pull() {
        let engine = TriangulationEngine::default();
        let prior = lattice(-300, 300, 10);
        let noise = NoiseModel::new(1.0);
        let pair = vec![aimed(-1000.0, 0.0, 0.0, 0.0), aimed(0.0, -1000.0, 0.0, 0.0)];
        let outlier = aimed(1000.0, 0.0, 0.0, 200.0);

        let baseline = engine.triangulate(&pair, &prior, &noise);
        assert_eq!(best_of(&baseline), (0, 0));

        let distance_from_baseline = |observations: &[Observation]| {
            engine
                .triangulate(observations, &prior, &noise)
                .best_candidate
                .unwrap()
                .distance_to(0.0, 0.0)
        };

        let plain_pull = distance_from_baseline(&[pair[0], pair[1], outlier]);
        let robust_pull = distance_from_baseline(&[pair[0], pair[1], outlier.robust()]);

        assert!(plain_pull > 50.0);
        assert!(robust_pull <= 20.0);
        assert!(robust_pull < plain_pull);
    }

    #[test]
    fn test_empty_observations_fail() {
        let engine = TriangulationEngine::default();
        let result = engine.triangulate(&[], &lattice(0, 10, 10), &NoiseModel::default());
        assert_eq!(result, CalculatorResult::failed());
    }

    #[test]
    fn test_all_candidates_degenerate_fails() {
        let engine = TriangulationEngine::default();
        let prior = GridPrior::uniform([(40, -8)]);
        let observations = vec![Observation::new(40.0, -8.0, 12.0)];

        let result = engine.triangulate(&observations, &prior, &NoiseModel::default());

        assert!(!result.succeeded);
        assert!(result.best_candidate.is_none());
        assert!(result.uncertainty_radius.is_none());
        assert!(result.angle_residuals.is_empty());
    }

    #[test]
    fn test_top_candidates_ranked() {
        let engine = TriangulationEngine::default();
        let prior = lattice(-100, 100, 10);
        let observations = vec![aimed(-1500.0, 300.0, 30.0, -20.0), aimed(200.0, -1400.0, 30.0, -20.0)];

        let result = engine.triangulate(&observations, &prior, &NoiseModel::new(0.2));

        assert_eq!(result.top_candidates.len(), 5);
        assert_eq!(result.top_candidates[0].candidate, result.best_candidate.unwrap());
        let mut total = 0.0;
        for pair in result.top_candidates.windows(2) {
            assert!(pair[0].probability >= pair[1].probability);
        }
        for ranked in &result.top_candidates {
            total += ranked.probability;
        }
        assert!(total <= 1.0 + 1e-9);
        assert!(result.best_probability().unwrap() > 0.0);
    }

    #[test]
    fn test_equal_scores_rank_lowest_coordinates_first() {
        let config = TriangulationConfig {
            top_candidates: 2,
            ..TriangulationConfig::default()
        };
        let engine = TriangulationEngine::new(&config);
        let prior = GridPrior::uniform([(10, 0), (0, 500), (-10, 0)]);
        let observations = vec![Observation::new(0.0, -1000.0, 0.0)];

        let result = engine.triangulate(&observations, &prior, &NoiseModel::default());

        assert_eq!(best_of(&result), (0, 500));
        let ranked: Vec<(i32, i32)> = result
            .top_candidates
            .iter()
            .map(|ranked| (ranked.candidate.x, ranked.candidate.z))
            .collect();
        assert_eq!(ranked, vec![(0, 500), (-10, 0)]);
        assert_eq!(result.scored_candidates, 3);
    }

    #[test]
    fn test_streaming_evidence_matches_direct_sum() {
        let scores = [-3.5, -0.25, -12.0, -0.25, -700.0, 1.5];
        let mut evidence = LogSumExp::default();
        for score in scores {
            evidence.add(score);
        }
        let direct = scores.iter().map(|score| score.exp()).sum::<f64>().ln();
        assert_abs_diff_eq!(evidence.value(), direct, epsilon = 1e-12);
        assert_eq!(LogSumExp::default().value(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_zero_prior_candidates_are_skipped() {
        let engine = TriangulationEngine::default();
        let prior = GridPrior::from_candidates(vec![
            GridCandidate::new(0, 100, 0.0),
            GridCandidate::new(0, 200, 1.0),
        ]);
        let observations = vec![aimed(0.0, 0.0, 0.0, 100.0)];

        let result = engine.triangulate(&observations, &prior, &NoiseModel::default());

        assert_eq!(result.scored_candidates, 1);
        assert_eq!(best_of(&result), (0, 200));
    }

    #[test]
    fn test_triangulation_is_reproducible() {
        let engine = TriangulationEngine::default();
        let prior = lattice(-150, 150, 10);
        let observations = vec![aimed(-800.0, 90.0, 10.0, 10.0), aimed(500.0, 700.0, 10.0, 10.0).robust()];

        let first = engine.triangulate(&observations, &prior, &NoiseModel::new(0.3));
        let second = engine.triangulate(&observations, &prior, &NoiseModel::new(0.3));

        assert_eq!(first, second);
    }
}
