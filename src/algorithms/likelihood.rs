//! Per-observation angle residual likelihoods

use crate::core::constants::DEFAULT_ROBUST_DOF;

/// Gaussian likelihood for ordinary throws, Student-t for throws flagged robust
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualLikelihood {
    /// Degrees of freedom of the Student-t tail
    pub robust_dof: f64,
}

impl Default for ResidualLikelihood {
    fn default() -> Self {
        Self { robust_dof: DEFAULT_ROBUST_DOF }
    }
}

impl ResidualLikelihood {
    pub fn new(robust_dof: f64) -> Self {
        Self { robust_dof }
    }

    /// Log-likelihood of a residual expressed in units of sigma
    ///
    /// Constant terms are dropped; they do not depend on the candidate.
    pub fn log_likelihood(&self, standardized: f64, robust: bool) -> f64 {
        let sq = standardized * standardized;
        if robust {
            let dof = self.robust_dof;
            -0.5 * (dof + 1.0) * (sq / dof).ln_1p()
        } else {
            -0.5 * sq
        }
    }

    /// Effective information weight of an observation at the given residual
    ///
    /// Ordinary throws always carry full weight. Robust throws are down-weighted
    /// the further they sit from the estimate (the IRLS weight of a Student-t),
    /// capped at full weight.
    pub fn information_weight(&self, standardized: f64, robust: bool) -> f64 {
        if robust {
            let dof = self.robust_dof;
            ((dof + 1.0) / (dof + standardized * standardized)).min(1.0)
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_zero_residual_is_maximum() {
        let likelihood = ResidualLikelihood::default();
        assert_abs_diff_eq!(likelihood.log_likelihood(0.0, false), 0.0);
        assert_abs_diff_eq!(likelihood.log_likelihood(0.0, true), 0.0);
        assert!(likelihood.log_likelihood(1.0, false) < 0.0);
        assert!(likelihood.log_likelihood(-1.0, true) < 0.0);
    }

    #[test]
    fn test_robust_tail_is_heavier() {
        let likelihood = ResidualLikelihood::default();
        let gaussian = likelihood.log_likelihood(10.0, false);
        let robust = likelihood.log_likelihood(10.0, true);
        assert!(robust > gaussian);
        assert_abs_diff_eq!(gaussian, -50.0);
    }

    #[test]
    fn test_information_weight() {
        let likelihood = ResidualLikelihood::new(2.0);
        assert_abs_diff_eq!(likelihood.information_weight(5.0, false), 1.0);
        assert_abs_diff_eq!(likelihood.information_weight(0.0, true), 1.0);
        assert_abs_diff_eq!(likelihood.information_weight(2.0, true), 0.5);
        assert!(likelihood.information_weight(10.0, true) < 0.1);
    }

    #[test]
    fn test_robust_weight_never_exceeds_plain() {
        let likelihood = ResidualLikelihood::new(2.0);
        for step in 0..=40 {
            let z = step as f64 * 0.25;
            assert!(likelihood.information_weight(z, true) <= likelihood.information_weight(z, false));
        }
    }
}
