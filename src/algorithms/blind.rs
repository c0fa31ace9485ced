//! Coarse estimate from a bare position with no bearing

use log::warn;

use crate::algorithms::prior::GridPrior;
use crate::api::types::BlindResult;
use crate::core::RawPosition;

/// Nearest-candidate search over the prior
#[derive(Debug, Clone, Copy, Default)]
pub struct BlindEstimator;

impl BlindEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Closest candidate to `position`
    ///
    /// Equal distances prefer the heavier prior weight, then the lowest `(x, z)`.
    pub fn estimate_blind(&self, position: RawPosition, prior: &GridPrior) -> BlindResult {
        if !(position.x.is_finite() && position.z.is_finite()) {
            warn!("Blind estimate requested for non-finite position {:?}", position);
            return BlindResult::failed();
        }

        let nearest = prior
            .iter()
            .map(|candidate| (candidate, candidate.distance_to(position.x, position.z)))
            .min_by(|(a, dist_a), (b, dist_b)| {
                dist_a
                    .total_cmp(dist_b)
                    .then_with(|| b.prior_weight.total_cmp(&a.prior_weight))
                    .then_with(|| a.coords().cmp(&b.coords()))
            });

        match nearest {
            Some((candidate, distance)) => BlindResult {
                succeeded: true,
                nearest_candidate: Some(*candidate),
                distance: Some(distance),
            },
            None => {
                warn!("Blind estimate requested against an empty prior");
                BlindResult::failed()
            }
        }
    }
}
