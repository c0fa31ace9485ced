//! Discrete prior over the cells a stronghold may occupy

use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::core::constants::{
    CELL_SIZE_BLOCKS, CELL_TARGET_OFFSET, RING_HALF_WIDTH_CELLS, RING_SPACING_CELLS,
    RING_STRONGHOLD_COUNTS,
};
use crate::core::GridCandidate;

/// One ring of targets around the world origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingSpec {
    /// Number of targets placed in this ring
    pub strongholds: u32,
    /// Inner radius (cells)
    pub inner_radius: f64,
    /// Outer radius (cells)
    pub outer_radius: f64,
}

impl RingSpec {
    pub fn new(strongholds: u32, inner_radius: f64, outer_radius: f64) -> Self {
        Self { strongholds, inner_radius, outer_radius }
    }

    pub fn contains(&self, radius: f64) -> bool {
        radius >= self.inner_radius && radius <= self.outer_radius
    }

    /// Prior mass of one cell at `radius`
    ///
    /// Targets in a ring are evenly spaced in angle behind a uniformly random
    /// phase and uniformly distributed in distance, so the marginal density
    /// only depends on the radius and falls off as `1/r`.
    fn cell_density(&self, radius: f64) -> f64 {
        let width = self.outer_radius - self.inner_radius;
        if radius <= 0.0 || width <= 0.0 {
            return 0.0;
        }
        self.strongholds as f64 / (2.0 * PI * radius * width)
    }
}

/// Fixed world geometry the candidate set is generated from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Cell side length (blocks)
    pub cell_size: i32,
    /// Target offset inside a cell (blocks)
    pub cell_offset: i32,
    pub rings: Vec<RingSpec>,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self::stronghold_rings()
    }
}

impl GridGeometry {
    /// The eight stronghold rings
    pub fn stronghold_rings() -> Self {
        let rings = RING_STRONGHOLD_COUNTS
            .iter()
            .enumerate()
            .map(|(ring, &count)| {
                let centre = RING_SPACING_CELLS * (4.0 + 6.0 * ring as f64);
                RingSpec::new(count, centre - RING_HALF_WIDTH_CELLS, centre + RING_HALF_WIDTH_CELLS)
            })
            .collect();

        Self {
            cell_size: CELL_SIZE_BLOCKS,
            cell_offset: CELL_TARGET_OFFSET,
            rings,
        }
    }

    /// Only the innermost `count` rings
    pub fn first_rings(count: usize) -> Self {
        let mut geometry = Self::stronghold_rings();
        geometry.rings.truncate(count);
        geometry
    }

    /// Largest outer radius over all rings (cells)
    pub fn outer_radius(&self) -> f64 {
        self.rings.iter().map(|ring| ring.outer_radius).fold(0.0, f64::max)
    }

    fn cell_weight(&self, radius: f64) -> f64 {
        self.rings
            .iter()
            .filter(|ring| ring.contains(radius))
            .map(|ring| ring.cell_density(radius))
            .sum()
    }
}

/// Immutable candidate set with normalized prior weights
///
/// Built once and shared by reference (`Arc<GridPrior>`) between callers.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPrior {
    candidates: Vec<GridCandidate>,
}

impl GridPrior {
    /// Enumerate every cell inside a ring, `x` major then `z`
    pub fn from_geometry(geometry: &GridGeometry) -> Self {
        let reach = geometry.outer_radius().ceil() as i32;
        let mut candidates = Vec::new();

        for cell_x in -reach..=reach {
            for cell_z in -reach..=reach {
                let radius = (cell_x as f64).hypot(cell_z as f64);
                let weight = geometry.cell_weight(radius);
                if weight > 0.0 {
                    candidates.push(GridCandidate::new(
                        cell_x * geometry.cell_size + geometry.cell_offset,
                        cell_z * geometry.cell_size + geometry.cell_offset,
                        weight,
                    ));
                }
            }
        }

        debug!(
            "Built grid prior with {} candidates over {} rings",
            candidates.len(),
            geometry.rings.len()
        );
        Self::from_candidates(candidates)
    }

    /// Wrap explicit candidates, normalizing their weights to sum to one
    ///
    /// Non-finite or negative weights are treated as zero mass.
    pub fn from_candidates(mut candidates: Vec<GridCandidate>) -> Self {
        for candidate in candidates.iter_mut() {
            if !(candidate.prior_weight.is_finite() && candidate.prior_weight > 0.0) {
                candidate.prior_weight = 0.0;
            }
        }

        let total: f64 = candidates.iter().map(|c| c.prior_weight).sum();
        if total > 0.0 {
            for candidate in candidates.iter_mut() {
                candidate.prior_weight /= total;
            }
        }

        Self { candidates }
    }

    /// Equal prior mass on every listed position
    pub fn uniform<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        Self::from_candidates(
            points
                .into_iter()
                .map(|(x, z)| GridCandidate::new(x, z, 1.0))
                .collect(),
        )
    }

    pub fn candidates(&self) -> &[GridCandidate] {
        &self.candidates
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GridCandidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
