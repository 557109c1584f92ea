//! Entity-level bootstrap sampling.

use crate::bagging::population::Population;
use crate::core::error::{PipelineError, Result};
use crate::core::random::RandomSource;
use crate::core::types::EntityId;
use std::collections::BTreeSet;

/// A with-replacement draw of entity identifiers.
///
/// An entity may appear any number of times in [`draws`](Self::draws);
/// row selection only uses the distinct members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSample {
    draws: Vec<EntityId>,
}

impl BootstrapSample {
    /// Every draw, in draw order, duplicates included.
    pub fn draws(&self) -> &[EntityId] {
        &self.draws
    }

    /// Number of draws.
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// The distinct sampled entities used for the membership filter.
    pub fn distinct(&self) -> BTreeSet<EntityId> {
        self.draws.iter().cloned().collect()
    }
}

/// Draws bootstrap samples of entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntitySampler;

impl EntitySampler {
    /// `round(frac * population_size)`.
    pub fn sample_size(population_size: usize, frac: f64) -> usize {
        (frac * population_size as f64).round() as usize
    }

    /// Draw `round(frac * |population|)` entities uniformly with replacement.
    pub fn sample(
        &self,
        population: &Population,
        frac: f64,
        rng: &mut RandomSource,
    ) -> Result<BootstrapSample> {
        if !(frac > 0.0 && frac <= 1.0) {
            return Err(PipelineError::invalid_parameter(
                "sample_frac",
                frac.to_string(),
                "must be in range (0.0, 1.0]",
            ));
        }
        if population.is_empty() {
            return Err(PipelineError::EmptyPopulation);
        }

        let size = Self::sample_size(population.len(), frac);
        let draws = (0..size)
            .filter_map(|_| population.get(rng.next_index(population.len())).cloned())
            .collect();

        Ok(BootstrapSample { draws })
    }
}
