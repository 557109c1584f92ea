//! Bootstrap ensemble training.
//!
//! Each round draws an entity sample, materializes only the rows of the
//! sampled entities, fits one classifier, and drops the round's frame before
//! returning. Round seeds are derived from the master seed before any round
//! starts, so parallel and sequential training produce identical ensembles.

use crate::bagging::ensemble::Ensemble;
use crate::bagging::population::Population;
use crate::bagging::sampler::{BootstrapSample, EntitySampler};
use crate::boosting::gbdt::GradientBoostedClassifier;
use crate::config::{BaggingConfig, BoosterParams, PipelineConfig};
use crate::core::error::{PipelineError, Result};
use crate::core::random::RandomSource;
use crate::core::threading::build_pool;
use crate::core::traits::TabularSource;
use crate::dataset::frame::TrainingFrame;
use rayon::prelude::*;

/// Trains a fixed-size ensemble on entity-level bootstrap samples.
#[derive(Debug, Clone)]
pub struct BootstrapEnsembleTrainer {
    booster: BoosterParams,
    bagging: BaggingConfig,
    entity_column: String,
    features: Vec<String>,
    target: String,
    sampler: EntitySampler,
}

impl BootstrapEnsembleTrainer {
    /// Create a trainer from the pipeline configuration.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        if config.columns.features.is_empty() {
            return Err(PipelineError::config("No feature columns configured"));
        }

        Ok(BootstrapEnsembleTrainer {
            booster: config.booster.clone(),
            bagging: config.bagging.clone(),
            entity_column: config.columns.entity.clone(),
            features: config.columns.features.clone(),
            target: config.columns.target.clone(),
            sampler: EntitySampler,
        })
    }

    /// Train `ensemble_size` members over `population`.
    ///
    /// Either every round succeeds and a complete ensemble is returned, or
    /// the first failing round's error is returned and nothing is kept.
    pub fn train<S: TabularSource>(&self, source: &S, population: &Population) -> Result<Ensemble> {
        if population.is_empty() {
            return Err(PipelineError::EmptyPopulation);
        }

        let seeds = RandomSource::with_seed(self.bagging.seed).derive_seeds(self.bagging.ensemble_size);
        log::info!(
            "Training {} ensemble members on {:.2}% of {} entities (policy: {})",
            seeds.len(),
            self.bagging.sample_frac * 100.0,
            population.len(),
            self.bagging.degenerate_policy
        );

        let members = if self.bagging.parallel {
            let pool = build_pool(self.bagging.num_threads, "bootstrap")?;
            pool.install(|| {
                seeds
                    .par_iter()
                    .enumerate()
                    .map(|(round, &seed)| self.train_round(source, population, round, seed))
                    .collect::<Result<Vec<_>>>()
            })?
        } else {
            seeds
                .iter()
                .enumerate()
                .map(|(round, &seed)| self.train_round(source, population, round, seed))
                .collect::<Result<Vec<_>>>()?
        };

        Ensemble::new(members)
    }

    /// One sampling and fit round. The training frame never outlives this call.
    pub fn train_round<S: TabularSource>(
        &self,
        source: &S,
        population: &Population,
        round: usize,
        seed: u64,
    ) -> Result<GradientBoostedClassifier> {
        let mut rng = RandomSource::with_seed(seed);
        let max_attempts = self.bagging.degenerate_policy.max_attempts();
        let mut last_counts = (0, 0);

        for attempt in 1..=max_attempts {
            let (_, frame) = self.draw_frame(source, population, &mut rng)?;

            if frame.is_degenerate() {
                last_counts = (frame.positives(), frame.negatives());
                log::warn!(
                    "Round {} attempt {}/{}: sample has {} positives and {} negatives",
                    round,
                    attempt,
                    max_attempts,
                    last_counts.0,
                    last_counts.1
                );
                continue;
            }

            let model = GradientBoostedClassifier::fit(&frame, &self.booster, &mut rng)?;
            log::info!(
                "Round {} fitted on {} rows ({} positives)",
                round,
                frame.num_rows(),
                frame.positives()
            );
            return Ok(model);
        }

        Err(PipelineError::DegenerateSample {
            round,
            attempts: max_attempts,
            positives: last_counts.0,
            negatives: last_counts.1,
        })
    }

    /// Draw a sample and load the rows of its distinct entities.
    pub fn draw_frame<S: TabularSource>(
        &self,
        source: &S,
        population: &Population,
        rng: &mut RandomSource,
    ) -> Result<(BootstrapSample, TrainingFrame)> {
        let sample = self.sampler.sample(population, self.bagging.sample_frac, rng)?;
        let members = sample.distinct();
        log::debug!(
            "Sampled {} draws covering {} distinct entities",
            sample.len(),
            members.len()
        );

        let rows = source
            .filter_by_membership(&self.entity_column, &members)?
            .collect()?;
        let frame = TrainingFrame::from_frame(&rows, &self.features, &self.target)?;
        Ok((sample, frame))
    }

    pub fn booster(&self) -> &BoosterParams {
        &self.booster
    }

    pub fn bagging(&self) -> &BaggingConfig {
        &self.bagging
    }
}
