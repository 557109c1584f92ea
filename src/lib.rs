//! # Delinquency Ensemble
//!
//! Entity-level bootstrap ensembles of gradient-boosted tree classifiers,
//! with memory-bounded, chunked scoring into an embedded table store.
//!
//! ## Features
//!
//! - **Entity-level bagging**: each ensemble member is trained on the rows of
//!   a with-replacement sample of entities (loans), so every observation of
//!   a sampled loan travels together.
//! - **Pure Rust boosting**: histogram-based regression trees with a binary
//!   log-loss objective, row subsampling and per-tree column sampling.
//! - **Lazy sources**: training filters and scoring slices are built on
//!   Polars lazy frames and only materialized one round or one chunk at a
//!   time.
//! - **Chunked scoring**: disjoint row ranges are scored on a rayon pool and
//!   appended transactionally to a SQLite table, with a per-chunk audit
//!   report and targeted re-runs of failed ranges.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use delinquency_ensemble::{
//!     BootstrapEnsembleTrainer, ConfigBuilder, PipelineDriver, PolarsSource, Population,
//!     SqliteSinkFactory,
//! };
//!
//! # fn main() -> delinquency_ensemble::Result<()> {
//! delinquency_ensemble::init_logging();
//!
//! let config = ConfigBuilder::new()
//!     .features(["CURRENT_INTEREST_RATE", "LOAN_AGE", "ESTIMATED_LOAN_TO_VALUE"])
//!     .ensemble_size(10)
//!     .sample_frac(0.01)
//!     .chunk_size(1_000_000)
//!     .build()?;
//!
//! let train = PolarsSource::scan_parquet("train.parquet")?;
//! let population = Population::from_source(&train, &config.columns.entity)?;
//! let ensemble = BootstrapEnsembleTrainer::new(&config)?.train(&train, &population)?;
//!
//! let holdout = PolarsSource::scan_parquet("holdout.parquet")?;
//! let report = PipelineDriver::new(&config)?.run(
//!     &holdout,
//!     &ensemble,
//!     &SqliteSinkFactory::new("scores.db"),
//! )?;
//! report.audit()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: error taxonomy, types, constants, random source, and the
//!   source/sink/classifier traits
//! - [`config`]: layered pipeline configuration
//! - [`dataset`]: lazy sources, training frames, binning, and record loading
//! - [`tree`]: histogram tree construction
//! - [`boosting`]: the boosted binary classifier
//! - [`bagging`]: population, entity sampler, ensemble trainer, and ensemble
//! - [`scoring`]: chunk planning and ensemble averaging
//! - [`sink`]: the SQLite table store
//! - [`pipeline`]: ingestion, the scoring driver, and run reports

#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    non_snake_case,
    non_upper_case_globals
)]

pub mod core;

pub mod config;

pub mod dataset;

pub mod tree;

pub mod boosting;

pub mod bagging;

pub mod scoring;

pub mod sink;

pub mod pipeline;

// Re-export core functionality for convenience
pub use crate::core::{
    constants::*,
    error::{PipelineError, Result},
    init_logging,
    random::RandomSource,
    traits::*,
    types::*,
};

pub use crate::config::{
    BaggingConfig, BoosterParams, ColumnConfig, ConfigBuilder, PipelineConfig, ScoringConfig,
};

pub use crate::dataset::{
    LoadedPeriod, PolarsSource, RecordLayout, RecordLoader, RecordSchema, SemanticType,
    TrainingFrame,
};

pub use crate::boosting::GradientBoostedClassifier;

pub use crate::bagging::{
    BootstrapEnsembleTrainer, BootstrapSample, Ensemble, EntitySampler, Population,
};

pub use crate::scoring::{ChunkPlan, ChunkRange, EnsembleScorer};

pub use crate::sink::{SqliteSink, SqliteSinkFactory};

pub use crate::pipeline::{ChunkFailure, IngestSummary, ParquetExport, PipelineDriver, RunReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_logging_init_is_idempotent() {
        init_logging();
        init_logging();
        log::info!("logging initialized");
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .learning_rate(0.05)
            .n_estimators(20)
            .ensemble_size(3)
            .build()
            .unwrap();

        assert_eq!(config.booster.learning_rate, 0.05);
        assert_eq!(config.booster.n_estimators, 20);
        assert_eq!(config.bagging.ensemble_size, 3);
    }

    #[test]
    fn test_error_integration() {
        let err = PipelineError::config("test error");
        assert_eq!(err.category(), "config");
        assert!(!err.is_retryable());
    }
}
