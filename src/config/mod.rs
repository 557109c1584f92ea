//! Configuration management for the delinquency ensemble pipeline.
//!
//! Settings are grouped by concern: booster hyperparameters, the entity-level
//! bootstrap, chunked scoring, and the column layout. Every group has
//! defaults, so partial TOML/JSON files are accepted.

pub mod core;

pub use self::core::{
    BaggingConfig, BoosterParams, ColumnConfig, ConfigBuilder, PipelineConfig, ScoringConfig,
};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "delinquency.toml";

/// Default ensemble model file name
pub const DEFAULT_MODEL_FILE: &str = "ensemble.bin";
