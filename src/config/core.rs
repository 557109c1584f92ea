//! Core configuration structures for training and scoring.
//!
//! [`PipelineConfig`] groups the booster hyperparameters, the bootstrap
//! settings, the scoring/sink settings and the column layout. It can be built
//! fluently with [`ConfigBuilder`], loaded from TOML or JSON, and overridden
//! from `DELINQ_*` environment variables.

use crate::core::constants::*;
use crate::core::error::{PipelineError, Result};
use crate::core::threading::effective_threads;
use crate::core::types::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hyperparameters of one boosted-tree classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterParams {
    /// Number of boosting iterations (trees)
    pub n_estimators: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Shrinkage applied to every tree's output
    pub learning_rate: f64,
    /// Fraction of rows drawn without replacement for each iteration
    pub subsample: f64,
    /// Fraction of feature columns drawn for each tree
    pub colsample_bytree: f64,
    /// L2 regularization on leaf weights
    pub lambda_l2: f64,
    /// Minimum sum of hessians in a child
    pub min_child_weight: f64,
    /// Minimum number of rows in a child
    pub min_data_in_leaf: usize,
    /// Maximum number of bins per feature
    pub max_bin: usize,
}

impl Default for BoosterParams {
    fn default() -> Self {
        BoosterParams {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_depth: DEFAULT_MAX_DEPTH,
            learning_rate: DEFAULT_LEARNING_RATE,
            subsample: DEFAULT_SUBSAMPLE,
            colsample_bytree: DEFAULT_COLSAMPLE_BYTREE,
            lambda_l2: DEFAULT_LAMBDA_L2,
            min_child_weight: DEFAULT_MIN_CHILD_WEIGHT,
            min_data_in_leaf: DEFAULT_MIN_DATA_IN_LEAF,
            max_bin: DEFAULT_MAX_BIN,
        }
    }
}

impl BoosterParams {
    /// Validate the booster hyperparameters
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::invalid_parameter(
                "n_estimators",
                self.n_estimators.to_string(),
                "must be at least 1",
            ));
        }

        if self.max_depth == 0 {
            return Err(PipelineError::invalid_parameter(
                "max_depth",
                self.max_depth.to_string(),
                "must be at least 1",
            ));
        }

        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(PipelineError::invalid_parameter(
                "learning_rate",
                self.learning_rate.to_string(),
                "must be in range (0.0, 1.0]",
            ));
        }

        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(PipelineError::invalid_parameter(
                "subsample",
                self.subsample.to_string(),
                "must be in range (0.0, 1.0]",
            ));
        }

        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return Err(PipelineError::invalid_parameter(
                "colsample_bytree",
                self.colsample_bytree.to_string(),
                "must be in range (0.0, 1.0]",
            ));
        }

        if self.lambda_l2.is_nan() || self.lambda_l2 < 0.0 {
            return Err(PipelineError::invalid_parameter(
                "lambda_l2",
                self.lambda_l2.to_string(),
                "must be non-negative",
            ));
        }

        if self.min_child_weight.is_nan() || self.min_child_weight < 0.0 {
            return Err(PipelineError::invalid_parameter(
                "min_child_weight",
                self.min_child_weight.to_string(),
                "must be non-negative",
            ));
        }

        if self.max_bin < 2 || self.max_bin > u16::MAX as usize {
            return Err(PipelineError::invalid_parameter(
                "max_bin",
                self.max_bin.to_string(),
                "must be in range [2, 65535]",
            ));
        }

        Ok(())
    }
}

/// Settings of the entity-level bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaggingConfig {
    /// Number of ensemble members to train
    pub ensemble_size: usize,
    /// Fraction of the entity population drawn per round, in (0, 1]
    pub sample_frac: f64,
    /// Master seed; every round's seed is derived from it
    pub seed: u64,
    /// Policy for samples lacking one of the two classes
    pub degenerate_policy: DegeneratePolicy,
    /// Train rounds concurrently on a worker pool
    pub parallel: bool,
    /// Training worker count (0 = all cores)
    pub num_threads: usize,
}

impl Default for BaggingConfig {
    fn default() -> Self {
        BaggingConfig {
            ensemble_size: DEFAULT_ENSEMBLE_SIZE,
            sample_frac: DEFAULT_SAMPLE_FRAC,
            seed: DEFAULT_RANDOM_SEED,
            degenerate_policy: DegeneratePolicy::default(),
            parallel: false,
            num_threads: DEFAULT_NUM_WORKERS,
        }
    }
}

/// Settings of the chunked scoring run and its sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Rows materialized per chunk
    pub chunk_size: usize,
    /// Scoring worker count (0 = all cores, 1 = sequential)
    pub num_workers: usize,
    /// Append to or replace the sink table
    pub write_mode: WriteMode,
    /// Per-worker sessions or one serialized session
    pub write_concurrency: WriteConcurrency,
    /// Name of the sink table
    pub table: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            num_workers: DEFAULT_NUM_WORKERS,
            write_mode: WriteMode::default(),
            write_concurrency: WriteConcurrency::default(),
            table: DEFAULT_SINK_TABLE.to_string(),
        }
    }
}

/// Column layout of the source records and the persisted scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Entity identifier column (unit of resampling)
    pub entity: String,
    /// Reporting-period key column
    pub period: String,
    /// Observed binary label column
    pub target: String,
    /// Name given to the averaged probability column
    pub probability: String,
    /// Numeric feature columns fed to the classifier
    pub features: Vec<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        ColumnConfig {
            entity: DEFAULT_ENTITY_COLUMN.to_string(),
            period: DEFAULT_PERIOD_COLUMN.to_string(),
            target: DEFAULT_TARGET_COLUMN.to_string(),
            probability: DEFAULT_PROBABILITY_COLUMN.to_string(),
            features: Vec::new(),
        }
    }
}

impl ColumnConfig {
    /// The four persisted score columns, in output order.
    pub fn output_columns(&self) -> [&str; 4] {
        [&self.entity, &self.period, &self.target, &self.probability]
    }
}

/// Complete configuration of a training and scoring run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Booster hyperparameters shared by every ensemble member
    pub booster: BoosterParams,
    /// Bootstrap settings
    pub bagging: BaggingConfig,
    /// Scoring and sink settings
    pub scoring: ScoringConfig,
    /// Column layout
    pub columns: ColumnConfig,
}

impl PipelineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.booster.validate()?;

        if self.bagging.ensemble_size == 0 {
            return Err(PipelineError::invalid_parameter(
                "ensemble_size",
                "0",
                "must be at least 1",
            ));
        }

        if !(self.bagging.sample_frac > 0.0 && self.bagging.sample_frac <= 1.0) {
            return Err(PipelineError::invalid_parameter(
                "sample_frac",
                self.bagging.sample_frac.to_string(),
                "must be in range (0.0, 1.0]",
            ));
        }

        if self.scoring.chunk_size == 0 {
            return Err(PipelineError::invalid_parameter(
                "chunk_size",
                "0",
                "must be at least 1",
            ));
        }

        if self.scoring.table.trim().is_empty() {
            return Err(PipelineError::invalid_parameter(
                "table",
                "\"\"",
                "sink table name must not be empty",
            ));
        }

        let columns = self.columns.output_columns();
        for (i, name) in columns.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(PipelineError::config("Output column names must not be empty"));
            }
            if columns[..i].contains(name) {
                return Err(PipelineError::config(format!(
                    "Output column '{}' is named twice",
                    name
                )));
            }
        }

        if self.bagging.num_threads > num_cpus::get() * 2 {
            log::warn!(
                "num_threads ({}) is much larger than available cores ({})",
                self.bagging.num_threads,
                num_cpus::get()
            );
        }

        Ok(())
    }

    /// Load configuration from a `.toml` or `.json` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::config(format!("Failed to read config file: {}", e)))?;

        let config: PipelineConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| PipelineError::config(format!("Failed to parse JSON config: {}", e)))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| PipelineError::config(format!("Failed to parse TOML config: {}", e)))?,
            _ => {
                return Err(PipelineError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a `.toml` or `.json` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)
                .map_err(|e| PipelineError::config(format!("Failed to serialize to JSON: {}", e)))?,
            Some("toml") => toml::to_string_pretty(self)
                .map_err(|e| PipelineError::config(format!("Failed to serialize to TOML: {}", e)))?,
            _ => {
                return Err(PipelineError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        std::fs::write(path, content)
            .map_err(|e| PipelineError::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Apply `DELINQ_*` environment variable overrides
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup (keys include the prefix)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, value: String) -> Result<T> {
            value
                .trim()
                .parse()
                .map_err(|_| PipelineError::config(format!("Invalid {}: '{}'", key, value)))
        }

        let key = |name: &str| format!("{}{}", ENV_PREFIX, name);

        if let Some(val) = lookup(&key("ENSEMBLE_SIZE")) {
            self.bagging.ensemble_size = parse(&key("ENSEMBLE_SIZE"), val)?;
        }
        if let Some(val) = lookup(&key("SAMPLE_FRAC")) {
            self.bagging.sample_frac = parse(&key("SAMPLE_FRAC"), val)?;
        }
        if let Some(val) = lookup(&key("SEED")) {
            self.bagging.seed = parse(&key("SEED"), val)?;
        }
        if let Some(val) = lookup(&key("CHUNK_SIZE")) {
            self.scoring.chunk_size = parse(&key("CHUNK_SIZE"), val)?;
        }
        if let Some(val) = lookup(&key("NUM_WORKERS")) {
            self.scoring.num_workers = parse(&key("NUM_WORKERS"), val)?;
        }

        self.validate()
    }

    /// Effective scoring worker count (0 means use all available cores)
    pub fn effective_num_workers(&self) -> usize {
        effective_threads(self.scoring.num_workers)
    }
}

/// Configuration builder for fluent configuration creation
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: PipelineConfig,
    validation_errors: Vec<String>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        ConfigBuilder {
            config: PipelineConfig::default(),
            validation_errors: Vec::new(),
        }
    }

    /// Set the number of boosting iterations per member
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.config.booster.n_estimators = n;
        self
    }

    /// Set the maximum tree depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.booster.max_depth = depth;
        self
    }

    /// Set the learning rate
    pub fn learning_rate(mut self, rate: f64) -> Self {
        if !(rate > 0.0 && rate <= 1.0) {
            self.validation_errors
                .push("learning_rate must be in range (0.0, 1.0]".to_string());
        }
        self.config.booster.learning_rate = rate;
        self
    }

    /// Set the row subsample fraction
    pub fn subsample(mut self, fraction: f64) -> Self {
        if !(fraction > 0.0 && fraction <= 1.0) {
            self.validation_errors
                .push("subsample must be in range (0.0, 1.0]".to_string());
        }
        self.config.booster.subsample = fraction;
        self
    }

    /// Set the column subsample fraction
    pub fn colsample_bytree(mut self, fraction: f64) -> Self {
        if !(fraction > 0.0 && fraction <= 1.0) {
            self.validation_errors
                .push("colsample_bytree must be in range (0.0, 1.0]".to_string());
        }
        self.config.booster.colsample_bytree = fraction;
        self
    }

    /// Set the full booster parameter block
    pub fn booster(mut self, params: BoosterParams) -> Self {
        self.config.booster = params;
        self
    }

    /// Set the ensemble size
    pub fn ensemble_size(mut self, size: usize) -> Self {
        self.config.bagging.ensemble_size = size;
        self
    }

    /// Set the fraction of entities drawn per round
    pub fn sample_frac(mut self, frac: f64) -> Self {
        if !(frac > 0.0 && frac <= 1.0) {
            self.validation_errors
                .push("sample_frac must be in range (0.0, 1.0]".to_string());
        }
        self.config.bagging.sample_frac = frac;
        self
    }

    /// Set the master random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.bagging.seed = seed;
        self
    }

    /// Set the degenerate-sample policy
    pub fn degenerate_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.config.bagging.degenerate_policy = policy;
        self
    }

    /// Train rounds on a worker pool
    pub fn parallel_training(mut self, parallel: bool) -> Self {
        self.config.bagging.parallel = parallel;
        self
    }

    /// Set the scoring chunk size
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.scoring.chunk_size = size;
        self
    }

    /// Set the scoring worker count
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.scoring.num_workers = workers;
        self
    }

    /// Set the sink write mode
    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.config.scoring.write_mode = mode;
        self
    }

    /// Set the sink write concurrency
    pub fn write_concurrency(mut self, concurrency: WriteConcurrency) -> Self {
        self.config.scoring.write_concurrency = concurrency;
        self
    }

    /// Set the sink table name
    pub fn table<S: Into<String>>(mut self, table: S) -> Self {
        self.config.scoring.table = table.into();
        self
    }

    /// Set the feature columns
    pub fn features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.columns.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Set the full column layout
    pub fn columns(mut self, columns: ColumnConfig) -> Self {
        self.config.columns = columns;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<PipelineConfig> {
        if !self.validation_errors.is_empty() {
            return Err(PipelineError::config(format!(
                "Configuration validation failed: {}",
                self.validation_errors.join(", ")
            )));
        }

        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
