//! Default configuration values for the pipeline.
//!
//! Booster defaults reproduce the hyperparameters the delinquency model has
//! historically been trained with; column defaults name the loan performance
//! layout.

/// Default number of boosting iterations per ensemble member.
pub const DEFAULT_N_ESTIMATORS: usize = 50;

/// Default maximum tree depth.
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Default learning rate (shrinkage) for gradient boosting.
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;

/// Default fraction of rows drawn for each boosting iteration.
pub const DEFAULT_SUBSAMPLE: f64 = 0.8;

/// Default fraction of feature columns drawn for each tree.
pub const DEFAULT_COLSAMPLE_BYTREE: f64 = 0.8;

/// Default L2 regularization on leaf weights.
pub const DEFAULT_LAMBDA_L2: f64 = 1.0;

/// Default minimum sum of hessians required in a child.
pub const DEFAULT_MIN_CHILD_WEIGHT: f64 = 1.0;

/// Default minimum number of rows required in a child.
pub const DEFAULT_MIN_DATA_IN_LEAF: usize = 1;

/// Default maximum number of bins for feature discretization.
pub const DEFAULT_MAX_BIN: usize = 255;

/// Default number of ensemble members.
pub const DEFAULT_ENSEMBLE_SIZE: usize = 10;

/// Default fraction of the entity population drawn per bootstrap round.
pub const DEFAULT_SAMPLE_FRAC: f64 = 0.01;

/// Default number of held-out rows materialized per scoring chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;

/// Default worker count. 0 means use all available cores.
pub const DEFAULT_NUM_WORKERS: usize = 0;

/// Default random seed for reproducibility.
pub const DEFAULT_RANDOM_SEED: u64 = 0;

/// Default entity identifier column.
pub const DEFAULT_ENTITY_COLUMN: &str = "LOAN_SEQUENCE_NUMBER";

/// Default reporting-period key column.
pub const DEFAULT_PERIOD_COLUMN: &str = "MONTHLY_REPORTING_PERIOD";

/// Default observed label column.
pub const DEFAULT_TARGET_COLUMN: &str = "DELINQUENT";

/// Default name of the persisted averaged probability column.
pub const DEFAULT_PROBABILITY_COLUMN: &str = "DELINQ_PROB";

/// Default sink table name.
pub const DEFAULT_SINK_TABLE: &str = "delinquency_scores";

/// Milliseconds a store session waits on a locked database before failing.
pub const STORE_BUSY_TIMEOUT_MS: u64 = 30_000;

/// Prefix of environment variables that override configuration.
pub const ENV_PREFIX: &str = "DELINQ_";
