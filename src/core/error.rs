//! Error handling and error types for the delinquency ensemble pipeline.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side
//! is the single [`PipelineError`] enum. Variants follow the failure taxonomy
//! of the training and scoring pipeline: population and sampling failures are
//! fatal to a training run, while scoring and storage failures are isolated
//! to the chunk that raised them.

use std::io;
use thiserror::Error;

/// Main error type for the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration and validation errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid input parameters supplied by the caller
    #[error("Invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Sampling was requested against a population with no entities
    #[error("Population is empty: cannot draw a bootstrap sample from zero entities")]
    EmptyPopulation,

    /// A bootstrap sample produced a training frame lacking one of the two classes
    #[error(
        "Degenerate bootstrap sample in round {round} after {attempts} attempt(s): \
         {positives} positive and {negatives} negative labels"
    )]
    DegenerateSample {
        round: usize,
        attempts: usize,
        positives: usize,
        negatives: usize,
    },

    /// Chunk columns disagree with an existing sink table
    #[error("Schema mismatch for table '{table}': expected [{expected}], got [{actual}]")]
    SchemaMismatch {
        table: String,
        expected: String,
        actual: String,
    },

    /// A durable write failed; the chunk is considered unwritten
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// A chunk's rows could not be materialized from its source
    #[error("Chunk load error: {message}")]
    ChunkLoad { message: String },

    /// A model failed to score a chunk
    #[error("Scoring error: {message}")]
    Scoring { message: String },

    /// Model fitting errors
    #[error("Training error: {message}")]
    Training { message: String },

    /// Dataset shape and content errors
    #[error("Dataset error: {message}")]
    Dataset { message: String },

    /// Source record loading and parsing errors
    #[error("Data loading error: {message}")]
    DataLoading { message: String },

    /// Model serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IO {
        #[from]
        source: io::Error,
    },

    /// CSV parsing errors
    #[error("CSV parsing error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Bincode serialization errors
    #[error("Bincode error: {source}")]
    Bincode {
        #[from]
        source: bincode::Error,
    },

    /// Errors raised by the lazy tabular engine
    #[error("Polars error: {source}")]
    Polars {
        #[from]
        source: polars::prelude::PolarsError,
    },

    /// Internal library errors (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Results using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        PipelineError::Config {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        PipelineError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a schema mismatch error
    pub fn schema_mismatch<T, E, A>(table: T, expected: E, actual: A) -> Self
    where
        T: Into<String>,
        E: Into<String>,
        A: Into<String>,
    {
        PipelineError::SchemaMismatch {
            table: table.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        PipelineError::Storage {
            message: message.into(),
        }
    }

    /// Create a scoring error
    pub fn scoring<S: Into<String>>(message: S) -> Self {
        PipelineError::Scoring {
            message: message.into(),
        }
    }

    /// Create a chunk load error
    pub fn chunk_load<S: Into<String>>(message: S) -> Self {
        PipelineError::ChunkLoad {
            message: message.into(),
        }
    }

    /// Create a training error
    pub fn training<S: Into<String>>(message: S) -> Self {
        PipelineError::Training {
            message: message.into(),
        }
    }

    /// Create a dataset error
    pub fn dataset<S: Into<String>>(message: S) -> Self {
        PipelineError::Dataset {
            message: message.into(),
        }
    }

    /// Create a data loading error
    pub fn data_loading<S: Into<String>>(message: S) -> Self {
        PipelineError::DataLoading {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        PipelineError::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error (should be used sparingly)
    pub fn internal<S: Into<String>>(message: S) -> Self {
        PipelineError::Internal {
            message: message.into(),
        }
    }

    /// Whether the failed unit of work may be re-run from scratch.
    ///
    /// Storage failures and chunk load failures qualify: in both cases the
    /// chunk was not durably written, so running the same range again cannot
    /// duplicate rows.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::Storage { .. } | PipelineError::ChunkLoad { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::Config { .. } => "config",
            PipelineError::InvalidParameter { .. } => "invalid_parameter",
            PipelineError::EmptyPopulation => "empty_population",
            PipelineError::DegenerateSample { .. } => "degenerate_sample",
            PipelineError::SchemaMismatch { .. } => "schema_mismatch",
            PipelineError::Storage { .. } => "storage",
            PipelineError::ChunkLoad { .. } => "chunk_load",
            PipelineError::Scoring { .. } => "scoring",
            PipelineError::Training { .. } => "training",
            PipelineError::Dataset { .. } => "dataset",
            PipelineError::DataLoading { .. } => "data_loading",
            PipelineError::Serialization { .. } => "serialization",
            PipelineError::IO { .. } => "io",
            PipelineError::Csv { .. } => "csv",
            PipelineError::Json { .. } => "json",
            PipelineError::Bincode { .. } => "bincode",
            PipelineError::Polars { .. } => "polars",
            PipelineError::Internal { .. } => "internal",
        }
    }
}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        PipelineError::Storage {
            message: err.to_string(),
        }
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::error::PipelineError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::PipelineError::config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! scoring_error {
    ($msg:expr) => {
        $crate::core::error::PipelineError::scoring($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::PipelineError::scoring(format!($fmt, $($arg)*))
    };
}
