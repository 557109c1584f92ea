//! Core trait definitions for the pipeline.
//!
//! These traits are the seams between the pipeline and its collaborators:
//! the lazily-evaluated input source, the durable table store, the trained
//! classifier, and the boosting objective.

use crate::core::error::{PipelineError, Result};
use crate::core::types::*;
use ndarray::ArrayView2;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Debug;

/// A lazily-evaluated, column-typed tabular source.
///
/// Filtering and slicing build new lazy views; nothing is materialized until
/// [`TabularSource::collect`] is called.
pub trait TabularSource: Send + Sync {
    /// Rows whose `column` value is a member of `members`.
    fn filter_by_membership(&self, column: &str, members: &BTreeSet<EntityId>) -> Result<Self>
    where
        Self: Sized;

    /// A bounded view of `length` rows starting at `offset`.
    fn slice(&self, offset: usize, length: usize) -> Self
    where
        Self: Sized;

    /// Materialize the view into an in-memory frame.
    fn collect(&self) -> Result<DataFrame>;

    /// Total number of rows in the view.
    fn row_count(&self) -> Result<usize>;

    /// Distinct values of `column`, rendered as entity identifiers.
    fn distinct_values(&self, column: &str) -> Result<BTreeSet<EntityId>>;
}

/// A durable, named-table store accepting chunk appends.
pub trait ChunkSink: Send {
    /// Append `rows` to `table`, creating it with a matching schema if absent.
    ///
    /// Returns the number of rows written. A failed call leaves the table as
    /// it was before the call.
    fn append(&mut self, table: &str, rows: &DataFrame) -> Result<usize>;

    /// Drop `table` if it exists. Returns whether a table was dropped.
    fn drop_table(&mut self, table: &str) -> Result<bool>;

    /// Row count of `table`, or `None` when it does not exist.
    fn row_count(&mut self, table: &str) -> Result<Option<usize>>;
}

/// Opens store sessions; one per worker when writes are not serialized.
pub trait SinkFactory: Send + Sync {
    /// Session type produced by this factory
    type Sink: ChunkSink;

    /// Open a fresh session against the target store.
    fn open(&self) -> Result<Self::Sink>;
}

/// A trained binary classifier exposing positive-class probabilities.
pub trait ProbabilisticClassifier: Send + Sync + Debug {
    /// Positive-class probability for every row of `features`.
    fn predict_proba(&self, features: ArrayView2<'_, FeatureValue>) -> Result<Vec<Probability>>;

    /// Number of feature columns the model was fitted on.
    fn num_features(&self) -> usize;
}

/// Trait for objective functions that compute gradients and hessians.
pub trait ObjectiveFunction: Send + Sync + Debug {
    /// Compute first and second order gradients of the loss at `scores`.
    fn compute_gradients(
        &self,
        scores: &[Score],
        labels: &[Label],
        gradients: &mut [Score],
        hessians: &mut [Score],
    ) -> Result<()>;

    /// Constant raw score every model starts from.
    fn init_score(&self, labels: &[Label]) -> Score;

    /// Map a raw score to the output space.
    fn transform(&self, score: Score) -> Probability;

    /// Get the objective function name.
    fn name(&self) -> &'static str;
}

/// Trait for components persisted with bincode.
pub trait Persistable: Serialize + for<'de> Deserialize<'de> {
    /// Save component to a file.
    fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let file = std::io::BufWriter::new(std::fs::File::create(path)?);
        bincode::serialize_into(file, self).map_err(|e| {
            PipelineError::serialization(format!("Failed to serialize: {}", e))
        })
    }

    /// Load component from a file.
    fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self>
    where
        Self: Sized,
    {
        let file = std::io::BufReader::new(std::fs::File::open(path)?);
        bincode::deserialize_from(file).map_err(|e| {
            PipelineError::serialization(format!("Failed to deserialize: {}", e))
        })
    }
}
