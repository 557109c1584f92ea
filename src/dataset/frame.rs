//! In-memory training matrices extracted from materialized frames.

use crate::core::error::{PipelineError, Result};
use crate::core::types::{FeatureValue, Label};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Feature matrix and binary labels of one bootstrap round.
///
/// A frame is owned by exactly one training round and dropped when the
/// round's scope ends.
#[derive(Debug, Clone)]
pub struct TrainingFrame {
    features: Array2<FeatureValue>,
    labels: Array1<Label>,
    feature_names: Vec<String>,
}

impl TrainingFrame {
    /// Extract `features` and the binary `target` column from `df`.
    ///
    /// Feature nulls become NaN. Labels must be 0 or 1.
    pub fn from_frame(df: &DataFrame, features: &[String], target: &str) -> Result<Self> {
        let matrix = feature_matrix(df, features)?;
        let raw_labels = column_to_f64(df, target)?;

        let labels = raw_labels
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Some(v) if v == 0.0 || v == 1.0 => Ok(v as Label),
                Some(v) => Err(PipelineError::dataset(format!(
                    "Target column '{}' holds non-binary value {} at row {}",
                    target, v, row
                ))),
                None => Err(PipelineError::dataset(format!(
                    "Target column '{}' is null at row {}",
                    target, row
                ))),
            })
            .collect::<Result<Vec<Label>>>()?;

        Self::new(matrix, Array1::from_vec(labels), features.to_vec())
    }

    /// Build a frame from raw parts.
    pub fn new(
        features: Array2<FeatureValue>,
        labels: Array1<Label>,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(PipelineError::dataset(format!(
                "Feature rows ({}) and labels ({}) disagree",
                features.nrows(),
                labels.len()
            )));
        }
        if features.ncols() != feature_names.len() {
            return Err(PipelineError::dataset(format!(
                "Feature columns ({}) and names ({}) disagree",
                features.ncols(),
                feature_names.len()
            )));
        }

        Ok(TrainingFrame {
            features,
            labels,
            feature_names,
        })
    }

    pub fn features(&self) -> &Array2<FeatureValue> {
        &self.features
    }

    pub fn labels(&self) -> &Array1<Label> {
        &self.labels
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn num_rows(&self) -> usize {
        self.labels.len()
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Number of rows labelled 1
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l > 0.5).count()
    }

    /// Number of rows labelled 0
    pub fn negatives(&self) -> usize {
        self.num_rows() - self.positives()
    }

    /// True when the frame cannot train a binary classifier.
    pub fn is_degenerate(&self) -> bool {
        self.positives() == 0 || self.negatives() == 0
    }
}

/// Row-major feature matrix of the named columns. Nulls become NaN.
pub fn feature_matrix(df: &DataFrame, features: &[String]) -> Result<Array2<FeatureValue>> {
    let mut matrix = Array2::<FeatureValue>::zeros((df.height(), features.len()));

    for (feat_idx, name) in features.iter().enumerate() {
        let values = column_to_f64(df, name)?;
        for (row_idx, value) in values.into_iter().enumerate() {
            matrix[[row_idx, feat_idx]] = value.map_or(FeatureValue::NAN, |v| v as FeatureValue);
        }
    }

    Ok(matrix)
}

/// Names from `required` that `df` does not have.
pub fn missing_columns(df: &DataFrame, required: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|name| df.column(name.as_str()).is_err())
        .cloned()
        .collect()
}

/// Cast a numeric or boolean column to f64 values.
fn column_to_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|e| PipelineError::dataset(format!("Column '{}' not found: {}", name, e)))?;

    if matches!(column.dtype(), DataType::String) {
        return Err(PipelineError::dataset(format!(
            "Column '{}' is text and cannot be used as a numeric input",
            name
        )));
    }

    let series = column
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(|e| {
            PipelineError::dataset(format!("Column '{}' is not numeric: {}", name, e))
        })?;
    let values = series.f64()?;

    Ok(values.into_iter().collect())
}
