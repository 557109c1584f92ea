//! Ensemble scoring of materialized chunks.

use crate::bagging::ensemble::Ensemble;
use crate::config::ColumnConfig;
use crate::core::error::{PipelineError, Result};
use crate::core::types::Probability;
use crate::dataset::frame::{feature_matrix, missing_columns};
use polars::prelude::*;

/// Averages the positive-class probabilities of every ensemble member.
#[derive(Debug, Clone, Copy)]
pub struct EnsembleScorer<'a> {
    ensemble: &'a Ensemble,
}

impl<'a> EnsembleScorer<'a> {
    pub fn new(ensemble: &'a Ensemble) -> Self {
        EnsembleScorer { ensemble }
    }

    /// Unweighted mean probability per row of `chunk`.
    ///
    /// Members are summed in ensemble order, so identical inputs produce
    /// bit-identical outputs.
    pub fn score(&self, chunk: &DataFrame) -> Result<Vec<Probability>> {
        let features = self.ensemble.feature_names();
        let missing = missing_columns(chunk, features);
        if !missing.is_empty() {
            return Err(PipelineError::scoring(format!(
                "Chunk is missing feature columns: {}",
                missing.join(", ")
            )));
        }

        let matrix = feature_matrix(chunk, features)
            .map_err(|e| PipelineError::scoring(format!("Cannot read chunk features: {}", e)))?;

        let mut sums = vec![0.0; chunk.height()];
        for member in self.ensemble.classifiers() {
            let probabilities = member.predict_proba(matrix.view())?;
            if probabilities.len() != sums.len() {
                return Err(PipelineError::scoring(format!(
                    "Member returned {} probabilities for {} rows",
                    probabilities.len(),
                    sums.len()
                )));
            }
            for (sum, p) in sums.iter_mut().zip(probabilities) {
                *sum += p;
            }
        }

        let members = self.ensemble.len() as f64;
        Ok(sums
            .into_iter()
            .map(|s| (s / members).clamp(0.0, 1.0))
            .collect())
    }

    /// Score `chunk` and project it to the persisted columns: entity,
    /// period, label, and averaged probability.
    pub fn score_rows(&self, chunk: &DataFrame, columns: &ColumnConfig) -> Result<DataFrame> {
        let probabilities = self.score(chunk)?;
        project_scores(chunk, columns, probabilities)
    }
}

/// Keep the key and label columns of `chunk` and append `probabilities`.
pub fn project_scores(
    chunk: &DataFrame,
    columns: &ColumnConfig,
    probabilities: Vec<Probability>,
) -> Result<DataFrame> {
    let keys = [
        columns.entity.as_str(),
        columns.period.as_str(),
        columns.target.as_str(),
    ];
    let required: Vec<String> = keys.iter().map(|s| s.to_string()).collect();
    let missing = missing_columns(chunk, &required);
    if !missing.is_empty() {
        return Err(PipelineError::scoring(format!(
            "Chunk is missing output columns: {}",
            missing.join(", ")
        )));
    }
    if probabilities.len() != chunk.height() {
        return Err(PipelineError::scoring(format!(
            "{} probabilities for {} rows",
            probabilities.len(),
            chunk.height()
        )));
    }

    let mut rows = chunk.select(keys)?;
    rows.with_column(Column::new(columns.probability.as_str().into(), probabilities))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_scores() {
        let chunk = df![
            "LOAN_SEQUENCE_NUMBER" => ["A", "B"],
            "MONTHLY_REPORTING_PERIOD" => [202001i64, 202002],
            "DELINQUENT" => [0i32, 1],
            "LOAN_AGE" => [3.0f64, 4.0],
        ]
        .unwrap();

        let rows = project_scores(&chunk, &ColumnConfig::default(), vec![0.1, 0.9]).unwrap();
        let names: Vec<&str> = rows.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "LOAN_SEQUENCE_NUMBER",
                "MONTHLY_REPORTING_PERIOD",
                "DELINQUENT",
                "DELINQ_PROB"
            ]
        );
        assert_eq!(rows.height(), 2);
    }

    #[test]
    fn test_project_scores_errors() {
        let chunk = df!["LOAN_SEQUENCE_NUMBER" => ["A"]].unwrap();
        assert!(matches!(
            project_scores(&chunk, &ColumnConfig::default(), vec![0.5]),
            Err(PipelineError::Scoring { .. })
        ));
    }
}
