//! Audit record of a scoring run.

use crate::core::error::{PipelineError, Result};
use crate::scoring::chunks::ChunkRange;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// A chunk that was not written, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkFailure {
    pub range: ChunkRange,
    pub category: &'static str,
    pub message: String,
    /// Whether running the same range again cannot duplicate rows
    pub retryable: bool,
}

impl ChunkFailure {
    pub fn new(range: ChunkRange, error: &PipelineError) -> Self {
        ChunkFailure {
            range,
            category: error.category(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// Outcome of [`PipelineDriver::run`](super::PipelineDriver::run).
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub table: String,
    /// Rows the run was asked to score
    pub total_rows: usize,
    /// Rows durably written across all succeeded chunks
    pub rows_written: usize,
    /// Written chunks with their row counts, in offset order
    pub succeeded: Vec<(ChunkRange, usize)>,
    /// Unwritten chunks, in offset order
    pub failed: Vec<ChunkFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    pub(crate) fn new(
        table: &str,
        total_rows: usize,
        mut succeeded: Vec<(ChunkRange, usize)>,
        mut failed: Vec<ChunkFailure>,
        started_at: DateTime<Utc>,
    ) -> Self {
        succeeded.sort_by_key(|(range, _)| *range);
        failed.sort_by_key(|f| f.range);
        let rows_written = succeeded.iter().map(|(_, rows)| rows).sum();

        RunReport {
            table: table.to_string(),
            total_rows,
            rows_written,
            succeeded,
            failed,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Ranges to pass to `run_ranges` for a targeted re-run.
    pub fn failed_ranges(&self) -> Vec<ChunkRange> {
        self.failed.iter().map(|f| f.range).collect()
    }

    /// Failed ranges that were confirmed unwritten.
    pub fn retryable_ranges(&self) -> Vec<ChunkRange> {
        self.failed
            .iter()
            .filter(|f| f.retryable)
            .map(|f| f.range)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.rows_written == self.total_rows
    }

    /// Fails unless every requested row was written.
    pub fn audit(&self) -> Result<()> {
        if self.rows_written == self.total_rows {
            return Ok(());
        }
        let ranges = self
            .failed_ranges()
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(PipelineError::storage(format!(
            "Audit failed for table '{}': wrote {} of {} rows; failed ranges [{}]",
            self.table, self.rows_written, self.total_rows, ranges
        )))
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Write the report as pretty JSON.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} rows in {} chunk(s), {} failed, {} ms",
            self.table,
            self.rows_written,
            self.total_rows,
            self.succeeded.len(),
            self.failed.len(),
            self.elapsed().num_milliseconds()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_report() {
        let report = RunReport::new(
            "scores",
            250,
            vec![
                (ChunkRange::new(200, 50), 50),
                (ChunkRange::new(0, 100), 100),
                (ChunkRange::new(100, 100), 100),
            ],
            Vec::new(),
            Utc::now(),
        );
        assert_eq!(report.rows_written, 250);
        assert_eq!(report.succeeded[0].0, ChunkRange::new(0, 100));
        assert!(report.is_complete());
        assert!(report.audit().is_ok());
    }

    #[test]
    fn test_failed_report() {
        let failure = ChunkFailure::new(
            ChunkRange::new(100, 100),
            &PipelineError::storage("disk I/O error"),
        );
        let scoring = ChunkFailure::new(
            ChunkRange::new(0, 100),
            &PipelineError::scoring("missing LOAN_AGE"),
        );
        let report = RunReport::new(
            "scores",
            250,
            vec![(ChunkRange::new(200, 50), 50)],
            vec![failure, scoring],
            Utc::now(),
        );

        assert!(!report.is_complete());
        assert_eq!(
            report.failed_ranges(),
            vec![ChunkRange::new(0, 100), ChunkRange::new(100, 100)]
        );
        assert_eq!(report.retryable_ranges(), vec![ChunkRange::new(100, 100)]);
        let err = report.audit().unwrap_err();
        assert!(err.to_string().contains("wrote 50 of 250"));
    }

    #[test]
    fn test_save_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = RunReport::new("scores", 0, Vec::new(), Vec::new(), Utc::now());
        report.save_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["table"], "scores");
        assert_eq!(value["rows_written"], 0);
    }
}
