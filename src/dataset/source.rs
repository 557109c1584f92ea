//! Lazily-evaluated polars source.

use crate::core::error::{PipelineError, Result};
use crate::core::traits::TabularSource;
use crate::core::types::EntityId;
use polars::prelude::*;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

/// [`TabularSource`] backed by a polars `LazyFrame`.
///
/// Cloning is cheap: only the query plan is copied.
#[derive(Clone)]
pub struct PolarsSource {
    frame: LazyFrame,
}

impl PolarsSource {
    /// Wrap an existing lazy query.
    pub fn new(frame: LazyFrame) -> Self {
        PolarsSource { frame }
    }

    /// Wrap an in-memory frame.
    pub fn from_frame(df: DataFrame) -> Self {
        Self::new(df.lazy())
    }

    /// Scan a parquet file without reading it.
    pub fn scan_parquet<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let frame = LazyFrame::scan_parquet(path, ScanArgsParquet::default()).map_err(|e| {
            PipelineError::data_loading(format!(
                "Failed to scan parquet file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::new(frame))
    }

    /// Scan several parquet files as one stacked source.
    pub fn scan_parquet_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let sources = paths
            .iter()
            .map(Self::scan_parquet)
            .collect::<Result<Vec<_>>>()?;
        Self::concat(sources)
    }

    /// Materialize the view and write it to a single parquet file.
    ///
    /// Returns the number of rows written.
    pub fn write_parquet<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let mut df = self.collect()?;
        let file = File::create(path)?;
        let bytes = ParquetWriter::new(file).finish(&mut df)?;
        log::info!(
            "Wrote {} rows ({} bytes) to {}",
            df.height(),
            bytes,
            path.display()
        );
        Ok(df.height())
    }

    /// Vertically stack several sources into one.
    pub fn concat(sources: Vec<PolarsSource>) -> Result<Self> {
        if sources.is_empty() {
            return Err(PipelineError::dataset("Cannot concatenate zero sources"));
        }
        let frames: Vec<LazyFrame> = sources.into_iter().map(|s| s.frame).collect();
        Ok(Self::new(concat(frames, UnionArgs::default())?))
    }

    /// The underlying lazy query.
    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone()
    }
}

impl std::fmt::Debug for PolarsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolarsSource").finish_non_exhaustive()
    }
}

impl TabularSource for PolarsSource {
    fn filter_by_membership(&self, column: &str, members: &BTreeSet<EntityId>) -> Result<Self> {
        let keys: Vec<&str> = members.iter().map(String::as_str).collect();
        let key_frame = DataFrame::new(vec![Column::new(column.into(), keys)])?.lazy();

        // Semi join keeps each source row at most once, however often its key was drawn.
        let filtered = self.frame.clone().join(
            key_frame,
            [col(column).cast(DataType::String)],
            [col(column)],
            JoinArgs::new(JoinType::Semi),
        );

        Ok(Self::new(filtered))
    }

    fn slice(&self, offset: usize, length: usize) -> Self {
        Self::new(self.frame.clone().slice(offset as i64, length as IdxSize))
    }

    fn collect(&self) -> Result<DataFrame> {
        Ok(self.frame.clone().collect()?)
    }

    fn row_count(&self) -> Result<usize> {
        let counted = self.frame.clone().select([len().alias("rows")]).collect()?;
        let rows = counted
            .column("rows")?
            .as_materialized_series()
            .cast(&DataType::UInt64)?;

        rows.u64()?
            .get(0)
            .map(|n| n as usize)
            .ok_or_else(|| PipelineError::internal("Row count query returned no value"))
    }

    fn distinct_values(&self, column: &str) -> Result<BTreeSet<EntityId>> {
        let df = self
            .frame
            .clone()
            .select([col(column).cast(DataType::String)])
            .collect()
            .map_err(|e| {
                PipelineError::dataset(format!("Cannot read column '{}': {}", column, e))
            })?;

        let values = df.column(column)?.as_materialized_series().clone();
        let distinct = values
            .str()?
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();

        Ok(distinct)
    }
}
