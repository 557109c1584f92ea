//! Bulk ingestion of record files into the table store.
//!
//! Periods are loaded a batch at a time and each batch is released before
//! the next one is read, which bounds memory by the batch size rather than
//! by the whole history. Batches go either into a table of the store or
//! into parquet files that the lazy trainer and scorer scan directly.

use crate::core::error::Result;
use crate::core::traits::ChunkSink;
use crate::dataset::loader::RecordLoader;
use crate::dataset::schema::RecordLayout;
use crate::dataset::source::PolarsSource;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Totals of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub files: usize,
    pub rows_written: usize,
    pub skipped_lines: usize,
}

/// Group the period files of `years` into batches of `batch_years`.
pub fn year_batches(
    layout: RecordLayout,
    base: &Path,
    years: &[u16],
    batch_years: usize,
) -> Vec<Vec<PathBuf>> {
    years
        .chunks(batch_years.max(1))
        .map(|batch| batch.iter().map(|&y| layout.period_file(base, y)).collect())
        .collect()
}

/// Load each batch with `loader` and append every period frame to `table`.
///
/// Stops at the first failure; batches appended before it stay written.
pub fn ingest<K: ChunkSink>(
    loader: &RecordLoader,
    batches: &[Vec<PathBuf>],
    sink: &mut K,
    table: &str,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    for (index, batch) in batches.iter().enumerate() {
        let periods = loader.load(batch)?;
        for period in &periods {
            summary.rows_written += sink.append(table, &period.frame)?;
            summary.skipped_lines += period.skipped_lines;
            summary.files += 1;
        }
        log::info!(
            "Ingested batch {}/{} into '{}' ({} rows so far)",
            index + 1,
            batches.len(),
            table,
            summary.rows_written
        );
    }

    Ok(summary)
}

/// Parquet files written by [`export_parquet`], one per non-empty batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParquetExport {
    pub summary: IngestSummary,
    pub files: Vec<PathBuf>,
}

impl ParquetExport {
    /// Scan every exported file as one lazy source.
    pub fn source(&self) -> Result<PolarsSource> {
        PolarsSource::scan_parquet_files(&self.files)
    }
}

/// Load each batch with `loader` and write it to `<dir>/<stem>_<batch>.parquet`.
///
/// Stops at the first failure; files written before it are kept.
pub fn export_parquet(
    loader: &RecordLoader,
    batches: &[Vec<PathBuf>],
    dir: &Path,
    stem: &str,
) -> Result<ParquetExport> {
    std::fs::create_dir_all(dir)?;
    let mut export = ParquetExport::default();

    for (index, batch) in batches.iter().enumerate() {
        let periods = loader.load(batch)?;
        if periods.is_empty() {
            continue;
        }

        export.summary.files += periods.len();
        export.summary.skipped_lines += periods.iter().map(|p| p.skipped_lines).sum::<usize>();
        let stacked = PolarsSource::concat(
            periods
                .into_iter()
                .map(|p| PolarsSource::from_frame(p.frame))
                .collect(),
        )?;

        let path = dir.join(format!("{}_{:03}.parquet", stem, index));
        export.summary.rows_written += stacked.write_parquet(&path)?;
        export.files.push(path);
        log::info!(
            "Exported batch {}/{} to {} ({} rows so far)",
            index + 1,
            batches.len(),
            dir.display(),
            export.summary.rows_written
        );
    }

    Ok(export)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::TabularSource;
    use crate::dataset::schema::{RecordSchema, SemanticType};
    use crate::sink::SqliteSink;

    #[test]
    fn test_year_batches() {
        let batches = year_batches(
            RecordLayout::Performance,
            Path::new("/data"),
            &[1999, 2000, 2001, 2002],
            3,
        );
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 3);
        assert_eq!(
            batches[1][0],
            PathBuf::from("/data/sample_2002/sample_svcg_2002.txt")
        );
    }

    fn record_files(dir: &Path) -> Vec<PathBuf> {
        (0..3)
            .map(|i| {
                let path = dir.join(format!("{}.txt", i));
                let records = format!("F{}|202001|4.5\nF{}|202002|5.0\nbad\n", i, i);
                std::fs::write(&path, records).unwrap();
                path
            })
            .collect()
    }

    fn loader() -> RecordLoader {
        RecordLoader::new(RecordSchema::new([
            ("ID", SemanticType::Text),
            ("PERIOD", SemanticType::Integer),
            ("RATE", SemanticType::Float),
        ]))
    }

    #[test]
    fn test_ingest_appends_all_periods() {
        let dir = tempfile::tempdir().unwrap();
        let paths = record_files(dir.path());
        let loader = loader();

        let mut sink = SqliteSink::open_in_memory().unwrap();
        let batches = vec![paths[..2].to_vec(), paths[2..].to_vec()];
        let summary = ingest(&loader, &batches, &mut sink, "performance").unwrap();

        assert_eq!(
            summary,
            IngestSummary {
                files: 3,
                rows_written: 6,
                skipped_lines: 3
            }
        );
        assert_eq!(sink.row_count("performance").unwrap(), Some(6));
    }

    #[test]
    fn test_export_parquet_scans_back() {
        let dir = tempfile::tempdir().unwrap();
        let paths = record_files(dir.path());
        let out = dir.path().join("parquet");

        let batches = vec![paths[..2].to_vec(), Vec::new(), paths[2..].to_vec()];
        let export = export_parquet(&loader(), &batches, &out, "performance").unwrap();

        assert_eq!(
            export.summary,
            IngestSummary {
                files: 3,
                rows_written: 6,
                skipped_lines: 3
            }
        );
        assert_eq!(
            export.files,
            vec![out.join("performance_000.parquet"), out.join("performance_002.parquet")]
        );

        let source = export.source().unwrap();
        assert_eq!(source.row_count().unwrap(), 6);
        let ids: Vec<String> = source.distinct_values("ID").unwrap().into_iter().collect();
        assert_eq!(ids, vec!["F0", "F1", "F2"]);
        assert_eq!(
            source.collect().unwrap().column("RATE").unwrap().dtype(),
            &polars::prelude::DataType::Float64
        );
    }
}
