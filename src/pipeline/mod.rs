//! End-to-end runs: record ingestion, chunked scoring, and audit reports.

pub mod driver;
pub mod ingest;
pub mod report;

pub use driver::PipelineDriver;
pub use ingest::{export_parquet, ingest, year_batches, IngestSummary, ParquetExport};
pub use report::{ChunkFailure, RunReport};
