//! Chunked scoring driver.
//!
//! The driver plans disjoint row ranges over the held-out source, then for
//! each range materializes the rows, scores them with the ensemble and
//! appends the projected scores to the sink table. Chunks run on a dedicated
//! rayon pool and may complete in any order. A chunk that fails is logged and
//! recorded in the [`RunReport`]; it never aborts chunks that already
//! committed. Only failing to open a store session stops the run.

use crate::bagging::ensemble::Ensemble;
use crate::config::{ColumnConfig, PipelineConfig, ScoringConfig};
use crate::core::error::{PipelineError, Result};
use crate::core::threading::{build_pool, effective_threads};
use crate::core::traits::{ChunkSink, SinkFactory, TabularSource};
use crate::core::types::{WriteConcurrency, WriteMode};
use crate::pipeline::report::{ChunkFailure, RunReport};
use crate::scoring::chunks::{ChunkPlan, ChunkRange};
use crate::scoring::scorer::EnsembleScorer;
use chrono::Utc;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use std::sync::Mutex;

type ChunkOutcome = (ChunkRange, Result<usize>);

/// Scores a held-out source chunk by chunk into a sink table.
#[derive(Debug, Clone)]
pub struct PipelineDriver {
    scoring: ScoringConfig,
    columns: ColumnConfig,
}

impl PipelineDriver {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(PipelineDriver {
            scoring: config.scoring.clone(),
            columns: config.columns.clone(),
        })
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn columns(&self) -> &ColumnConfig {
        &self.columns
    }

    /// Chunk plan covering every row of `source`.
    pub fn plan<S: TabularSource>(&self, source: &S) -> Result<ChunkPlan> {
        ChunkPlan::new(source.row_count()?, self.scoring.chunk_size)
    }

    /// Score all of `source` into the configured table.
    ///
    /// In [`WriteMode::Replace`] the table is dropped once before the first
    /// chunk.
    pub fn run<S, F>(&self, source: &S, ensemble: &Ensemble, factory: &F) -> Result<RunReport>
    where
        S: TabularSource,
        F: SinkFactory,
    {
        let plan = self.plan(source)?;
        log::info!(
            "Scoring {} rows into '{}' in {} chunk(s) of up to {} rows",
            plan.total_rows(),
            self.scoring.table,
            plan.len(),
            plan.chunk_size()
        );

        if self.scoring.write_mode == WriteMode::Replace {
            let mut sink = factory.open()?;
            if sink.drop_table(&self.scoring.table)? {
                log::info!("Replacing existing table '{}'", self.scoring.table);
            }
        }

        self.execute(source, ensemble, factory, plan.ranges())
    }

    /// Score only `ranges`, appending to the table regardless of write mode.
    ///
    /// Meant for re-running the failed ranges of an earlier report.
    pub fn run_ranges<S, F>(
        &self,
        source: &S,
        ensemble: &Ensemble,
        factory: &F,
        ranges: &[ChunkRange],
    ) -> Result<RunReport>
    where
        S: TabularSource,
        F: SinkFactory,
    {
        log::info!(
            "Re-running {} chunk(s) into '{}'",
            ranges.len(),
            self.scoring.table
        );
        self.execute(source, ensemble, factory, ranges.to_vec())
    }

    fn execute<S, F>(
        &self,
        source: &S,
        ensemble: &Ensemble,
        factory: &F,
        ranges: Vec<ChunkRange>,
    ) -> Result<RunReport>
    where
        S: TabularSource,
        F: SinkFactory,
    {
        let started_at = Utc::now();
        let total_rows = ranges.iter().map(|r| r.length).sum();
        let scorer = EnsembleScorer::new(ensemble);

        let outcomes: Vec<ChunkOutcome> = if effective_threads(self.scoring.num_workers) == 1 || ranges.len() < 2 {
            let mut sink = factory.open()?;
            ranges
                .iter()
                .map(|&range| (range, self.process_chunk(source, scorer, &mut sink, range)))
                .collect()
        } else {
            let pool = build_pool(self.scoring.num_workers, "delinq-score")?;
            log::debug!(
                "Dispatching chunks to {} workers ({})",
                pool.current_num_threads(),
                self.scoring.write_concurrency
            );
            pool.install(|| match self.scoring.write_concurrency {
                WriteConcurrency::PerWorker => self.per_worker(source, scorer, factory, &ranges),
                WriteConcurrency::Serialized => self.serialized(source, scorer, factory, &ranges),
            })?
        };

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (range, outcome) in outcomes {
            match outcome {
                Ok(rows) => succeeded.push((range, rows)),
                Err(e) => {
                    log::error!("Chunk {} failed [{}]: {}", range, e.category(), e);
                    failed.push(ChunkFailure::new(range, &e));
                }
            }
        }

        let report = RunReport::new(&self.scoring.table, total_rows, succeeded, failed, started_at);
        if report.is_complete() {
            log::info!("Scoring finished: {}", report);
        } else {
            log::warn!("Scoring finished with failures: {}", report);
        }
        Ok(report)
    }

    /// Each rayon job opens its own session and reuses it across chunks.
    fn per_worker<S, F>(
        &self,
        source: &S,
        scorer: EnsembleScorer<'_>,
        factory: &F,
        ranges: &[ChunkRange],
    ) -> Result<Vec<ChunkOutcome>>
    where
        S: TabularSource,
        F: SinkFactory,
    {
        ranges
            .par_iter()
            .map_init(
                || factory.open(),
                |session, &range| match session {
                    Ok(sink) => Ok((range, self.process_chunk(source, scorer, sink, range))),
                    Err(e) => Err(PipelineError::storage(format!(
                        "Cannot open store session: {}",
                        e
                    ))),
                },
            )
            .collect()
    }

    /// Chunks are materialized and scored in parallel; appends take turns on
    /// one shared session.
    fn serialized<S, F>(
        &self,
        source: &S,
        scorer: EnsembleScorer<'_>,
        factory: &F,
        ranges: &[ChunkRange],
    ) -> Result<Vec<ChunkOutcome>>
    where
        S: TabularSource,
        F: SinkFactory,
    {
        let shared = Mutex::new(factory.open()?);
        Ok(ranges
            .par_iter()
            .map(|&range| {
                let outcome = self.prepare_chunk(source, scorer, range).and_then(|rows| {
                    let mut sink = shared
                        .lock()
                        .map_err(|_| PipelineError::internal("Store session lock poisoned"))?;
                    self.write_chunk(&mut *sink, range, &rows)
                });
                (range, outcome)
            })
            .collect())
    }

    fn process_chunk<S, K>(
        &self,
        source: &S,
        scorer: EnsembleScorer<'_>,
        sink: &mut K,
        range: ChunkRange,
    ) -> Result<usize>
    where
        S: TabularSource,
        K: ChunkSink,
    {
        let rows = self.prepare_chunk(source, scorer, range)?;
        self.write_chunk(sink, range, &rows)
    }

    /// Materialize `range` and project it to the persisted score columns.
    fn prepare_chunk<S: TabularSource>(
        &self,
        source: &S,
        scorer: EnsembleScorer<'_>,
        range: ChunkRange,
    ) -> Result<DataFrame> {
        let chunk = source
            .slice(range.offset, range.length)
            .collect()
            .map_err(|e| PipelineError::chunk_load(format!("rows {}: {}", range, e)))?;
        if chunk.height() != range.length {
            log::warn!(
                "Chunk {} materialized {} rows, expected {}",
                range,
                chunk.height(),
                range.length
            );
        }
        scorer.score_rows(&chunk, &self.columns)
    }

    fn write_chunk<K: ChunkSink>(&self, sink: &mut K, range: ChunkRange, rows: &DataFrame) -> Result<usize> {
        let written = sink.append(&self.scoring.table, rows)?;
        log::debug!("Chunk {} wrote {} rows", range, written);
        Ok(written)
    }
}
