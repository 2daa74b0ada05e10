//! Chunked batch execution with a checkpoint after every chunk.
//!
//! Inputs are split into consecutive chunks. Every unit of a chunk runs
//! concurrently on the caller's task; chunks run strictly one after another.
//! Once a chunk is joined its results are handed to a [`CheckpointSink`], so a
//! crash loses at most the chunk in flight.

use std::fmt::Display;
use std::path::PathBuf;

use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use tracing::{error, info, warn};

use dbbuilder_shared::{DbBuilderError, Result, TargetKey, UnitFailurePolicy};
use dbbuilder_tables::{ResultTable, table_file_name};

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// One piece of work per input, producing a table.
#[async_trait]
pub trait WorkUnit: Send + Sync {
    type Input: Display + Send + Sync;

    async fn process(&self, input: &Self::Input) -> Result<ResultTable>;
}

/// Persists results after each chunk.
pub trait CheckpointSink<I> {
    /// `chunk` holds the new results, `accumulated` everything so far
    /// (ending with `chunk`).
    fn checkpoint(
        &mut self,
        chunk: &[(I, ResultTable)],
        accumulated: &[(I, ResultTable)],
    ) -> Result<()>;
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a chunk starts; positions are 1-based and inclusive.
    fn chunk_started(&self, first: usize, last: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn chunk_started(&self, _first: usize, _last: usize, _total: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct UnitFailure {
    pub input: String,
    pub error: DbBuilderError,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub total: usize,
    pub completed: usize,
    pub chunks: usize,
    pub failures: Vec<UnitFailure>,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    chunk_size: usize,
    policy: UnitFailurePolicy,
}

impl Scheduler {
    /// A `chunk_size` of zero is treated as one.
    pub fn new(chunk_size: usize, policy: UnitFailurePolicy) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            policy,
        }
    }

    pub async fn run<U, S>(
        &self,
        inputs: Vec<U::Input>,
        unit: &U,
        sink: &mut S,
        progress: &dyn ProgressReporter,
    ) -> Result<RunSummary>
    where
        U: WorkUnit,
        S: CheckpointSink<U::Input>,
    {
        let total = inputs.len();
        let mut summary = RunSummary {
            total,
            ..RunSummary::default()
        };
        let mut accumulated: Vec<(U::Input, ResultTable)> = Vec::with_capacity(total);
        let mut remaining = inputs.into_iter();
        let mut offset = 0;

        while offset < total {
            let chunk: Vec<U::Input> = remaining.by_ref().take(self.chunk_size).collect();
            let first = offset + 1;
            let last = offset + chunk.len();
            offset = last;

            info!(first, last, total, "processing items {first}..{last} of {total}");
            progress.chunk_started(first, last, total);

            let before = accumulated.len();
            match self.policy {
                UnitFailurePolicy::Halt => {
                    let tables = try_join_all(chunk.iter().map(|input| unit.process(input)))
                        .await
                        .inspect_err(|e| error!(error = %e, first, last, "chunk failed, halting"))?;
                    accumulated.extend(chunk.into_iter().zip(tables));
                }
                UnitFailurePolicy::Isolate => {
                    let results = join_all(chunk.iter().map(|input| unit.process(input))).await;
                    for (input, result) in chunk.into_iter().zip(results) {
                        match result {
                            Ok(table) => accumulated.push((input, table)),
                            Err(error) => {
                                warn!(input = %input, error = %error, "unit failed");
                                summary.failures.push(UnitFailure {
                                    input: input.to_string(),
                                    error,
                                });
                            }
                        }
                    }
                }
            }

            sink.checkpoint(&accumulated[before..], &accumulated)?;
            summary.chunks += 1;
        }

        summary.completed = accumulated.len();
        info!(
            total,
            completed = summary.completed,
            failed = summary.failures.len(),
            "run complete"
        );
        progress.done(&summary);
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// One file per target, `<dir>/<code> <label>.csv`.
#[derive(Debug, Clone)]
pub struct TableDirSink {
    dir: PathBuf,
}

impl TableDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &TargetKey) -> PathBuf {
        self.dir.join(table_file_name(key))
    }
}

impl CheckpointSink<TargetKey> for TableDirSink {
    fn checkpoint(
        &mut self,
        chunk: &[(TargetKey, ResultTable)],
        _accumulated: &[(TargetKey, ResultTable)],
    ) -> Result<()> {
        for (key, table) in chunk {
            let path = self.path_for(key);
            table.write(&path)?;
            info!(target = %key, path = %path.display(), rows = table.row_count(), "saved table");
        }
        Ok(())
    }
}

/// One file holding every row so far, rewritten after each chunk.
#[derive(Debug, Clone)]
pub struct MergedTableSink {
    path: PathBuf,
    merged: ResultTable,
}

impl MergedTableSink {
    pub fn new(path: impl Into<PathBuf>, headers: &[&str]) -> Result<Self> {
        Ok(Self {
            path: path.into(),
            merged: ResultTable::with_headers(headers.iter().copied())?,
        })
    }

    pub fn table(&self) -> &ResultTable {
        &self.merged
    }
}

impl<I> CheckpointSink<I> for MergedTableSink {
    fn checkpoint(
        &mut self,
        chunk: &[(I, ResultTable)],
        _accumulated: &[(I, ResultTable)],
    ) -> Result<()> {
        for (_, table) in chunk {
            self.merged.append(table)?;
        }
        self.merged.write(&self.path)?;
        info!(
            path = %self.path.display(),
            rows = self.merged.row_count(),
            "saved merged table"
        );
        Ok(())
    }
}
