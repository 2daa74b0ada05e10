//! Pipeline orchestration and domain logic for dbbuilder.
//!
//! This crate ties the generative and search capabilities together into the
//! work units (parameter tables, manufacturer search, URL finders) and runs
//! them through the chunked [`Scheduler`] with a checkpoint after every chunk.

pub mod generator;
pub mod judgement;
pub mod pipeline;
pub mod prompts;
pub mod scheduler;
pub mod toolkit;
pub mod units;

#[cfg(test)]
mod testing;

pub use generator::{Generated, QuantityGenerator};
pub use judgement::{
    CandidateFailure, Extractor, Judge, JudgementOutcome, JudgementPipeline, Stage, Verdict,
    dedupe_candidates, parse_verdict,
};
pub use pipeline::{
    run_manufacturer_search, run_parameter_tables, run_product_page_finder, run_website_finder,
};
pub use scheduler::{
    CheckpointSink, MergedTableSink, ProgressReporter, RunSummary, Scheduler, SilentProgress,
    TableDirSink, UnitFailure, WorkUnit,
};
pub use toolkit::Toolkit;
