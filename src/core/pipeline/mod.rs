//! # Pipeline Module
//!
//! Orchestrates a whole run.
//!
//! ## Pipeline Stages
//! 1. **Mirror** - Walk the source, create destination directories, collect tasks
//! 2. **Blur** - Run every task once on a bounded worker pool
//! 3. **Summarise** - Fold the per-task reports into a summary
//!
//! A single source file skips stage 1 and is processed straight into the
//! destination path.
//!
//! ## Parallelism
//! Uses a dedicated rayon pool sized at construction time: the configured
//! worker count, else the number of available CPUs, else 2.

mod cancel;
mod executor;

pub use cancel::CancellationToken;
pub use executor::{
    resolve_workers, Pipeline, PipelineBuilder, PipelineConfig, PipelineResult, FALLBACK_WORKERS,
};
