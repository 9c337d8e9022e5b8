#![deny(unreachable_patterns)]
//! Retention-editing pipeline worker.
//!
//! This crate provides:
//! - The nine-step pipeline orchestrator (transcribe, analyze, score, hook,
//!   reorder, pace, gate, render, retention-score)
//! - The job executor loop consuming `vclip-queue`'s durable streams
//! - Structured job logging and retry helpers shared across stages
//! - Graceful shutdown and stale-job recovery

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod pipeline;
pub mod retry;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use pipeline::{PipelineContext, RenderExecutor, RenderOutcome};
