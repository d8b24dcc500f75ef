#![allow(clippy::doc_markdown)] // Allow technical terms like Tokio in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Batch Runner
//!
//! Bounded-concurrency, run-once batch job runner.
//!
//! ## Overview
//!
//! A [`BatchRunner`] accepts a queue of independent asynchronous [`Job`]s while
//! idle. On `start` the queue is partitioned into ordered batches of
//! `batch_size` jobs, and at most `concurrency` batches execute at once. Jobs
//! within a batch run concurrently. Every job settles exactly once into either
//! the processed or the failed collection, and partial progress is never
//! discarded, including after an explicit stop.
//!
//! ## Module Organization
//!
//! - [`job`] - jobs, job options and result projections
//! - [`orchestration`] - the runner and the concurrency limiter
//! - [`state_machine`] - job and runner statuses and their transitions
//! - [`validation`] - option validation
//! - [`config`] - file and environment configuration
//! - [`error`] - structured error handling
//! - [`logging`] - structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use batch_runner::{BatchRunner, BatchRunnerOptions, Job, JobOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runner = BatchRunner::<String>::create(
//!     BatchRunnerOptions::default().with_batch_size(2).with_concurrency(2),
//! )?;
//!
//! for i in 1..=4 {
//!     let job = Job::create(
//!         JobOptions::new()
//!             .id(i.to_string())
//!             .job_fn(move || async move { Ok(format!("done {i}")) }),
//!     )?;
//!     runner.add_job(job)?;
//! }
//!
//! runner.start()?;
//! let state = runner.wait_for_stop().await;
//! println!("{} succeeded, {} failed", state.processed_jobs.len(), state.failed_jobs.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`BatchRunnerError`] values; nothing panics across
//! the public API. A failing or panicking work function only marks its own job
//! as failed.

pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod orchestration;
pub mod state_machine;
pub mod validation;

pub use config::{ConfigError, RunnerConfig};
pub use error::{BatchRunnerError, JobExecutionError, Result, ValidationError};
pub use job::{Job, JobFn, JobOptions, JobResult};
pub use orchestration::{
    BatchRunner, BatchRunnerOptions, FailureJobResult, RunnerState, SuccessJobResult,
};
pub use state_machine::{JobStatus, RunnerStatus};
