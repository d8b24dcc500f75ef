//! # Orchestration Engine
//!
//! Batch scheduling for queued jobs.
//!
//! ## Core Components
//!
//! - **BatchRunner**: owns the job queue and the runner state machine, partitions
//!   the queue into batches at start and aggregates per-job outcomes
//! - **ConcurrencyLimiter**: keeps at most `concurrency` batches in flight and
//!   honours a cooperative stop signal
//! - **Types**: construction options, outcome records and state snapshots

pub mod batch_runner;
pub mod concurrency_limiter;
pub mod types;

pub use batch_runner::BatchRunner;
pub use concurrency_limiter::{ConcurrencyLimiter, DispatchReport, StopSignal};
pub use types::{
    BatchRunnerOptions, FailureJobResult, RunnerState, StoppedCallback, SuccessJobResult,
    DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY,
};
