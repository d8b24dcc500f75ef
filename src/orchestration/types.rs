//! # Orchestration Types
//!
//! Options, outcome records and state snapshots shared between the runner, the
//! validator and callers.

use serde::{Deserialize, Serialize};

use crate::error::JobExecutionError;
use crate::job::JobResult;
use crate::state_machine::RunnerStatus;

/// Default number of jobs per batch
pub const DEFAULT_BATCH_SIZE: usize = 1;

/// Default number of batches in flight
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Runner construction options. Absent fields fall back to the defaults.
///
/// Values are signed so that out-of-range input reaches the validator instead
/// of failing to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRunnerOptions {
    pub batch_size: Option<i64>,
    pub concurrency: Option<i64>,
}

impl BatchRunnerOptions {
    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_concurrency(mut self, concurrency: i64) -> Self {
        self.concurrency = Some(concurrency);
        self
    }
}

/// Outcome of a job whose work function resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename = "success")]
pub struct SuccessJobResult<T> {
    pub id: String,
    pub result: T,
}

/// Outcome of a job whose work function failed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename = "failure")]
pub struct FailureJobResult {
    pub id: String,
    pub error: JobExecutionError,
}

/// A settled job outcome routed to one of the runner's result collections
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SettledOutcome<T> {
    Success(SuccessJobResult<T>),
    Failure(FailureJobResult),
}

impl<T> SettledOutcome<T> {
    /// Returns `None` for projections that are not terminal outcomes
    pub(crate) fn from_job_result(result: JobResult<T>) -> Option<Self> {
        match result {
            JobResult::Success { id, result } => Some(Self::Success(SuccessJobResult { id, result })),
            JobResult::Failure { id, error } => Some(Self::Failure(FailureJobResult { id, error })),
            JobResult::Idle { .. } | JobResult::Running { .. } | JobResult::Cancelled { .. } => None,
        }
    }
}

/// Snapshot of the runner's status and accumulated outcomes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunnerState<T> {
    pub status: RunnerStatus,
    pub processed_jobs: Vec<SuccessJobResult<T>>,
    pub failed_jobs: Vec<FailureJobResult>,
}

impl<T> RunnerState<T> {
    /// Number of jobs with a recorded terminal outcome
    pub fn outcome_count(&self) -> usize {
        self.processed_jobs.len() + self.failed_jobs.len()
    }
}

/// Observer invoked once when the runner enters `stopped`
pub type StoppedCallback<T> = Box<dyn FnOnce(RunnerState<T>) + Send>;
