//! # Error Taxonomy
//!
//! Every fallible public operation returns one of these as a value. Work
//! function failures never cross the public boundary: they are captured per job
//! as [`JobExecutionError`] and recorded in the runner's failed outcomes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state_machine::RunnerStatus;

/// Malformed construction or update options.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("'{field}' {constraint}, received {received}")]
pub struct ValidationError {
    /// Name of the offending option field
    pub field: String,
    /// Rendered value that was rejected
    pub received: String,
    /// The constraint the value violated
    pub constraint: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        received: impl ToString,
        constraint: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            received: received.to_string(),
            constraint: constraint.into(),
        }
    }
}

/// Failure produced by a job's work function.
///
/// Compared by message so recorded outcomes can be matched against expected ones.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct JobExecutionError {
    pub message: String,
}

impl JobExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build an error from a caught panic payload
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::new(format!("job panicked: {detail}"))
    }
}

impl From<anyhow::Error> for JobExecutionError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Errors returned by runner and job factory operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchRunnerError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("cannot {operation} when runner is not in '{required}' status (current: '{current}')")]
    InvalidState {
        operation: &'static str,
        required: RunnerStatus,
        current: RunnerStatus,
    },

    #[error("operation '{0}' is not supported yet")]
    UnsupportedOperation(&'static str),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl BatchRunnerError {
    pub(crate) fn not_idle(operation: &'static str, current: RunnerStatus) -> Self {
        Self::InvalidState {
            operation,
            required: RunnerStatus::Idle,
            current,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}

pub type Result<T> = std::result::Result<T, BatchRunnerError>;
