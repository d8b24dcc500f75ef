//! # Jobs
//!
//! A [`Job`] wraps one asynchronous unit of work together with its lifecycle
//! status and settled outcome. Jobs are built through [`Job::create`], which
//! validates [`JobOptions`] and assigns a random UUID when no id is supplied.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::debug;
use uuid::Uuid;

use crate::error::{BatchRunnerError, JobExecutionError, Result};
use crate::state_machine::{determine_job_target, JobEvent, JobStatus};
use crate::validation::validate_job_options;

/// Future produced by a work function
pub type JobFuture<T> = BoxFuture<'static, anyhow::Result<T>>;

/// Zero-argument work function, invoked exactly once
pub type JobFn<T> = Box<dyn FnOnce() -> JobFuture<T> + Send>;

/// Options accepted by [`Job::create`]
pub struct JobOptions<T> {
    id: Option<String>,
    job_fn: Option<JobFn<T>>,
}

impl<T> Default for JobOptions<T> {
    fn default() -> Self {
        Self {
            id: None,
            job_fn: None,
        }
    }
}

impl<T> JobOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an explicit job id
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the work function
    pub fn job_fn<F, Fut>(mut self, job_fn: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.job_fn = Some(Box::new(move || job_fn().boxed()));
        self
    }
}

/// Tagged projection of a job's current state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobResult<T> {
    Idle { id: String },
    Running { id: String },
    Success { id: String, result: T },
    Failure { id: String, error: JobExecutionError },
    Cancelled { id: String },
}

impl<T> JobResult<T> {
    pub fn id(&self) -> &str {
        match self {
            Self::Idle { id }
            | Self::Running { id }
            | Self::Success { id, .. }
            | Self::Failure { id, .. }
            | Self::Cancelled { id } => id,
        }
    }

    pub fn status(&self) -> JobStatus {
        match self {
            Self::Idle { .. } => JobStatus::Idle,
            Self::Running { .. } => JobStatus::Running,
            Self::Success { .. } => JobStatus::Success,
            Self::Failure { .. } => JobStatus::Failure,
            Self::Cancelled { .. } => JobStatus::Cancelled,
        }
    }
}

/// One unit of asynchronous work with an identity and a terminal outcome
pub struct Job<T> {
    id: String,
    job_fn: Option<JobFn<T>>,
    status: JobStatus,
    outcome: Option<std::result::Result<T, JobExecutionError>>,
}

impl<T> fmt::Debug for Job<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<T> Job<T>
where
    T: Clone + Send + 'static,
{
    /// Validate options and build an idle job
    pub fn create(options: JobOptions<T>) -> Result<Self> {
        validate_job_options(options.id.as_deref(), options.job_fn.is_some())
            .map_err(BatchRunnerError::from)?;

        let JobOptions { id, job_fn } = options;
        Ok(Self {
            id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            job_fn,
            status: JobStatus::Idle,
            outcome: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Invoke the work function and settle the job.
    ///
    /// Errors and panics from the work function are captured as the job's
    /// failure outcome and returned as a value. A job runs at most once; a
    /// second call returns an error and leaves the settled outcome untouched.
    pub async fn run(&mut self) -> std::result::Result<T, JobExecutionError> {
        let job_fn = match (determine_job_target(self.status, &JobEvent::Start), self.job_fn.take()) {
            (Ok(running), Some(job_fn)) => {
                self.status = running;
                job_fn
            }
            _ => {
                return Err(JobExecutionError::new(format!(
                    "job '{}' cannot run from '{}' status",
                    self.id, self.status
                )))
            }
        };

        debug!(job_id = %self.id, "JOB: Running work function");

        let work = async move { job_fn().await };
        let settled = match AssertUnwindSafe(work).catch_unwind().await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(JobExecutionError::from(err)),
            Err(payload) => Err(JobExecutionError::from_panic(payload.as_ref())),
        };

        let event = match &settled {
            Ok(_) => JobEvent::Succeed,
            Err(err) => JobEvent::Fail(err.message.clone()),
        };
        // Running always accepts Succeed/Fail
        if let Ok(target) = determine_job_target(self.status, &event) {
            self.status = target;
        }
        self.outcome = Some(settled.clone());

        debug!(
            job_id = %self.id,
            status = %self.status,
            error = event.error_message(),
            "JOB: Settled"
        );

        settled
    }

    /// Project the current state without side effects
    pub fn get_result(&self) -> JobResult<T> {
        let id = self.id.clone();
        match (self.status, &self.outcome) {
            (JobStatus::Idle, _) => JobResult::Idle { id },
            (JobStatus::Running, _) => JobResult::Running { id },
            (JobStatus::Cancelled, _) => JobResult::Cancelled { id },
            (JobStatus::Success, Some(Ok(result))) => JobResult::Success {
                id,
                result: result.clone(),
            },
            (JobStatus::Failure, Some(Err(error))) => JobResult::Failure {
                id,
                error: error.clone(),
            },
            (status, _) => JobResult::Failure {
                id,
                error: JobExecutionError::new(format!(
                    "unhandled status and outcome combination: {status}"
                )),
            },
        }
    }
}
