//! # Batch Runner
//!
//! Owns the job queue, partitions it into ordered batches at `start`, runs the
//! batches through the [`ConcurrencyLimiter`], and aggregates per-job outcomes
//! as they settle.
//!
//! ## State machine
//!
//! ```text
//! idle --start--> running --(queue drained | stop)--> stopped
//! idle --start (empty queue)--> stopped
//! ```
//!
//! A runner is single-use: nothing leaves `stopped`. Jobs and configuration can
//! only change while `idle`.
//!
//! ## Concurrency
//!
//! All mutable runner state lives in one struct behind a mutex. Public methods
//! and the dispatch tasks lock it for short, non-async critical sections; the
//! stopped-callback is always invoked after the lock is released, so it may
//! call back into the runner.
//!
//! Stopping is cooperative: batches that have not started never start, while
//! batches already in flight finish and their outcomes are still recorded.

use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::concurrency_limiter::{ConcurrencyLimiter, StopSignal};
use super::types::{
    BatchRunnerOptions, FailureJobResult, RunnerState, SettledOutcome, StoppedCallback,
    SuccessJobResult, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY,
};
use crate::config::RunnerConfig;
use crate::error::{BatchRunnerError, Result, ValidationError};
use crate::job::{Job, JobResult};
use crate::logging::{log_error, log_job_outcome, log_runner_transition};
use crate::state_machine::{determine_runner_target, JobStatus, RunnerEvent, RunnerStatus};
use crate::validation::{validate_batch_size, validate_concurrency};

/// Mutable runner state, only ever touched under `Shared::inner`
struct RunnerInner<T> {
    batch_size: usize,
    concurrency: usize,
    status: RunnerStatus,
    job_queue: Vec<Job<T>>,
    /// Size of the queue snapshot taken at `start`
    submitted: usize,
    processed_jobs: Vec<SuccessJobResult<T>>,
    failed_jobs: Vec<FailureJobResult>,
    on_stopped: Option<StoppedCallback<T>>,
}

impl<T: Clone> RunnerInner<T> {
    fn snapshot(&self) -> RunnerState<T> {
        RunnerState {
            status: self.status,
            processed_jobs: self.processed_jobs.clone(),
            failed_jobs: self.failed_jobs.clone(),
        }
    }

    fn require_idle(&self, operation: &'static str) -> Result<()> {
        if self.status.accepts_mutation() {
            Ok(())
        } else {
            Err(BatchRunnerError::not_idle(operation, self.status))
        }
    }

    fn outcome_count(&self) -> usize {
        self.processed_jobs.len() + self.failed_jobs.len()
    }

    /// Apply a transition into `stopped`, taking the callback and the snapshot
    /// atomically with the status change
    fn enter_stopped(&mut self, event: RunnerEvent) -> Option<StopNotice<T>> {
        let from = self.status;
        let to = determine_runner_target(from, event).ok()?;
        self.status = to;

        log_runner_transition(
            from,
            to,
            event.event_type(),
            self.processed_jobs.len(),
            self.failed_jobs.len(),
        );

        Some(StopNotice {
            from,
            callback: self.on_stopped.take(),
            snapshot: self.snapshot(),
        })
    }
}

/// Everything needed to announce a stop once the lock is released
struct StopNotice<T> {
    from: RunnerStatus,
    callback: Option<StoppedCallback<T>>,
    snapshot: RunnerState<T>,
}

struct Shared<T> {
    inner: Mutex<RunnerInner<T>>,
    stop_signal: StopSignal,
    status_tx: watch::Sender<RunnerStatus>,
    drained_tx: watch::Sender<bool>,
}

impl<T: Clone> Shared<T> {
    fn announce_stop(&self, notice: StopNotice<T>) {
        self.stop_signal.request_stop();
        self.status_tx.send_replace(notice.snapshot.status);
        if notice.from == RunnerStatus::Idle {
            // Nothing was ever dispatched
            self.drained_tx.send_replace(true);
        }
        if let Some(callback) = notice.callback {
            callback(notice.snapshot);
        }
    }
}

/// Bounded-concurrency, run-once batch job runner.
///
/// Cloning yields another handle to the same runner.
pub struct BatchRunner<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for BatchRunner<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> std::fmt::Debug for BatchRunner<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("BatchRunner")
            .field("status", &inner.status)
            .field("batch_size", &inner.batch_size)
            .field("concurrency", &inner.concurrency)
            .field("queued", &inner.job_queue.len())
            .finish()
    }
}

impl<T> BatchRunner<T>
where
    T: Clone + Send + 'static,
{
    /// Validate options and build an idle runner
    pub fn create(options: BatchRunnerOptions) -> Result<Self> {
        let batch_size = options
            .batch_size
            .map_or(Ok(DEFAULT_BATCH_SIZE), validate_batch_size)?;
        let concurrency = options
            .concurrency
            .map_or(Ok(DEFAULT_CONCURRENCY), validate_concurrency)?;

        let (status_tx, _) = watch::channel(RunnerStatus::Idle);
        let (drained_tx, _) = watch::channel(false);

        debug!(batch_size, concurrency, "RUNNER: Created");

        Ok(Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(RunnerInner {
                    batch_size,
                    concurrency,
                    status: RunnerStatus::Idle,
                    job_queue: Vec::new(),
                    submitted: 0,
                    processed_jobs: Vec::new(),
                    failed_jobs: Vec::new(),
                    on_stopped: None,
                }),
                stop_signal: StopSignal::new(),
                status_tx,
                drained_tx,
            }),
        })
    }

    /// Build a runner from loaded configuration
    pub fn from_config(config: &RunnerConfig) -> Result<Self> {
        Self::create(config.into_options())
    }

    /// Current status plus the outcomes recorded so far
    pub fn get_batch_runner_state(&self) -> RunnerState<T> {
        self.shared.inner.lock().snapshot()
    }

    pub fn status(&self) -> RunnerStatus {
        self.shared.inner.lock().status
    }

    pub fn batch_size(&self) -> usize {
        self.shared.inner.lock().batch_size
    }

    pub fn concurrency(&self) -> usize {
        self.shared.inner.lock().concurrency
    }

    /// Queue length while idle; the start-time snapshot size afterwards
    pub fn get_jobs_count(&self) -> usize {
        let inner = self.shared.inner.lock();
        // The queue is moved out at start, so at most one term is non-zero
        inner.job_queue.len() + inner.submitted
    }

    pub fn update_batch_size(&self, batch_size: i64) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        inner.require_idle("update 'batch_size'")?;
        inner.batch_size = validate_batch_size(batch_size)?;
        Ok(())
    }

    pub fn update_concurrency(&self, concurrency: i64) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        inner.require_idle("update 'concurrency'")?;
        inner.concurrency = validate_concurrency(concurrency)?;
        Ok(())
    }

    /// Append a job to the tail of the queue, returning its idle projection
    pub fn add_job(&self, job: Job<T>) -> Result<JobResult<T>> {
        let mut inner = self.shared.inner.lock();
        inner.require_idle("add job")?;

        if inner.job_queue.iter().any(|queued| queued.id() == job.id()) {
            return Err(ValidationError::new(
                "id",
                job.id(),
                "must be unique within the runner",
            )
            .into());
        }

        let projection = job.get_result();
        inner.job_queue.push(job);
        Ok(projection)
    }

    /// Append several jobs, one result per job in submission order
    pub fn add_jobs(&self, jobs: impl IntoIterator<Item = Job<T>>) -> Vec<Result<JobResult<T>>> {
        jobs.into_iter().map(|job| self.add_job(job)).collect()
    }

    pub fn clear_jobs(&self) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        inner.require_idle("clear job queue")?;
        inner.job_queue.clear();
        Ok(())
    }

    /// Leave `idle` and begin dispatching.
    ///
    /// With an empty queue the runner stops immediately and the stopped-callback
    /// fires before this returns. Otherwise batches are dispatched on the
    /// current Tokio runtime and `running` is returned.
    #[instrument(skip(self))]
    pub fn start(&self) -> Result<RunnerStatus> {
        let mut inner = self.shared.inner.lock();
        inner.require_idle("start")?;

        if inner.job_queue.is_empty() {
            let notice = inner.enter_stopped(RunnerEvent::StartEmpty);
            drop(inner);

            info!("🛑 RUNNER: Started with an empty queue, stopping immediately");
            if let Some(notice) = notice {
                self.shared.announce_stop(notice);
            }
            return Ok(RunnerStatus::Stopped);
        }

        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| BatchRunnerError::Runtime(e.to_string()))?;

        let running = determine_runner_target(inner.status, RunnerEvent::Start)
            .map_err(|_| BatchRunnerError::not_idle("start", inner.status))?;
        inner.status = running;

        let jobs = std::mem::take(&mut inner.job_queue);
        inner.submitted = jobs.len();
        let batch_size = inner.batch_size;
        let concurrency = inner.concurrency;
        log_runner_transition(
            RunnerStatus::Idle,
            running,
            RunnerEvent::Start.event_type(),
            0,
            0,
        );
        drop(inner);

        self.shared.status_tx.send_replace(running);

        info!(
            jobs = jobs.len(),
            batch_size, concurrency, "🚀 RUNNER: Starting batch dispatch"
        );

        let shared = self.shared.clone();
        handle.spawn(Self::dispatch(shared, jobs, batch_size, concurrency));

        Ok(running)
    }

    /// Partition the snapshot and run it through the limiter
    async fn dispatch(
        shared: Arc<Shared<T>>,
        jobs: Vec<Job<T>>,
        batch_size: usize,
        concurrency: usize,
    ) {
        let batches = partition_into_batches(jobs, batch_size);
        let limiter = ConcurrencyLimiter::new(concurrency, shared.stop_signal.clone());

        let report = limiter
            .run(batches, |index, batch| Self::execute_batch(shared.clone(), index, batch))
            .await;

        if report.was_cut_short() {
            info!(
                dispatched = report.dispatched,
                total_batches = report.total,
                "🛑 RUNNER: Dispatch stopped early, in-flight batches drained"
            );
        }

        shared.drained_tx.send_replace(true);
    }

    /// Run every job of a batch concurrently, recording each outcome as it settles
    async fn execute_batch(shared: Arc<Shared<T>>, index: usize, batch: Vec<Job<T>>) {
        debug!(batch = index, jobs = batch.len(), "RUNNER: Executing batch");

        join_all(batch.into_iter().map(|mut job| {
            let shared = shared.clone();
            async move {
                // Failures are captured in the job's own outcome
                let _ = job.run().await;
                Self::record_outcome(&shared, job.get_result());
            }
        }))
        .await;
    }

    fn record_outcome(shared: &Shared<T>, result: JobResult<T>) {
        let status = result.status();
        let job_id = result.id().to_string();

        let Some(outcome) = SettledOutcome::from_job_result(result) else {
            log_error(
                "runner",
                "record_outcome",
                &format!("job '{job_id}' reported non-terminal status '{status}'"),
                None,
            );
            return;
        };

        let mut inner = shared.inner.lock();
        match outcome {
            SettledOutcome::Success(success) => {
                log_job_outcome(&success.id, JobStatus::Success, None);
                inner.processed_jobs.push(success);
            }
            SettledOutcome::Failure(failure) => {
                log_job_outcome(
                    &failure.id,
                    JobStatus::Failure,
                    Some(&failure.error.message),
                );
                inner.failed_jobs.push(failure);
            }
        }

        let all_settled = inner.outcome_count() == inner.submitted;
        let notice = if inner.status == RunnerStatus::Running && all_settled {
            inner.enter_stopped(RunnerEvent::Drained)
        } else {
            None
        };
        drop(inner);

        if let Some(notice) = notice {
            info!("✅ RUNNER: All jobs settled");
            shared.announce_stop(notice);
        }
    }

    /// Stop the runner. Batches not yet started never start; in-flight batches
    /// finish and are still recorded. Calling again is a no-op.
    pub fn stop(&self) -> RunnerState<T> {
        let mut inner = self.shared.inner.lock();
        if inner.status.is_terminal() {
            return inner.snapshot();
        }

        let notice = inner.enter_stopped(RunnerEvent::Stop);
        drop(inner);

        match notice {
            Some(notice) => {
                info!(from = %notice.from, "🛑 RUNNER: Stop requested");
                let snapshot = notice.snapshot.clone();
                self.shared.announce_stop(notice);
                snapshot
            }
            None => {
                warn!("RUNNER: Stop transition rejected");
                self.get_batch_runner_state()
            }
        }
    }

    /// Alias of [`BatchRunner::stop`]
    pub fn shutdown(&self) -> RunnerState<T> {
        self.stop()
    }

    /// Not supported yet
    pub fn pause(&self) -> Result<()> {
        Err(BatchRunnerError::UnsupportedOperation("pause"))
    }

    /// Not supported yet
    pub fn resume(&self) -> Result<()> {
        Err(BatchRunnerError::UnsupportedOperation("resume"))
    }

    /// Register the observer fired once on entering `stopped`. Replaces any
    /// previously registered callback.
    pub fn on_stopped(&self, callback: impl FnOnce(RunnerState<T>) + Send + 'static) {
        self.shared.inner.lock().on_stopped = Some(Box::new(callback));
    }

    /// Resolves with the current state once the runner is `stopped`
    pub async fn wait_for_stop(&self) -> RunnerState<T> {
        let mut rx = self.shared.status_tx.subscribe();
        let _ = rx.wait_for(|status| status.is_terminal()).await;
        self.get_batch_runner_state()
    }

    /// Resolves with the current state once every dispatched batch has settled.
    ///
    /// Never resolves for a runner that is neither started nor stopped.
    pub async fn wait_for_drain(&self) -> RunnerState<T> {
        let mut rx = self.shared.drained_tx.subscribe();
        let _ = rx.wait_for(|drained| *drained).await;
        self.get_batch_runner_state()
    }
}

/// Split jobs into contiguous, order-preserving batches of at most `batch_size`
pub(crate) fn partition_into_batches<J>(jobs: Vec<J>, batch_size: usize) -> Vec<Vec<J>> {
    let batch_size = batch_size.max(1);
    let mut batches = Vec::with_capacity(jobs.len().div_ceil(batch_size));
    let mut remaining = jobs.into_iter().peekable();

    while remaining.peek().is_some() {
        batches.push(remaining.by_ref().take(batch_size).collect());
    }

    batches
}
