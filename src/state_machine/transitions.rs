use super::{
    errors::{StateMachineError, StateMachineResult},
    events::{JobEvent, RunnerEvent},
    states::{JobStatus, RunnerStatus},
};

/// Determine the runner's target state for an event.
///
/// ```text
/// idle --start--> running --(drained | stop)--> stopped
/// idle --start_empty--> stopped
/// idle --stop--> stopped
/// ```
pub fn determine_runner_target(
    current: RunnerStatus,
    event: RunnerEvent,
) -> StateMachineResult<RunnerStatus> {
    let target = match (current, event) {
        (RunnerStatus::Idle, RunnerEvent::Start) => RunnerStatus::Running,
        (RunnerStatus::Idle, RunnerEvent::StartEmpty) => RunnerStatus::Stopped,
        (RunnerStatus::Running, RunnerEvent::Drained) => RunnerStatus::Stopped,
        (RunnerStatus::Idle | RunnerStatus::Running, RunnerEvent::Stop) => RunnerStatus::Stopped,

        (from, event) => {
            return Err(StateMachineError::InvalidTransition {
                from: from.to_string(),
                event: event.event_type(),
            })
        }
    };

    Ok(target)
}

/// Determine a job's target state for an event. Transitions are monotonic and
/// each terminal state is reachable exactly once.
pub fn determine_job_target(current: JobStatus, event: &JobEvent) -> StateMachineResult<JobStatus> {
    let target = match (current, event) {
        (JobStatus::Idle, JobEvent::Start) => JobStatus::Running,
        (JobStatus::Running, JobEvent::Succeed) => JobStatus::Success,
        (JobStatus::Running, JobEvent::Fail(_)) => JobStatus::Failure,

        (from, event) => {
            return Err(StateMachineError::InvalidTransition {
                from: from.to_string(),
                event: event.event_type(),
            })
        }
    };

    Ok(target)
}
