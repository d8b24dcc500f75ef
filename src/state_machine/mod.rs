// State machine module for job and runner lifecycles
//
// Statuses, the events that move them, and the transition tables that both the
// job and the runner consult before mutating their status.

pub mod errors;
pub mod events;
pub mod states;
pub mod transitions;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::{JobEvent, RunnerEvent};
pub use states::{JobStatus, RunnerStatus};
pub use transitions::{determine_job_target, determine_runner_target};
