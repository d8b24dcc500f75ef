use thiserror::Error;

/// Raised when an event does not apply to the current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineError {
    #[error("invalid transition from '{from}' on event '{event}'")]
    InvalidTransition { from: String, event: &'static str },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
