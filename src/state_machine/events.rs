use serde::{Deserialize, Serialize};

/// Events that can trigger runner state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RunnerEvent {
    /// `start` called with a non-empty queue
    Start,
    /// `start` called with nothing queued
    StartEmpty,
    /// Every job in the start-time snapshot has a terminal outcome
    Drained,
    /// Explicit `stop` / `shutdown`
    Stop,
}

impl RunnerEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::StartEmpty => "start_empty",
            Self::Drained => "drained",
            Self::Stop => "stop",
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::StartEmpty | Self::Drained | Self::Stop)
    }
}

/// Events that can trigger job state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum JobEvent {
    /// Work function invoked
    Start,
    /// Work function resolved
    Succeed,
    /// Work function failed with the given message
    Fail(String),
}

impl JobEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Succeed => "succeed",
            Self::Fail(_) => "fail",
        }
    }

    /// Extract error message if this is a failure event
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Fail(msg) => Some(msg),
            _ => None,
        }
    }
}
