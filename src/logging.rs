//! # Structured Logging Module
//!
//! Environment-aware structured logging for runner lifecycle transitions and
//! per-job outcomes.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::state_machine::{JobStatus, RunnerStatus};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// `RUST_LOG` overrides the environment-derived level. Setting
/// `BATCH_RUNNER_LOG_FORMAT=json` switches the console output to JSON.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let layer = if json_output_requested() {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // Use try_init to avoid panic if global subscriber already set
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("BATCH_RUNNER_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

fn json_output_requested() -> bool {
    std::env::var("BATCH_RUNNER_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log a runner status transition with its outcome counters
pub fn log_runner_transition(
    from: RunnerStatus,
    to: RunnerStatus,
    event: &str,
    processed: usize,
    failed: usize,
) {
    tracing::info!(
        from = %from,
        to = %to,
        event = %event,
        processed = processed,
        failed = failed,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 RUNNER_TRANSITION"
    );
}

/// Log a settled job outcome
pub fn log_job_outcome(job_id: &str, status: JobStatus, error: Option<&str>) {
    tracing::debug!(
        job_id = %job_id,
        status = %status,
        error = error,
        timestamp = %Utc::now().to_rfc3339(),
        "🔧 JOB_OUTCOME"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
