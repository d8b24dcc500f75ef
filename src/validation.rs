//! Option validation for runners and jobs
//!
//! Every mutation entry point that accepts options (`BatchRunner::create`,
//! `update_batch_size`, `update_concurrency`, `Job::create`) runs through these
//! functions before touching any state.

use crate::error::ValidationError;
use crate::orchestration::types::BatchRunnerOptions;

/// Smallest accepted batch size / concurrency
pub const MIN_OPTION_VALUE: i64 = 1;

/// Largest accepted batch size / concurrency
pub const MAX_OPTION_VALUE: i64 = 1000;

const RANGE_CONSTRAINT: &str = "must be between 1-1000 inclusive";

/// Validates a positive integer option in `[1, 1000]`
fn validate_bounded(field: &str, value: i64) -> Result<usize, ValidationError> {
    if (MIN_OPTION_VALUE..=MAX_OPTION_VALUE).contains(&value) {
        // Bounded above by 1000, so the conversion cannot truncate
        Ok(value as usize)
    } else {
        Err(ValidationError::new(field, value, RANGE_CONSTRAINT))
    }
}

pub fn validate_batch_size(batch_size: i64) -> Result<usize, ValidationError> {
    validate_bounded("batch_size", batch_size)
}

pub fn validate_concurrency(concurrency: i64) -> Result<usize, ValidationError> {
    validate_bounded("concurrency", concurrency)
}

/// Validates runner construction options, reporting the first offending field
pub fn validate_runner_options(options: &BatchRunnerOptions) -> Result<(), ValidationError> {
    if let Some(batch_size) = options.batch_size {
        validate_batch_size(batch_size)?;
    }
    if let Some(concurrency) = options.concurrency {
        validate_concurrency(concurrency)?;
    }
    Ok(())
}

/// Validates job construction options.
///
/// The id is optional but must not be empty when given; the work function is required.
pub fn validate_job_options(id: Option<&str>, has_job_fn: bool) -> Result<(), ValidationError> {
    if let Some(id) = id {
        if id.is_empty() {
            return Err(ValidationError::new("id", "\"\"", "must not be empty"));
        }
    }

    if !has_job_fn {
        return Err(ValidationError::new("job_fn", "nothing", "is required"));
    }

    Ok(())
}
