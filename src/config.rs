//! Runner configuration
//!
//! Layers defaults, an optional TOML file and `BATCH_RUNNER_*` environment
//! variables, then runs the option validator over the result.

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::error::ValidationError;
use crate::orchestration::types::{BatchRunnerOptions, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY};
use crate::validation::validate_runner_options;

/// Prefix for environment overrides, e.g. `BATCH_RUNNER_BATCH_SIZE`
pub const ENV_PREFIX: &str = "BATCH_RUNNER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub batch_size: i64,
    pub concurrency: i64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE as i64,
            concurrency: DEFAULT_CONCURRENCY as i64,
        }
    }
}

impl RunnerConfig {
    /// Load from an optional TOML file plus environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            debug!(path = %path.display(), "CONFIG: Reading runner configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        let config: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_runner_options(&self.into_options())
    }

    pub fn into_options(self) -> BatchRunnerOptions {
        BatchRunnerOptions {
            batch_size: Some(self.batch_size),
            concurrency: Some(self.concurrency),
        }
    }
}
