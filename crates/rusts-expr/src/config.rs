//! Evaluator configuration
//!
//! Loaded from TOML, either standalone or embedded in a larger service
//! config:
//!
//! ```toml
//! [parallel]
//! series_threshold = 8
//! thread_pool_size = 4
//! ```

use crate::error::{ConfigError, EvalError};
use crate::evaluator::Evaluator;
use rusts_core::ParallelConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Expression engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExprConfig {
    /// Parallel series evaluation
    pub parallel: ParallelConfig,
}

impl ExprConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        debug!("Loaded expression config from {:?}", path);
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel.series_threshold == 0 {
            return Err(ConfigError::Invalid(
                "parallel.series_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Build an evaluator from this configuration
    pub fn build_evaluator(&self) -> Result<Evaluator, EvalError> {
        Evaluator::with_config(self.parallel.clone())
    }
}
