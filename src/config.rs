//! Run configuration
//!
//! Every knob of a pipeline run lives in [`PipelineConfig`] and is passed
//! explicitly; there is no process-wide state. Missing fields in a config
//! file fall back to their defaults.

use crate::derive::UndefinedPolicy;
use crate::error::ConfigError;
use crate::report::EvaluationMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Settings for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Whether a failing metric aborts the run
    #[serde(default)]
    pub mode: EvaluationMode,

    /// Size of every top-N ranking
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Bin count of distribution metrics
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,

    /// Zero-denominator handling of derived ratio columns
    #[serde(default)]
    pub ratio_policy: UndefinedPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: EvaluationMode::default(),
            top_n: default_top_n(),
            histogram_bins: default_histogram_bins(),
            ratio_policy: UndefinedPolicy::default(),
        }
    }
}

fn default_top_n() -> usize {
    10
}

fn default_histogram_bins() -> usize {
    50
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be at least 1".to_string()));
        }
        if self.histogram_bins == 0 {
            return Err(ConfigError::Invalid(
                "histogram_bins must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
