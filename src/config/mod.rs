//! Configuration module for Stockcast.
//!
//! Structured configuration loading from environment variables, organized by
//! concern: model artifacts and observability.

mod model_config;
mod observability_config;

pub use model_config::{
    ClassifierBackend, DEFAULT_CLASSIFIER_WEIGHTS_PATH, DEFAULT_ENCODER_MODEL_PATH,
    ModelEnvConfig,
};
pub use observability_config::ObservabilityEnvConfig;

use anyhow::{Context, Result};

/// Main application configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub model: ModelEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let model = ModelEnvConfig::from_env().context("Failed to load model config")?;
        let observability = ObservabilityEnvConfig::from_env();

        Ok(Self {
            model,
            observability,
        })
    }
}
