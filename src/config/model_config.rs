//! Model artifact configuration parsing from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_ENCODER_MODEL_PATH: &str = "models/sentence_encoder.onnx";
pub const DEFAULT_CLASSIFIER_WEIGHTS_PATH: &str = "models/use_dense_t1.json";

/// Which runtime evaluates the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierBackend {
    /// JSON weights evaluated in-process with ndarray
    Dense,
    /// ONNX export evaluated by ONNX Runtime
    Onnx,
}

impl FromStr for ClassifierBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dense" => Ok(ClassifierBackend::Dense),
            "onnx" => Ok(ClassifierBackend::Onnx),
            _ => anyhow::bail!(
                "Invalid CLASSIFIER_BACKEND: {}. Must be 'dense' or 'onnx'",
                s
            ),
        }
    }
}

/// Model environment configuration
#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    pub encoder_model_path: PathBuf,
    pub classifier_backend: ClassifierBackend,
    pub classifier_weights_path: PathBuf,
}

impl Default for ModelEnvConfig {
    fn default() -> Self {
        Self {
            encoder_model_path: PathBuf::from(DEFAULT_ENCODER_MODEL_PATH),
            classifier_backend: ClassifierBackend::Dense,
            classifier_weights_path: PathBuf::from(DEFAULT_CLASSIFIER_WEIGHTS_PATH),
        }
    }
}

impl ModelEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Parses the configuration from an arbitrary key lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let encoder_model_path = lookup("ENCODER_MODEL_PATH")
            .unwrap_or_else(|| DEFAULT_ENCODER_MODEL_PATH.to_string());
        let classifier_weights_path = lookup("CLASSIFIER_WEIGHTS_PATH")
            .unwrap_or_else(|| DEFAULT_CLASSIFIER_WEIGHTS_PATH.to_string());
        let backend_str = lookup("CLASSIFIER_BACKEND").unwrap_or_else(|| "dense".to_string());
        let classifier_backend = ClassifierBackend::from_str(&backend_str)
            .context("Failed to parse classifier backend")?;

        Ok(Self {
            encoder_model_path: PathBuf::from(encoder_model_path),
            classifier_backend,
            classifier_weights_path: PathBuf::from(classifier_weights_path),
        })
    }
}
