use thiserror::Error;

/// Errors surfaced by the prediction pipeline.
///
/// Payloads are owned strings so a single load failure can be cloned out to
/// every caller that was waiting on the same load attempt.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredictionError {
    #[error("Failed to load {component} model from {path}: {reason}")]
    ModelLoad {
        component: String,
        path: String,
        reason: String,
    },

    #[error("Invalid price: {field} must be strictly positive, got {value}")]
    InvalidPrice { field: &'static str, value: f64 },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Inference failed in {component}: {reason}")]
    Inference { component: String, reason: String },
}

impl PredictionError {
    pub fn model_load(
        component: impl Into<String>,
        path: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::ModelLoad {
            component: component.into(),
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn inference(component: impl Into<String>, reason: impl ToString) -> Self {
        Self::Inference {
            component: component.into(),
            reason: reason.to_string(),
        }
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelLoad { .. } => "model_load",
            Self::InvalidPrice { .. } => "invalid_price",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::Inference { .. } => "inference",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_load_formatting() {
        let error = PredictionError::model_load("encoder", "models/missing.onnx", "No such file");

        let msg = error.to_string();
        assert!(msg.contains("encoder"));
        assert!(msg.contains("models/missing.onnx"));
        assert!(msg.contains("No such file"));
        assert_eq!(error.kind(), "model_load");
    }

    #[test]
    fn test_dimension_mismatch_formatting() {
        let error = PredictionError::DimensionMismatch {
            expected: 512,
            actual: 384,
        };

        let msg = error.to_string();
        assert!(msg.contains("512"));
        assert!(msg.contains("384"));
    }

    #[test]
    fn test_clone_preserves_equality() {
        let error = PredictionError::InvalidPrice {
            field: "open",
            value: 0.0,
        };
        assert_eq!(error.clone(), error);
        assert_eq!(error.kind(), "invalid_price");
    }
}
