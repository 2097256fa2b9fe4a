use super::dense_classifier::DenseClassifier;
use super::onnx_classifier::OnnxClassifier;
use super::onnx_text_encoder::OnnxTextEncoder;
use super::predictor::{Classifier, ModelArtifacts, ModelLoader};
use crate::config::{ClassifierBackend, ModelEnvConfig};
use crate::domain::errors::PredictionError;
use tracing::info;

/// Loads the encoder and classifier from the configured artifact paths.
pub struct ArtifactLoader {
    config: ModelEnvConfig,
}

impl ArtifactLoader {
    pub fn new(config: ModelEnvConfig) -> Self {
        Self { config }
    }
}

impl ModelLoader for ArtifactLoader {
    fn load(&self) -> Result<ModelArtifacts, PredictionError> {
        info!(
            "Loading model artifacts: encoder={:?}, classifier={:?} ({:?})",
            self.config.encoder_model_path,
            self.config.classifier_weights_path,
            self.config.classifier_backend
        );

        let encoder = OnnxTextEncoder::load(&self.config.encoder_model_path)?;
        let classifier: Box<dyn Classifier> = match self.config.classifier_backend {
            ClassifierBackend::Dense => {
                Box::new(DenseClassifier::load(&self.config.classifier_weights_path)?)
            }
            ClassifierBackend::Onnx => {
                Box::new(OnnxClassifier::load(&self.config.classifier_weights_path)?)
            }
        };

        Ok(ModelArtifacts::new(Box::new(encoder), classifier))
    }
}
