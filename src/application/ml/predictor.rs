use crate::domain::errors::PredictionError;
use crate::domain::ml::feature_layout::{EmbeddingVector, FeatureVector, join_headlines};

/// Maps text to a fixed-width semantic vector.
pub trait TextEncoder: Send + Sync {
    /// Embed one combined string. Must accept the empty string.
    fn embed(&self, text: &str) -> Result<EmbeddingVector, PredictionError>;

    /// Joins `texts` with the headline delimiter and embeds the result as a
    /// single unit.
    fn encode(&self, texts: &[String]) -> Result<EmbeddingVector, PredictionError> {
        self.embed(&join_headlines(texts))
    }

    fn name(&self) -> &str;
}

/// Frozen network mapping a feature vector to P(up) in [0, 1].
pub trait Classifier: Send + Sync {
    fn infer(&self, features: &FeatureVector) -> Result<f64, PredictionError>;

    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "frozen"
    }
}

/// Loaded encoder and classifier. Immutable once constructed.
pub struct ModelArtifacts {
    pub encoder: Box<dyn TextEncoder>,
    pub classifier: Box<dyn Classifier>,
}

impl ModelArtifacts {
    pub fn new(encoder: Box<dyn TextEncoder>, classifier: Box<dyn Classifier>) -> Self {
        Self {
            encoder,
            classifier,
        }
    }
}

impl std::fmt::Debug for ModelArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifacts")
            .field("encoder", &self.encoder.name())
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

/// Acquires the model artifacts. Called at most once per successful load.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<ModelArtifacts, PredictionError>;
}

impl<F> ModelLoader for F
where
    F: Fn() -> Result<ModelArtifacts, PredictionError> + Send + Sync,
{
    fn load(&self) -> Result<ModelArtifacts, PredictionError> {
        self()
    }
}
