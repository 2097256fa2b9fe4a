use super::predictor::TextEncoder;
use crate::domain::errors::PredictionError;
use crate::domain::ml::feature_layout::EmbeddingVector;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use std::sync::Mutex;
use tracing::{error, info};

const COMPONENT: &str = "encoder";

/// Sentence encoder exported to ONNX.
///
/// The graph takes a single string tensor of shape `[1]` and returns one
/// `[1, 512]` f32 embedding, the shape the Universal Sentence Encoder
/// exposes after conversion.
pub struct OnnxTextEncoder {
    // ort needs &mut for run()
    session: Mutex<Session>,
}

impl OnnxTextEncoder {
    pub fn load(model_path: &Path) -> Result<Self, PredictionError> {
        let source = model_path.display().to_string();
        if !model_path.exists() {
            error!("ONNX encoder file not found at {:?}", model_path);
            return Err(PredictionError::model_load(
                COMPONENT,
                source,
                "file not found",
            ));
        }

        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|e| {
                error!("Failed to load ONNX encoder: {}", e);
                PredictionError::model_load(COMPONENT, &source, e)
            })?;

        info!("Successfully loaded ONNX encoder from {:?}", model_path);
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl TextEncoder for OnnxTextEncoder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector, PredictionError> {
        let shape = vec![1usize];
        let input = Tensor::from_string_array((shape.as_slice(), &[text.to_string()][..]))
            .map_err(|e| PredictionError::inference(COMPONENT, format!("input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| PredictionError::inference(COMPONENT, format!("lock: {}", e)))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| PredictionError::inference(COMPONENT, e))?;

        let output = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| PredictionError::inference(COMPONENT, "no output found"))?;
        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| PredictionError::inference(COMPONENT, e))?;

        Ok(EmbeddingVector::new(data.to_vec()))
    }

    fn name(&self) -> &str {
        "ONNX Sentence Encoder"
    }
}
