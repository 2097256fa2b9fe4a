use super::predictor::Classifier;
use crate::domain::errors::PredictionError;
use crate::domain::ml::feature_layout::{FEATURE_DIM, FeatureVector};
use ort::session::Session;
use std::path::Path;
use std::sync::Mutex;
use tracing::{error, info};

const COMPONENT: &str = "classifier";

/// ONNX export of the 515 → 128 → 64 → 1 network.
/// Input `[1, 515]` f32, output `[1, 1]` f32 already passed through sigmoid.
pub struct OnnxClassifier {
    session: Mutex<Session>,
}

impl OnnxClassifier {
    pub fn load(model_path: &Path) -> Result<Self, PredictionError> {
        let source = model_path.display().to_string();
        if !model_path.exists() {
            error!("ONNX classifier file not found at {:?}", model_path);
            return Err(PredictionError::model_load(
                COMPONENT,
                source,
                "file not found",
            ));
        }

        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|e| {
                error!("Failed to load ONNX classifier: {}", e);
                PredictionError::model_load(COMPONENT, &source, e)
            })?;

        let classifier = Self {
            session: Mutex::new(session),
        };

        // A zero probe rejects graphs whose input or output width differs
        // from the fixed architecture before anyone relies on them.
        classifier
            .run(vec![0.0; FEATURE_DIM])
            .map_err(|e| PredictionError::model_load(COMPONENT, &source, e))?;

        info!("Successfully loaded ONNX classifier from {:?}", model_path);
        Ok(classifier)
    }

    fn run(&self, flat_data: Vec<f32>) -> Result<f64, String> {
        let shape = vec![1, FEATURE_DIM];
        let input_value = ort::value::Value::from_array((shape.as_slice(), flat_data))
            .map_err(|e| format!("Input value creation failed: {}", e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Mutex lock failed: {}", e))?;

        let outputs = session.run(ort::inputs![input_value]).map_err(|e| e.to_string())?;
        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or("No output found")?;
        let (_, data) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| e.to_string())?;

        if data.len() != 1 {
            return Err(format!("expected a single output, found {}", data.len()));
        }
        Ok(data[0] as f64)
    }
}

impl Classifier for OnnxClassifier {
    fn infer(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        let probability = self
            .run(features.as_slice().to_vec())
            .map_err(|e| PredictionError::inference(COMPONENT, e))?;

        if !(0.0..=1.0).contains(&probability) {
            return Err(PredictionError::inference(
                COMPONENT,
                format!("output {} outside [0, 1]", probability),
            ));
        }
        Ok(probability)
    }

    fn name(&self) -> &str {
        "ONNX Runtime (Dense 515-128-64-1)"
    }
}
