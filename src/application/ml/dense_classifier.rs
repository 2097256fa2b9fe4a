use super::predictor::Classifier;
use crate::domain::errors::PredictionError;
use crate::domain::ml::feature_layout::{FEATURE_DIM, FeatureVector};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{error, info};

/// Layer widths of the frozen network, input first.
pub const LAYER_WIDTHS: [usize; 4] = [FEATURE_DIM, 128, 64, 1];

const COMPONENT: &str = "classifier";

/// One dense layer as stored on disk. `weights` is in kernel orientation:
/// one row per input, one column per output unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayerWeights {
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseWeightsFile {
    pub layers: Vec<DenseLayerWeights>,
}

impl DenseWeightsFile {
    /// All-zero weights with the fixed architecture.
    pub fn zeros() -> Self {
        let layers = LAYER_WIDTHS
            .windows(2)
            .map(|pair| DenseLayerWeights {
                weights: vec![vec![0.0; pair[1]]; pair[0]],
                bias: vec![0.0; pair[1]],
            })
            .collect();
        Self { layers }
    }
}

struct DenseLayer {
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl DenseLayer {
    fn from_stored(
        index: usize,
        stored: DenseLayerWeights,
        inputs: usize,
        outputs: usize,
    ) -> Result<Self, String> {
        if stored.weights.len() != inputs {
            return Err(format!(
                "layer {} expects {} input rows, found {}",
                index,
                inputs,
                stored.weights.len()
            ));
        }
        if let Some(row) = stored.weights.iter().position(|r| r.len() != outputs) {
            return Err(format!(
                "layer {} row {} expects {} columns, found {}",
                index,
                row,
                outputs,
                stored.weights[row].len()
            ));
        }
        if stored.bias.len() != outputs {
            return Err(format!(
                "layer {} expects bias of {}, found {}",
                index,
                outputs,
                stored.bias.len()
            ));
        }

        let flat: Vec<f32> = stored.weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((inputs, outputs), flat).map_err(|e| e.to_string())?;
        Ok(Self {
            weights,
            bias: Array1::from(stored.bias),
        })
    }

    fn forward(&self, input: &Array1<f32>) -> Array1<f32> {
        input.dot(&self.weights) + &self.bias
    }
}

/// The 515 → 128 → 64 → 1 feedforward classifier evaluated in-process.
/// Hidden layers are linear; the head is a sigmoid.
pub struct DenseClassifier {
    layers: Vec<DenseLayer>,
    source: String,
}

impl DenseClassifier {
    pub fn load(path: &Path) -> Result<Self, PredictionError> {
        let source = path.display().to_string();
        let file = File::open(path).map_err(|e| {
            error!("Failed to open classifier weights {:?}: {}", path, e);
            PredictionError::model_load(COMPONENT, &source, e)
        })?;

        let stored: DenseWeightsFile = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| {
                error!("Failed to deserialize classifier weights: {}", e);
                PredictionError::model_load(COMPONENT, &source, e)
            })?;

        let classifier = Self::from_weights(stored, source)?;
        info!("Successfully loaded dense classifier from {:?}", path);
        Ok(classifier)
    }

    /// Builds the network from in-memory weights, validating every shape
    /// against the fixed architecture.
    pub fn from_weights(
        stored: DenseWeightsFile,
        source: impl Into<String>,
    ) -> Result<Self, PredictionError> {
        let source = source.into();
        let expected_layers = LAYER_WIDTHS.len() - 1;
        if stored.layers.len() != expected_layers {
            return Err(PredictionError::model_load(
                COMPONENT,
                &source,
                format!(
                    "expected {} dense layers, found {}",
                    expected_layers,
                    stored.layers.len()
                ),
            ));
        }

        let layers = stored
            .layers
            .into_iter()
            .enumerate()
            .map(|(i, layer)| {
                DenseLayer::from_stored(i, layer, LAYER_WIDTHS[i], LAYER_WIDTHS[i + 1])
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| PredictionError::model_load(COMPONENT, &source, reason))?;

        Ok(Self { layers, source })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl Classifier for DenseClassifier {
    fn infer(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        let mut activation = Array1::from(features.as_slice().to_vec());
        for layer in &self.layers {
            activation = layer.forward(&activation);
        }

        let logit = activation
            .get(0)
            .copied()
            .ok_or_else(|| PredictionError::inference(COMPONENT, "empty output"))?;
        let probability = sigmoid(logit) as f64;
        if !probability.is_finite() {
            return Err(PredictionError::inference(
                COMPONENT,
                format!("non-finite output for logit {}", logit),
            ));
        }
        Ok(probability)
    }

    fn name(&self) -> &str {
        "Dense 515-128-64-1"
    }

    fn version(&self) -> &str {
        "use_dense_t1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::feature_layout::{
        EMBEDDING_DIM, EmbeddingVector, PriceQuad, derive_ratios,
    };
    use std::io::Write;

    fn features(open: f64, high: f64, low: f64, close: f64) -> FeatureVector {
        let ratios = derive_ratios(&PriceQuad::new(open, high, low, close)).unwrap();
        FeatureVector::build(&EmbeddingVector::new(vec![0.25; EMBEDDING_DIM]), &ratios).unwrap()
    }

    /// Passes rel_high straight through all three layers.
    fn rel_high_passthrough() -> DenseWeightsFile {
        let mut weights = DenseWeightsFile::zeros();
        weights.layers[0].weights[EMBEDDING_DIM][0] = 1.0;
        weights.layers[1].weights[0][0] = 1.0;
        weights.layers[2].weights[0][0] = 1.0;
        weights
    }

    #[test]
    fn test_zero_network_is_neutral() {
        let classifier = DenseClassifier::from_weights(DenseWeightsFile::zeros(), "memory").unwrap();
        let p = classifier.infer(&features(50.0, 52.0, 49.0, 51.0)).unwrap();
        assert!((p - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_output_bias_sets_probability() {
        let mut weights = DenseWeightsFile::zeros();
        weights.layers[2].bias[0] = 2.0;
        let classifier = DenseClassifier::from_weights(weights, "memory").unwrap();

        let p = classifier.infer(&features(50.0, 52.0, 49.0, 51.0)).unwrap();
        let expected = 1.0 / (1.0 + (-2.0f64).exp());
        assert!((p - expected).abs() < 1e-6);
    }

    #[test]
    fn test_reads_rel_high_slot() {
        let classifier = DenseClassifier::from_weights(rel_high_passthrough(), "memory").unwrap();

        let up = classifier.infer(&features(100.0, 150.0, 95.0, 105.0)).unwrap();
        let flat = classifier.infer(&features(100.0, 100.0, 95.0, 105.0)).unwrap();
        assert!(up > 0.5);
        assert!((flat - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_probability_stays_in_unit_interval() {
        let mut weights = DenseWeightsFile::zeros();
        weights.layers[2].bias[0] = 500.0;
        let classifier = DenseClassifier::from_weights(weights, "memory").unwrap();
        let p = classifier.infer(&features(1.0, 1.0, 1.0, 1.0)).unwrap();
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_wrong_layer_count_rejected() {
        let mut weights = DenseWeightsFile::zeros();
        weights.layers.pop();
        let err = DenseClassifier::from_weights(weights, "memory").err().unwrap();
        assert_eq!(err.kind(), "model_load");
        assert!(err.to_string().contains("expected 3 dense layers"));
    }

    #[test]
    fn test_wrong_input_width_rejected() {
        let mut weights = DenseWeightsFile::zeros();
        weights.layers[0].weights.pop();
        let err = DenseClassifier::from_weights(weights, "memory").err().unwrap();
        assert!(err.to_string().contains("layer 0 expects 515 input rows"));
    }

    #[test]
    fn test_wrong_bias_width_rejected() {
        let mut weights = DenseWeightsFile::zeros();
        weights.layers[1].bias.push(0.0);
        let err = DenseClassifier::from_weights(weights, "memory").err().unwrap();
        assert!(err.to_string().contains("layer 1 expects bias of 64"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::to_string(&rel_high_passthrough()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let classifier = DenseClassifier::load(file.path()).unwrap();
        assert_eq!(classifier.source(), file.path().display().to_string());
        assert!(classifier.infer(&features(100.0, 150.0, 95.0, 105.0)).unwrap() > 0.5);
    }

    #[test]
    fn test_missing_file_is_model_load_error() {
        let err = DenseClassifier::load(Path::new("does/not/exist.json")).err().unwrap();
        assert_eq!(err.kind(), "model_load");
    }

    #[test]
    fn test_corrupt_file_is_model_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"layers\": [").unwrap();
        let err = DenseClassifier::load(file.path()).err().unwrap();
        assert_eq!(err.kind(), "model_load");
    }
}
