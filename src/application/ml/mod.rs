pub mod dense_classifier;
pub mod model_cell;
pub mod model_loader;
pub mod onnx_classifier;
pub mod onnx_text_encoder;
pub mod pipeline;
pub mod predictor;

pub use model_cell::{LoadStatus, ModelCell};
pub use model_loader::ArtifactLoader;
pub use pipeline::PredictionPipeline;
pub use predictor::{Classifier, ModelArtifacts, ModelLoader, TextEncoder};
