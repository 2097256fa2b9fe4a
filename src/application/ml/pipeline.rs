//! Headline + price fusion prediction.
//!
//! ```text
//! headlines ──▶ first 5 ──▶ join(";") ──▶ TextEncoder ──▶ embedding[512] ─┐
//!                                                                        ├─▶ FeatureVector[515] ──▶ Classifier ──▶ P(up)
//! open/high/low/close ──▶ derive_ratios ──▶ [rel_high, rel_low, rel_close] ─┘
//! ```
//!
//! Model artifacts are loaded lazily on the first call and then shared
//! read-only by every subsequent call. Predictions themselves are never
//! cached.

use super::model_cell::{LoadStatus, ModelCell};
use super::model_loader::ArtifactLoader;
use super::predictor::{ModelArtifacts, ModelLoader};
use crate::config::ModelEnvConfig;
use crate::domain::errors::PredictionError;
use crate::domain::ml::feature_layout::{FeatureVector, MAX_HEADLINES, PriceQuad, derive_ratios};
use crate::infrastructure::observability::{LatencyGuard, Metrics};
use std::sync::Arc;
use tracing::{debug, error, info};

/// The headlines actually fed to the encoder: the first [`MAX_HEADLINES`],
/// in received order.
pub fn select_headlines(headlines: &[String]) -> &[String] {
    &headlines[..headlines.len().min(MAX_HEADLINES)]
}

pub struct PredictionPipeline {
    loader: Arc<dyn ModelLoader>,
    models: ModelCell<ModelArtifacts>,
    metrics: Option<Metrics>,
}

impl PredictionPipeline {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            models: ModelCell::new(),
            metrics: None,
        }
    }

    pub fn from_config(config: &ModelEnvConfig) -> Self {
        Self::new(Arc::new(ArtifactLoader::new(config.clone())))
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.models.status() == LoadStatus::Loaded
    }

    pub fn load_status(&self) -> LoadStatus {
        self.models.status()
    }

    /// Forces the lazy load now instead of on the first prediction.
    pub fn warmup(&self) -> Result<(), PredictionError> {
        self.artifacts().map(|_| ())
    }

    fn artifacts(&self) -> Result<Arc<ModelArtifacts>, PredictionError> {
        self.models.get_or_load(|| {
            let result = self.loader.load();
            match &result {
                Ok(artifacts) => {
                    info!(
                        "Model artifacts ready: encoder={}, classifier={} ({})",
                        artifacts.encoder.name(),
                        artifacts.classifier.name(),
                        artifacts.classifier.version()
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_model_loads("ok");
                    }
                }
                Err(e) => {
                    error!("Model artifact load failed: {}", e);
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_model_loads("error");
                    }
                }
            }
            result
        })
    }

    /// Probability that the equity's price rises, from up to five headlines
    /// and one session's open/high/low/close.
    pub fn predict(
        &self,
        headlines: &[String],
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Result<f64, PredictionError> {
        self.predict_quad(headlines, &PriceQuad::new(open, high, low, close))
    }

    pub fn predict_quad(
        &self,
        headlines: &[String],
        prices: &PriceQuad,
    ) -> Result<f64, PredictionError> {
        let latency = match &self.metrics {
            Some(metrics) => LatencyGuard::new(metrics.prediction_latency_seconds.clone()),
            None => LatencyGuard::detached(),
        };

        let result = self.run(headlines, prices);
        debug!("Prediction finished in {:.2}ms", latency.elapsed_ms());

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(probability) => {
                    metrics.inc_predictions("ok");
                    metrics.last_probability.set(*probability);
                }
                Err(e) => metrics.inc_predictions(e.kind()),
            }
        }
        result
    }

    fn run(&self, headlines: &[String], prices: &PriceQuad) -> Result<f64, PredictionError> {
        let selected = select_headlines(headlines);
        let models = self.artifacts()?;
        let ratios = derive_ratios(prices)?;

        let embedding = models.encoder.encode(selected)?;
        let features = FeatureVector::build(&embedding, &ratios)?;
        let probability = models.classifier.infer(&features)?;

        if let Some(metrics) = &self.metrics {
            metrics.headlines_used.set(selected.len() as f64);
        }
        debug!(
            "Prediction: headlines={}/{}, rel_high={:.4}, rel_low={:.4}, rel_close={:.4}, p={:.4}",
            selected.len(),
            headlines.len(),
            ratios.rel_high,
            ratios.rel_low,
            ratios.rel_close,
            probability
        );
        Ok(probability)
    }

    /// Runs [`predict_quad`](Self::predict_quad) on tokio's blocking pool.
    ///
    /// Dropping the returned future abandons the wait only; an in-flight load
    /// or forward pass still runs to completion.
    pub async fn predict_async(
        self: &Arc<Self>,
        headlines: Vec<String>,
        prices: PriceQuad,
    ) -> Result<f64, PredictionError> {
        let pipeline = Arc::clone(self);
        tokio::task::spawn_blocking(move || pipeline.predict_quad(&headlines, &prices))
            .await
            .map_err(|e| PredictionError::inference("pipeline", e))?
    }
}
