use crate::application::ml::predictor::{Classifier, ModelArtifacts, ModelLoader, TextEncoder};
use crate::domain::errors::PredictionError;
use crate::domain::ml::feature_layout::{EMBEDDING_DIM, EmbeddingVector, FeatureVector, PriceQuad};
use crate::domain::ports::{HeadlineSource, PriceSession, PriceSource};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;

/// Headlines served from memory.
#[derive(Clone, Default)]
pub struct StaticHeadlineSource {
    headlines: HashMap<String, Vec<String>>,
}

impl StaticHeadlineSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_headlines<I, S>(mut self, symbol: &str, headlines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headlines.insert(
            symbol.to_uppercase(),
            headlines.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// A few tickers with canned headlines for demo runs.
    pub fn sample() -> Self {
        Self::new()
            .with_headlines(
                "AAPL",
                [
                    "Apple beats earnings expectations on record services revenue",
                    "iPhone shipments rise ahead of holiday quarter",
                    "Apple expands buyback program by $90 billion",
                ],
            )
            .with_headlines(
                "TSLA",
                [
                    "Tesla recalls vehicles over steering defect",
                    "Regulators open probe into driver-assistance crashes",
                ],
            )
    }
}

#[async_trait]
impl HeadlineSource for StaticHeadlineSource {
    async fn fetch_headlines(&self, symbol: &str) -> Result<Vec<String>> {
        // Unknown symbols simply have no news
        Ok(self
            .headlines
            .get(&symbol.to_uppercase())
            .cloned()
            .unwrap_or_default())
    }
}

/// End-of-day sessions served from memory.
#[derive(Clone, Default)]
pub struct StaticPriceSource {
    sessions: HashMap<String, PriceSession>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, symbol: &str, date: NaiveDate, prices: PriceQuad) -> Self {
        let symbol = symbol.to_uppercase();
        self.sessions.insert(
            symbol.clone(),
            PriceSession {
                symbol,
                date,
                prices,
            },
        );
        self
    }

    pub fn sample() -> Self {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap_or(NaiveDate::MIN);
        Self::new()
            .with_session("AAPL", date, PriceQuad::new(181.99, 182.76, 180.17, 181.18))
            .with_session("TSLA", date, PriceQuad::new(236.86, 240.12, 234.90, 237.49))
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn latest_session(&self, symbol: &str) -> Result<PriceSession> {
        self.sessions
            .get(&symbol.to_uppercase())
            .cloned()
            .ok_or_else(|| anyhow!("No price data for symbol {}", symbol))
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf29ce484222325u64, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    })
}

/// Deterministic stand-in for the sentence encoder. Identical text always
/// maps to the identical vector.
#[derive(Clone)]
pub struct MockTextEncoder {
    dim: usize,
    calls: Arc<AtomicUsize>,
    last_text: Arc<Mutex<Option<String>>>,
}

impl Default for MockTextEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTextEncoder {
    pub fn new() -> Self {
        Self::with_dim(EMBEDDING_DIM)
    }

    /// Encoder producing vectors of the wrong width, for contract tests.
    pub fn with_dim(dim: usize) -> Self {
        Self {
            dim,
            calls: Arc::new(AtomicUsize::new(0)),
            last_text: Arc::new(Mutex::new(None)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_text(&self) -> Option<String> {
        self.last_text.lock().ok().and_then(|text| text.clone())
    }

    /// The vector `embed` returns for `text`, without counting a call.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let seed = fnv1a(text);
        (0..self.dim as u64)
            .map(|i| {
                let mixed = (seed ^ i.wrapping_mul(0x9e3779b97f4a7c15)).wrapping_mul(0xbf58476d1ce4e5b9);
                ((mixed >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0) as f32
            })
            .collect()
    }
}

impl TextEncoder for MockTextEncoder {
    fn embed(&self, text: &str) -> Result<EmbeddingVector, PredictionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_text.lock() {
            *last = Some(text.to_string());
        }
        Ok(EmbeddingVector::new(self.vector_for(text)))
    }

    fn name(&self) -> &str {
        "Mock Encoder"
    }
}

/// Logistic model over the mean embedding and the summed price ratios.
#[derive(Clone, Default)]
pub struct MockClassifier {
    calls: Arc<AtomicUsize>,
    last_features: Arc<Mutex<Option<FeatureVector>>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_features(&self) -> Option<FeatureVector> {
        self.last_features
            .lock()
            .ok()
            .and_then(|features| features.clone())
    }

    /// The probability `infer` returns for `features`, without counting a call.
    pub fn score(features: &FeatureVector) -> f64 {
        let embedding = features.embedding();
        let mean = embedding.iter().map(|v| *v as f64).sum::<f64>() / embedding.len() as f64;
        let price_signal =
            features.rel_high() as f64 + features.rel_low() as f64 + features.rel_close() as f64;
        1.0 / (1.0 + (-(mean + 10.0 * price_signal)).exp())
    }
}

impl Classifier for MockClassifier {
    fn infer(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_features.lock() {
            *last = Some(features.clone());
        }
        Ok(Self::score(features))
    }

    fn name(&self) -> &str {
        "Mock Classifier"
    }
}

/// Loader handing out clones of the mock models, with optional latency and
/// an optional injected failure.
#[derive(Clone, Default)]
pub struct MockModelLoader {
    pub encoder: MockTextEncoder,
    pub classifier: MockClassifier,
    loads: Arc<AtomicUsize>,
    delay: Duration,
    failure: Option<PredictionError>,
}

impl MockModelLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoder(mut self, encoder: MockTextEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self, error: PredictionError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModelLoader for MockModelLoader {
    fn load(&self) -> Result<ModelArtifacts, PredictionError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        info!("Mock model artifacts loaded");
        Ok(ModelArtifacts::new(
            Box::new(self.encoder.clone()),
            Box::new(self.classifier.clone()),
        ))
    }
}
