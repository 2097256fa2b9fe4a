//! Fixed input layout of the headline/price fusion classifier.
//!
//! The classifier weights were trained against this exact ordering:
//!
//! ```text
//! [0 .. 512)  sentence embedding of the joined headlines
//! [512]       rel_high  = high  / open - 1
//! [513]       rel_low   = low   / open - 1
//! [514]       rel_close = close / open - 1
//! ```
//!
//! Any change here is a breaking change for the model artifacts.

use crate::domain::errors::PredictionError;
use serde::{Deserialize, Serialize};

/// Width of the sentence encoder output.
pub const EMBEDDING_DIM: usize = 512;

/// Width of the classifier input.
pub const FEATURE_DIM: usize = EMBEDDING_DIM + 3;

/// Only the first headlines (in received order) are fed to the encoder.
pub const MAX_HEADLINES: usize = 5;

/// Headlines are joined into a single string before encoding.
pub const HEADLINE_DELIMITER: &str = ";";

/// One trading session's open/high/low/close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuad {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceQuad {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }

    /// Rejects any non-positive or non-finite field. No ordering between
    /// the four levels is enforced.
    pub fn validate(&self) -> Result<(), PredictionError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(PredictionError::InvalidPrice { field, value });
            }
        }
        Ok(())
    }
}

/// Price levels expressed as fractional change from the session open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRatios {
    pub rel_high: f64,
    pub rel_low: f64,
    pub rel_close: f64,
}

impl PriceRatios {
    /// Ratios in layout order.
    pub fn as_array(&self) -> [f64; 3] {
        [self.rel_high, self.rel_low, self.rel_close]
    }
}

/// Derives the three relative price ratios from a session quad.
pub fn derive_ratios(quad: &PriceQuad) -> Result<PriceRatios, PredictionError> {
    quad.validate()?;
    Ok(PriceRatios {
        rel_high: quad.high / quad.open - 1.0,
        rel_low: quad.low / quad.open - 1.0,
        rel_close: quad.close / quad.open - 1.0,
    })
}

/// Joins the selected headlines into the single string the encoder sees.
/// An empty selection yields the empty string.
pub fn join_headlines<S: AsRef<str>>(headlines: &[S]) -> String {
    headlines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(HEADLINE_DELIMITER)
}

/// Raw encoder output. Its width is an external contract and is only
/// checked when the feature vector is built.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Classifier input with the layout fixed by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Box<[f32; FEATURE_DIM]>,
}

impl FeatureVector {
    /// Concatenates the embedding with the ratios `[rel_high, rel_low, rel_close]`.
    pub fn build(
        embedding: &EmbeddingVector,
        ratios: &PriceRatios,
    ) -> Result<Self, PredictionError> {
        if embedding.len() != EMBEDDING_DIM {
            return Err(PredictionError::DimensionMismatch {
                expected: EMBEDDING_DIM,
                actual: embedding.len(),
            });
        }

        let mut values = Box::new([0.0f32; FEATURE_DIM]);
        values[..EMBEDDING_DIM].copy_from_slice(embedding.as_slice());
        for (slot, ratio) in values[EMBEDDING_DIM..].iter_mut().zip(ratios.as_array()) {
            *slot = ratio as f32;
        }
        Ok(Self { values })
    }

    pub fn embedding(&self) -> &[f32] {
        &self.values[..EMBEDDING_DIM]
    }

    pub fn rel_high(&self) -> f32 {
        self.values[EMBEDDING_DIM]
    }

    pub fn rel_low(&self) -> f32 {
        self.values[EMBEDDING_DIM + 1]
    }

    pub fn rel_close(&self) -> f32 {
        self.values[EMBEDDING_DIM + 2]
    }

    pub fn as_slice(&self) -> &[f32] {
        self.values.as_slice()
    }
}
