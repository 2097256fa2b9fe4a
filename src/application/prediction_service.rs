use crate::application::ml::pipeline::{PredictionPipeline, select_headlines};
use crate::domain::ports::{HeadlineSource, PriceSession, PriceSource};
use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a caller needs to render one symbol's forecast.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolPrediction {
    pub symbol: String,
    /// All headlines returned by the source, not only those fed to the model
    pub headlines: Vec<String>,
    pub headlines_used: usize,
    pub session: PriceSession,
    pub probability: f64,
}

/// Fetches a symbol's headlines and latest session, then runs the pipeline.
pub struct PredictionService {
    headlines: Arc<dyn HeadlineSource>,
    prices: Arc<dyn PriceSource>,
    pipeline: Arc<PredictionPipeline>,
}

impl PredictionService {
    pub fn new(
        headlines: Arc<dyn HeadlineSource>,
        prices: Arc<dyn PriceSource>,
        pipeline: Arc<PredictionPipeline>,
    ) -> Self {
        Self {
            headlines,
            prices,
            pipeline,
        }
    }

    pub fn pipeline(&self) -> &Arc<PredictionPipeline> {
        &self.pipeline
    }

    pub async fn predict_symbol(&self, symbol: &str) -> Result<SymbolPrediction> {
        let symbol = symbol.to_uppercase();

        let (headlines, session) = tokio::try_join!(
            async {
                self.headlines
                    .fetch_headlines(&symbol)
                    .await
                    .with_context(|| format!("Failed to fetch headlines for {}", symbol))
            },
            async {
                self.prices
                    .latest_session(&symbol)
                    .await
                    .with_context(|| format!("Failed to fetch prices for {}", symbol))
            }
        )?;

        let headlines_used = select_headlines(&headlines).len();
        let probability = self
            .pipeline
            .predict_async(headlines.clone(), session.prices)
            .await
            .with_context(|| format!("Prediction failed for {}", symbol))?;

        info!(
            "{} [{}]: P(up)={:.3} from {} headline(s)",
            symbol, session.date, probability, headlines_used
        );

        Ok(SymbolPrediction {
            symbol,
            headlines,
            headlines_used,
            session,
            probability,
        })
    }

    /// Predicts several symbols concurrently. Failures are reported per
    /// symbol and do not abort the others.
    pub async fn predict_symbols(
        &self,
        symbols: &[String],
    ) -> Vec<(String, Result<SymbolPrediction>)> {
        let results = join_all(symbols.iter().map(|s| self.predict_symbol(s))).await;

        symbols
            .iter()
            .cloned()
            .zip(results)
            .inspect(|(symbol, result)| {
                if let Err(e) = result {
                    warn!("Skipping {}: {:#}", symbol, e);
                }
            })
            .collect()
    }
}
