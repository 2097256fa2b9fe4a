use crate::domain::ml::feature_layout::PriceQuad;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One end-of-day session as returned by a market-data provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSession {
    pub symbol: String,
    pub date: NaiveDate,
    pub prices: PriceQuad,
}

/// Supplies recent headlines for a ticker, most relevant first.
/// Strings are expected to be trimmed already.
#[async_trait]
pub trait HeadlineSource: Send + Sync {
    async fn fetch_headlines(&self, symbol: &str) -> Result<Vec<String>>;
}

/// Supplies the most recent trading session for a ticker.
/// Values are passed through unvalidated; the pipeline checks positivity.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn latest_session(&self, symbol: &str) -> Result<PriceSession>;
}
