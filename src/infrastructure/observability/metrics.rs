//! Prometheus metrics definitions for Stockcast
//!
//! All metrics use the `stockcast_` prefix.

use prometheus::{
    CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Prometheus metrics for the prediction pipeline
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Predictions by outcome (`ok` or an error kind)
    pub predictions_total: CounterVec,
    /// Model artifact load attempts by outcome
    pub model_loads_total: CounterVec,
    /// End-to-end latency of a single prediction
    pub prediction_latency_seconds: Histogram,
    /// Most recent probability returned
    pub last_probability: GenericGauge<AtomicF64>,
    /// Headlines actually fed to the encoder on the last call
    pub headlines_used: GenericGauge<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let predictions_total = CounterVec::new(
            Opts::new("stockcast_predictions_total", "Total predictions by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let model_loads_total = CounterVec::new(
            Opts::new(
                "stockcast_model_loads_total",
                "Model artifact load attempts by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(model_loads_total.clone()))?;

        let prediction_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "stockcast_prediction_latency_seconds",
                "Prediction latency in seconds, including a lazy model load",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0, 30.0,
            ]),
        )?;
        registry.register(Box::new(prediction_latency_seconds.clone()))?;

        let last_probability = Gauge::with_opts(Opts::new(
            "stockcast_last_probability",
            "Most recent upward-move probability (0-1)",
        ))?;
        registry.register(Box::new(last_probability.clone()))?;

        let headlines_used = Gauge::with_opts(Opts::new(
            "stockcast_headlines_used",
            "Headlines fed to the encoder on the last prediction",
        ))?;
        registry.register(Box::new(headlines_used.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            predictions_total,
            model_loads_total,
            prediction_latency_seconds,
            last_probability,
            headlines_used,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    /// Increment prediction counter
    pub fn inc_predictions(&self, outcome: &str) {
        self.predictions_total.with_label_values(&[outcome]).inc();
    }

    /// Increment model load counter
    pub fn inc_model_loads(&self, outcome: &str) {
        self.model_loads_total.with_label_values(&[outcome]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_predictions("ok");
        assert!(metrics.render().contains("stockcast_"));
    }

    #[test]
    fn test_last_probability_update() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.last_probability.set(0.75);
        let output = metrics.render();
        assert!(output.contains("stockcast_last_probability 0.75"));
    }

    #[test]
    fn test_prediction_counter_by_outcome() {
        let metrics = Metrics::new().expect("Failed to create metrics");
        metrics.inc_predictions("ok");
        metrics.inc_predictions("ok");
        metrics.inc_predictions("invalid_price");

        assert_eq!(metrics.predictions_total.with_label_values(&["ok"]).get(), 2.0);
        let output = metrics.render();
        assert!(output.contains("stockcast_predictions_total{outcome=\"invalid_price\"} 1"));
    }
}
