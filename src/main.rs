//! Stockcast - upward-move probability from headlines and session prices
//!
//! # Usage
//! ```sh
//! stockcast predict --headline "Company X beats earnings" \
//!     --open 50 --high 52 --low 49 --close 51
//! stockcast demo AAPL TSLA
//! ```
//!
//! # Environment Variables
//! - `ENCODER_MODEL_PATH` - ONNX sentence encoder (default: models/sentence_encoder.onnx)
//! - `CLASSIFIER_BACKEND` - `dense` or `onnx` (default: dense)
//! - `CLASSIFIER_WEIGHTS_PATH` - classifier artifact (default: models/use_dense_t1.json)
//! - `OBSERVABILITY_ENABLED` - record prometheus metrics (default: true)
//! - `METRICS_DUMP_ON_EXIT` - print rendered metrics before exiting (default: false)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use stockcast::application::ml::PredictionPipeline;
use stockcast::application::prediction_service::PredictionService;
use stockcast::config::Config;
use stockcast::domain::ml::feature_layout::PriceQuad;
use stockcast::infrastructure::mock::{StaticHeadlineSource, StaticPriceSource};
use stockcast::infrastructure::observability::Metrics;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "stockcast")]
#[command(about = "Estimate the probability that a stock rises from news headlines and prices")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Load the models before the first prediction
    #[arg(long, global = true)]
    eager: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict from explicit headlines and one session's prices
    #[command(allow_negative_numbers = true)]
    Predict {
        /// News headline; repeat for several (only the first 5 are used)
        #[arg(long = "headline")]
        headlines: Vec<String>,
        #[arg(long)]
        open: f64,
        #[arg(long)]
        high: f64,
        #[arg(long)]
        low: f64,
        #[arg(long)]
        close: f64,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Predict symbols using the built-in sample headlines and prices
    Demo {
        #[arg(default_values_t = vec!["AAPL".to_string()])]
        symbols: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    info!(
        "Stockcast {}: encoder={:?}, classifier={:?} ({:?})",
        env!("CARGO_PKG_VERSION"),
        config.model.encoder_model_path,
        config.model.classifier_weights_path,
        config.model.classifier_backend
    );

    let mut pipeline = PredictionPipeline::from_config(&config.model);
    let metrics = if config.observability.enabled {
        let metrics = Metrics::new()?;
        pipeline = pipeline.with_metrics(metrics.clone());
        Some(metrics)
    } else {
        None
    };
    let pipeline = Arc::new(pipeline);

    if cli.eager {
        pipeline.warmup().context("Failed to load model artifacts")?;
    }

    match cli.command {
        Commands::Predict {
            headlines,
            open,
            high,
            low,
            close,
            json,
        } => {
            let prices = PriceQuad::new(open, high, low, close);
            let probability = pipeline.predict_async(headlines, prices).await?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "prices": prices, "prediction": probability })
                );
            } else {
                println!("{:.6}", probability);
            }
        }
        Commands::Demo { symbols } => {
            let service = PredictionService::new(
                Arc::new(StaticHeadlineSource::sample()),
                Arc::new(StaticPriceSource::sample()),
                pipeline.clone(),
            );
            for (symbol, result) in service.predict_symbols(&symbols).await {
                match result {
                    Ok(prediction) => println!("{}", serde_json::to_string_pretty(&prediction)?),
                    Err(e) => eprintln!("{}: {:#}", symbol, e),
                }
            }
        }
    }

    if config.observability.dump_on_exit {
        if let Some(metrics) = &metrics {
            print!("{}", metrics.render());
        }
    }

    Ok(())
}
