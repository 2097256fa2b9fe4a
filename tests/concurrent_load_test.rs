use stockcast::application::ml::{LoadStatus, PredictionPipeline};
use stockcast::domain::errors::PredictionError;
use stockcast::domain::ml::feature_layout::PriceQuad;
use stockcast::infrastructure::mock::MockModelLoader;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn headlines() -> Vec<String> {
    vec![
        "Chipmaker raises full-year guidance".to_string(),
        "Analysts upgrade shares to buy".to_string(),
    ]
}

/// Test: N threads hitting a cold pipeline trigger exactly one model load
/// and all observe the same probability.
#[test]
fn test_concurrent_first_calls_load_once() {
    let loader = MockModelLoader::new().with_delay(Duration::from_millis(100));
    let pipeline = Arc::new(PredictionPipeline::new(Arc::new(loader.clone())));
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let pipeline = pipeline.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                pipeline.predict(&headlines(), 50.0, 52.0, 49.0, 51.0)
            })
        })
        .collect();

    let results: Vec<f64> = handles
        .into_iter()
        .map(|h| h.join().expect("prediction thread panicked").unwrap())
        .collect();

    assert_eq!(loader.loads(), 1, "model artifacts must be loaded exactly once");
    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(loader.encoder.calls(), 16);
    assert_eq!(loader.classifier.calls(), 16);
    assert_eq!(pipeline.load_status(), LoadStatus::Loaded);
}

/// Test: callers waiting on a failing load all get that load's error,
/// without starting loads of their own.
#[test]
fn test_concurrent_first_calls_share_load_failure() {
    let error = PredictionError::model_load("encoder", "models/sentence_encoder.onnx", "missing");
    let loader = MockModelLoader::new()
        .with_delay(Duration::from_millis(150))
        .failing(error.clone());
    let pipeline = Arc::new(PredictionPipeline::new(Arc::new(loader.clone())));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pipeline = pipeline.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                pipeline.predict(&headlines(), 50.0, 52.0, 49.0, 51.0)
            })
        })
        .collect();

    for handle in handles {
        let result = handle.join().expect("prediction thread panicked");
        assert_eq!(result.unwrap_err(), error);
    }

    assert_eq!(loader.loads(), 1);
    assert_eq!(pipeline.load_status(), LoadStatus::Failed);
    assert_eq!(loader.encoder.calls(), 0);
}

/// Test: the same race through the async entry point.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_async_first_calls_load_once() {
    let loader = MockModelLoader::new().with_delay(Duration::from_millis(100));
    let pipeline = Arc::new(PredictionPipeline::new(Arc::new(loader.clone())));
    let prices = PriceQuad::new(50.0, 52.0, 49.0, 51.0);

    let calls = (0..10).map(|_| pipeline.predict_async(headlines(), prices));
    let results = futures::future::join_all(calls).await;

    let first = *results[0].as_ref().unwrap();
    for result in &results {
        assert_eq!(*result.as_ref().unwrap(), first);
    }
    assert_eq!(loader.loads(), 1);
}
