use prometheus::Histogram;
use std::time::Instant;

/// RAII guard for measuring and recording latency
pub struct LatencyGuard {
    start: Instant,
    histogram: Option<Histogram>,
}

impl LatencyGuard {
    pub fn new(histogram: Histogram) -> Self {
        Self {
            start: Instant::now(),
            histogram: Some(histogram),
        }
    }

    /// A guard that only measures; nothing is recorded on drop.
    pub fn detached() -> Self {
        Self {
            start: Instant::now(),
            histogram: None,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyGuard {
    fn drop(&mut self) {
        if let Some(histogram) = &self.histogram {
            histogram.observe(self.start.elapsed().as_secs_f64());
        }
    }
}
