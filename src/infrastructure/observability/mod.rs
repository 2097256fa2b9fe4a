//! Push-based observability for Stockcast
//!
//! Metrics live in a private prometheus registry and are rendered in text
//! format on demand. Nothing is served over the network.

pub mod latency_tracker;
pub mod metrics;

pub use latency_tracker::LatencyGuard;
pub use metrics::Metrics;
