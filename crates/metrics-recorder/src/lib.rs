//! Fraud Metrics Recorder
//!
//! Process-lifetime counters and histograms for fraud rate, transaction
//! amount drift and predicted probability distribution.

mod histogram;
mod recorder;

pub use histogram::{BucketHistogram, HistogramSnapshot};
pub use recorder::{MetricsRecorder, MetricsSnapshot};

use thiserror::Error;

/// Fraud predictions
pub const FRAUD_COUNTER: &str = "fraud_detection_total";
/// Every prediction, labelled by outcome
pub const PREDICTIONS_COUNTER: &str = "transactions_predicted_total";
/// Cumulative processed amount. A gauge, since counters only take integer increments
pub const AMOUNT_PROCESSED: &str = "transaction_amount_processed";
/// Amount distribution (drift detection)
pub const AMOUNT_HISTOGRAM: &str = "transaction_amount_distribution";
/// Predicted fraud probability distribution
pub const PROBABILITY_HISTOGRAM: &str = "fraud_probability_distribution";
/// HTTP requests by method, handler and status
pub const HTTP_REQUESTS: &str = "http_requests_total";
/// HTTP request latency
pub const HTTP_DURATION: &str = "http_request_duration_seconds";

/// Upper bounds of the amount histogram buckets
pub const AMOUNT_BUCKETS: [f64; 7] = [10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0];
/// Upper bounds of the probability histogram buckets
pub const PROBABILITY_BUCKETS: [f64; 5] = [0.1, 0.3, 0.5, 0.7, 0.9];
/// Upper bounds of the HTTP latency buckets (seconds)
pub const HTTP_DURATION_BUCKETS: [f64; 8] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

/// Errors building the recorder
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Invalid bucket configuration for {metric}: {reason}")]
    InvalidBuckets { metric: &'static str, reason: String },
}
