//! Metrics Recorder Implementation

use crate::histogram::{add_f64, BucketHistogram, HistogramSnapshot};
use crate::{
    MetricsError, AMOUNT_BUCKETS, AMOUNT_HISTOGRAM, AMOUNT_PROCESSED, FRAUD_COUNTER,
    HTTP_DURATION, HTTP_DURATION_BUCKETS, HTTP_REQUESTS, PREDICTIONS_COUNTER,
    PROBABILITY_BUCKETS, PROBABILITY_HISTOGRAM,
};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Point-in-time copy of the prediction metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub fraud_total: u64,
    pub safe_total: u64,
    pub amount_processed_total: f64,
    pub amount: HistogramSnapshot,
    pub probability: HistogramSnapshot,
}

impl MetricsSnapshot {
    /// All predictions recorded
    pub fn predictions_total(&self) -> u64 {
        self.fraud_total + self.safe_total
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mean_probability = if self.probability.count == 0 {
            0.0
        } else {
            self.probability.sum / self.probability.count as f64
        };
        write!(
            f,
            "predictions={} fraud={} safe={} amount_processed={:.2} mean_probability={:.4}",
            self.predictions_total(),
            self.fraud_total,
            self.safe_total,
            self.amount_processed_total,
            mean_probability
        )
    }
}

/// Recorder owning its Prometheus registry.
///
/// Nothing is installed globally: each instance renders only what was
/// recorded through it, so tests and the server never share state.
pub struct MetricsRecorder {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    fraud_total: AtomicU64,
    safe_total: AtomicU64,
    amount_total_bits: AtomicU64,
    amount: BucketHistogram,
    probability: BucketHistogram,
}

fn with_buckets(
    builder: PrometheusBuilder,
    metric: &'static str,
    buckets: &[f64],
) -> Result<PrometheusBuilder, MetricsError> {
    builder
        .set_buckets_for_metric(Matcher::Full(metric.to_string()), buckets)
        .map_err(|e| MetricsError::InvalidBuckets {
            metric,
            reason: e.to_string(),
        })
}

impl MetricsRecorder {
    /// Create a new recorder with the fixed bucket layouts
    pub fn new() -> Result<Self, MetricsError> {
        let builder = PrometheusBuilder::new();
        let builder = with_buckets(builder, AMOUNT_HISTOGRAM, &AMOUNT_BUCKETS)?;
        let builder = with_buckets(builder, PROBABILITY_HISTOGRAM, &PROBABILITY_BUCKETS)?;
        let builder = with_buckets(builder, HTTP_DURATION, &HTTP_DURATION_BUCKETS)?;

        let recorder = builder.build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_counter!(FRAUD_COUNTER, "Total number of frauds detected by the model");
            describe_counter!(PREDICTIONS_COUNTER, "Total number of predictions by outcome");
            describe_gauge!(AMOUNT_PROCESSED, "Cumulative amount of processed transactions");
            describe_histogram!(
                AMOUNT_HISTOGRAM,
                "Distribution of transaction amounts (drift detection)"
            );
            describe_histogram!(
                PROBABILITY_HISTOGRAM,
                "Distribution of predicted fraud probabilities"
            );
            describe_counter!(HTTP_REQUESTS, "Total number of HTTP requests");
            describe_histogram!(HTTP_DURATION, Unit::Seconds, "HTTP request latency");

            counter!(FRAUD_COUNTER).absolute(0);
            gauge!(AMOUNT_PROCESSED).set(0.0);
        });

        info!("Metrics recorder initialised");
        Ok(Self {
            recorder,
            handle,
            fraud_total: AtomicU64::new(0),
            safe_total: AtomicU64::new(0),
            amount_total_bits: AtomicU64::new(0f64.to_bits()),
            amount: BucketHistogram::new(&AMOUNT_BUCKETS),
            probability: BucketHistogram::new(&PROBABILITY_BUCKETS),
        })
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, amount: f64, probability: f64, is_fraud: bool) {
        let outcome = if is_fraud { "fraud" } else { "safe" };

        metrics::with_local_recorder(&self.recorder, || {
            if is_fraud {
                counter!(FRAUD_COUNTER).increment(1);
            }
            counter!(PREDICTIONS_COUNTER, "outcome" => outcome).increment(1);
            gauge!(AMOUNT_PROCESSED).increment(amount);
            histogram!(AMOUNT_HISTOGRAM).record(amount);
            histogram!(PROBABILITY_HISTOGRAM).record(probability);
        });

        if is_fraud {
            self.fraud_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.safe_total.fetch_add(1, Ordering::Relaxed);
        }
        add_f64(&self.amount_total_bits, amount);
        self.amount.observe(amount);
        self.probability.observe(probability);

        debug!(
            "Recorded prediction: outcome={} amount={:.2} p={:.4}",
            outcome, amount, probability
        );
    }

    /// Record a served HTTP request
    pub fn record_http_request(&self, method: &str, handler: &str, status: u16, elapsed: Duration) {
        metrics::with_local_recorder(&self.recorder, || {
            counter!(
                HTTP_REQUESTS,
                "method" => method.to_string(),
                "handler" => handler.to_string(),
                "status" => status.to_string()
            )
            .increment(1);
            histogram!(
                HTTP_DURATION,
                "method" => method.to_string(),
                "handler" => handler.to_string()
            )
            .record(elapsed.as_secs_f64());
        });
    }

    /// Copy the prediction metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fraud_total: self.fraud_total.load(Ordering::Relaxed),
            safe_total: self.safe_total.load(Ordering::Relaxed),
            amount_processed_total: f64::from_bits(self.amount_total_bits.load(Ordering::Relaxed)),
            amount: self.amount.snapshot(),
            probability: self.probability.snapshot(),
        }
    }

    /// Render the Prometheus text exposition format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
