//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use crate::errors::{AppError, Result};
use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Metrics prefix for all Chapterhouse metrics
pub const METRICS_PREFIX: &str = "chapterhouse";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 250ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.100,  // 100ms
    0.250,  // 250ms - P99 target
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Story metrics
    describe_counter!(
        format!("{}_stories_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total stories created"
    );

    describe_counter!(
        format!("{}_stories_deleted_total", METRICS_PREFIX),
        Unit::Count,
        "Total stories deleted (with chapter cascade)"
    );

    // Chapter ordering metrics
    describe_counter!(
        format!("{}_chapters_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total chapters created"
    );

    describe_counter!(
        format!("{}_chapters_deleted_total", METRICS_PREFIX),
        Unit::Count,
        "Total chapters deleted"
    );

    describe_counter!(
        format!("{}_chapters_reordered_total", METRICS_PREFIX),
        Unit::Count,
        "Total reorder operations applied"
    );

    describe_counter!(
        format!("{}_ordinal_repair_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Deletes whose renumber repair failed after retries"
    );

    // Engagement metrics
    describe_counter!(
        format!("{}_views_recorded_total", METRICS_PREFIX),
        Unit::Count,
        "Total chapter view events recorded"
    );

    describe_counter!(
        format!("{}_votes_toggled_total", METRICS_PREFIX),
        Unit::Count,
        "Total vote toggle operations"
    );

    tracing::info!("Metrics registered");
}

/// Start the Prometheus exporter on the given port
///
/// A port of 0 disables the exporter.
pub fn init_exporter(port: u16) -> Result<()> {
    if port == 0 {
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to start metrics exporter: {}", e),
        })?;

    tracing::info!(port = port, "Prometheus exporter listening");
    Ok(())
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}
