//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with latency-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Labsite metrics
pub const METRICS_PREFIX: &str = "labsite";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms - upload-heavy writes land here
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
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

    // Content metrics
    describe_counter!(
        format!("{}_content_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Composite content writes by operation"
    );

    describe_counter!(
        format!("{}_content_blocks_written_total", METRICS_PREFIX),
        Unit::Count,
        "Content blocks inserted, updated or deleted"
    );

    describe_histogram!(
        format!("{}_content_write_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Composite content write latency in seconds"
    );

    // Storage metrics
    describe_counter!(
        format!("{}_file_operations_total", METRICS_PREFIX),
        Unit::Count,
        "Stored file writes and deletes"
    );

    tracing::info!("Metrics registered");
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

/// Block-level change counts of one composite write
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BlockChanges {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Helper to record a composite content write (create / update / delete)
pub fn record_content_write(operation: &str, changes: BlockChanges, duration_secs: f64) {
    counter!(
        format!("{}_content_writes_total", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .increment(1);

    for (change, count) in [
        ("inserted", changes.inserted),
        ("updated", changes.updated),
        ("deleted", changes.deleted),
    ] {
        if count > 0 {
            counter!(
                format!("{}_content_blocks_written_total", METRICS_PREFIX),
                "change" => change
            )
            .increment(count as u64);
        }
    }

    histogram!(
        format!("{}_content_write_duration_seconds", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .record(duration_secs);
}

/// Helper to record a stored-file write or delete
pub fn record_file_operation(operation: &str, backend: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_file_operations_total", METRICS_PREFIX),
        "operation" => operation.to_string(),
        "backend" => backend.to_string(),
        "status" => status
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("GET", "/api/research");
        metrics.finish(200);
        // Just verify it runs without panic (no recorder installed)
    }

    #[test]
    fn test_content_write_metrics() {
        record_content_write(
            "update",
            BlockChanges { inserted: 2, updated: 1, deleted: 0 },
            0.01,
        );
        record_file_operation("delete", "memory", true);
    }
}
