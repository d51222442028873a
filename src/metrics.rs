// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for zonesync.
//!
//! All metrics carry the namespace prefix `zonesync_`. A run is a one-shot
//! process, so the binary renders the registry with [`gather_metrics`] and writes
//! it to a file (for a node-exporter textfile collector or a CI artifact) instead
//! of serving `/metrics`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - runs, their outcome and duration
//! - **Record Metrics** - records planned for creation, deletion or protected
//! - **Operation Metrics** - RRSet operations sent to the provider
//! - **Error Metrics** - errors by stable reason code
//!
//! # Example
//!
//! ```rust,no_run
//! use zonesync::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("full", std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all zonesync metrics
const METRICS_NAMESPACE: &str = "zonesync";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Metric definitions below are constants; construction and registration can only
// fail on a programming error (invalid name or duplicate registration).

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliation runs by mode and status
///
/// Labels:
/// - `mode`: `full` or `incremental`
/// - `status`: `success`, `error` or `dry_run`
pub static RECONCILIATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_reconciliations_total"),
        "Total number of reconciliation runs by mode and status",
    );
    let counter = CounterVec::new(opts, &["mode", "status"]).expect("valid metric definition");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registered once");
    counter
});

/// Duration of reconciliation runs in seconds
///
/// Labels:
/// - `mode`: `full` or `incremental`
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliation runs in seconds by mode",
    )
    .buckets(vec![0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]);
    let histogram = HistogramVec::new(opts, &["mode"]).expect("valid metric definition");
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("metric registered once");
    histogram
});

// ============================================================================
// Record Metrics
// ============================================================================

/// Records considered by the diff
///
/// Labels:
/// - `action`: `create`, `delete` or `protected`
pub static RECORDS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_records_total"),
        "Records considered by the diff, by action",
    );
    let counter = CounterVec::new(opts, &["action"]).expect("valid metric definition");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registered once");
    counter
});

// ============================================================================
// Operation Metrics
// ============================================================================

/// RRSet operations sent to the provider
///
/// Labels:
/// - `changetype`: `REPLACE` or `DELETE`
/// - `status`: `success` or `failure`
pub static OPERATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_operations_total"),
        "RRSet operations sent to the provider by change type and status",
    );
    let counter =
        CounterVec::new(opts, &["changetype", "status"]).expect("valid metric definition");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registered once");
    counter
});

// ============================================================================
// Error Metrics
// ============================================================================

/// Errors by reason code
///
/// Labels:
/// - `kind`: stable reason code (see `SyncError::status_reason`)
pub static ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_errors_total"),
        "Errors by reason code",
    );
    let counter = CounterVec::new(opts, &["kind"]).expect("valid metric definition");
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect("metric registered once");
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
///
/// # Arguments
/// * `mode` - `full` or `incremental`
/// * `duration` - Duration of the run
pub fn record_reconciliation_success(mode: &str, duration: Duration) {
    record_reconciliation(mode, "success", duration);
}

/// Record a failed reconciliation
///
/// # Arguments
/// * `mode` - `full` or `incremental`
/// * `duration` - Duration of the run before failure
pub fn record_reconciliation_error(mode: &str, duration: Duration) {
    record_reconciliation(mode, "error", duration);
}

/// Record a dry-run reconciliation
pub fn record_reconciliation_dry_run(mode: &str, duration: Duration) {
    record_reconciliation(mode, "dry_run", duration);
}

fn record_reconciliation(mode: &str, status: &str, duration: Duration) {
    RECONCILIATIONS_TOTAL
        .with_label_values(&[mode, status])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[mode])
        .observe(duration.as_secs_f64());
}

/// Record records considered by the diff
///
/// # Arguments
/// * `action` - `create`, `delete` or `protected`
/// * `count` - Number of records
#[allow(clippy::cast_precision_loss)]
pub fn record_records(action: &str, count: usize) {
    RECORDS_TOTAL
        .with_label_values(&[action])
        .inc_by(count as f64);
}

/// Record provider operations
///
/// # Arguments
/// * `changetype` - `REPLACE` or `DELETE`
/// * `status` - `success` or `failure`
/// * `count` - Number of operations
#[allow(clippy::cast_precision_loss)]
pub fn record_operations(changetype: &str, status: &str, count: usize) {
    OPERATIONS_TOTAL
        .with_label_values(&[changetype, status])
        .inc_by(count as f64);
}

/// Record an error
///
/// # Arguments
/// * `kind` - Stable reason code (e.g., `ProviderTimeout`)
pub fn record_error(kind: &str) {
    ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation_success() {
        let mode = "test_success_mode";
        record_reconciliation_success(mode, Duration::from_millis(500));

        let counter = RECONCILIATIONS_TOTAL.with_label_values(&[mode, "success"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[mode]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_reconciliation_error() {
        let mode = "test_error_mode";
        record_reconciliation_error(mode, Duration::from_millis(250));

        let counter = RECONCILIATIONS_TOTAL.with_label_values(&[mode, "error"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_record_operations_adds_count() {
        let before = OPERATIONS_TOTAL
            .with_label_values(&["TESTOP", "success"])
            .get();
        record_operations("TESTOP", "success", 3);
        let after = OPERATIONS_TOTAL
            .with_label_values(&["TESTOP", "success"])
            .get();

        #[allow(clippy::float_cmp)]
        {
            assert_eq!(after - before, 3.0);
        }
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation_success("gather_test", Duration::from_millis(100));
        record_error("GatherTest");

        let metrics_text = gather_metrics().unwrap();
        assert!(
            metrics_text.contains("zonesync_reconciliations_total"),
            "Metrics should contain reconciliation counter"
        );
        assert!(metrics_text.contains("zonesync_errors_total"));
    }
}
