//! Prometheus metrics for finboard-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Reconciliation run counter by outcome.
pub static SYNC_RUNS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finboard_sync_runs_total",
        "Total number of item reconciliation runs",
        &["status"] // ok, empty, error
    )
    .expect("Failed to register sync_runs_total")
});

/// Synced transaction deltas by kind.
pub static SYNC_TRANSACTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finboard_sync_transactions_total",
        "Total number of transaction deltas applied during sync",
        &["kind"] // added, modified, removed, skipped
    )
    .expect("Failed to register sync_transactions_total")
});

/// Items linked by outcome.
pub static ITEMS_LINKED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finboard_items_linked_total",
        "Total number of item link attempts",
        &["outcome"] // live, empty, error
    )
    .expect("Failed to register items_linked_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "finboard_errors_total",
        "Total number of errors by type",
        &["error_type"] // db_error, aggregator_error
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "finboard_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&SYNC_RUNS_TOTAL);
    Lazy::force(&SYNC_TRANSACTIONS_TOTAL);
    Lazy::force(&ITEMS_LINKED_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
