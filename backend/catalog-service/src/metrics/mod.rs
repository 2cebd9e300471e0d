//! Catalog Service Metrics
//!
//! Prometheus metrics for category snapshots and top-product lookups

use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Duration;

static LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "catalog_top_products_lookups_total",
        "Top-product lookups by outcome",
        &["outcome"]
    )
    .expect("Failed to register catalog lookups metric")
});

static LOOKUP_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "catalog_top_products_duration_seconds",
        "Duration of top-product lookups",
        &["include_descendants"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register catalog lookup duration metric")
});

static SNAPSHOT_REBUILDS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "catalog_category_snapshot_rebuilds_total",
        "Category snapshot rebuilds"
    )
    .expect("Failed to register snapshot rebuilds metric")
});

static SNAPSHOT_CATEGORIES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "catalog_category_snapshot_size",
        "Categories in the current snapshot"
    )
    .expect("Failed to register snapshot size metric")
});

static INTEGRITY_ISSUES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "catalog_category_integrity_issues_total",
        "Category records rejected while building the hierarchy",
        &["kind"]
    )
    .expect("Failed to register integrity issues metric")
});

/// Record lookup result (ok, not_found, validation, ...)
pub fn record_lookup(outcome: &str) {
    LOOKUPS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record lookup duration
pub fn record_lookup_duration(include_descendants: bool, duration: Duration) {
    let label = if include_descendants { "true" } else { "false" };
    LOOKUP_DURATION_SECONDS
        .with_label_values(&[label])
        .observe(duration.as_secs_f64());
}

/// Record a snapshot rebuild and its size
pub fn record_snapshot_rebuild(categories: usize) {
    SNAPSHOT_REBUILDS_TOTAL.inc();
    SNAPSHOT_CATEGORIES.set(i64::try_from(categories).unwrap_or(i64::MAX));
}

/// Record an integrity issue by kind
pub fn record_integrity_issue(kind: &str) {
    INTEGRITY_ISSUES_TOTAL.with_label_values(&[kind]).inc();
}

/// GET /metrics
pub async fn metrics_handler() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", err);
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
