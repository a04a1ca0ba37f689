//! Prometheus metrics for crawl progress and latency.
//!
//! This module provides metrics for:
//! - Page fetch latency and failures
//! - Market evaluation latency
//! - Nodes skipped during traversal
//! - Opportunities detected

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Page fetch latency metric name.
pub const METRIC_PAGE_FETCH_LATENCY: &str = "page_fetch_latency_ms";
/// Market evaluation latency metric name.
pub const METRIC_EVALUATION_LATENCY: &str = "market_evaluation_latency_ms";
/// Pages fetched counter metric name.
pub const METRIC_PAGES_FETCHED: &str = "pages_fetched_total";
/// Fetch failures counter metric name.
pub const METRIC_FETCH_FAILURES: &str = "page_fetch_failures_total";
/// Parse failures counter metric name.
pub const METRIC_PARSE_FAILURES: &str = "market_parse_failures_total";
/// Markets evaluated counter metric name.
pub const METRIC_MARKETS_EVALUATED: &str = "markets_evaluated_total";
/// Nodes skipped counter metric name.
pub const METRIC_NODES_SKIPPED: &str = "crawl_nodes_skipped_total";
/// Opportunities detected counter metric name.
pub const METRIC_OPPORTUNITIES_DETECTED: &str = "opportunities_detected_total";

/// Install the Prometheus recorder and return a handle for rendering.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_PAGE_FETCH_LATENCY,
        "Page fetch latency in milliseconds"
    );
    describe_histogram!(
        METRIC_EVALUATION_LATENCY,
        "Odds table extraction and evaluation latency in milliseconds"
    );

    describe_counter!(METRIC_PAGES_FETCHED, "Total number of pages fetched");
    describe_counter!(
        METRIC_FETCH_FAILURES,
        "Total number of page fetches that failed"
    );
    describe_counter!(
        METRIC_PARSE_FAILURES,
        "Total number of market pages with an unusable odds table"
    );
    describe_counter!(
        METRIC_MARKETS_EVALUATED,
        "Total number of market pages evaluated"
    );
    describe_counter!(
        METRIC_NODES_SKIPPED,
        "Total number of crawl nodes skipped, by reason"
    );
    describe_counter!(
        METRIC_OPPORTUNITIES_DETECTED,
        "Total number of arbitrage opportunities detected"
    );

    debug!("Metrics initialized");
}

/// Record page fetch latency.
pub fn record_page_fetch_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_PAGE_FETCH_LATENCY).record(latency_ms);
}

/// Record market evaluation latency.
pub fn record_evaluation_latency(start: Instant) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_EVALUATION_LATENCY).record(latency_ms);
}

/// Increment pages fetched counter.
pub fn inc_pages_fetched() {
    counter!(METRIC_PAGES_FETCHED).increment(1);
}

/// Increment fetch failures counter.
pub fn inc_fetch_failures() {
    counter!(METRIC_FETCH_FAILURES).increment(1);
}

/// Increment parse failures counter.
pub fn inc_parse_failures() {
    counter!(METRIC_PARSE_FAILURES).increment(1);
}

/// Increment markets evaluated counter.
pub fn inc_markets_evaluated() {
    counter!(METRIC_MARKETS_EVALUATED).increment(1);
}

/// Increment nodes skipped counter.
pub fn inc_nodes_skipped(reason: &'static str) {
    counter!(METRIC_NODES_SKIPPED, "reason" => reason).increment(1);
}

/// Increment opportunities detected counter.
pub fn inc_opportunities_detected() {
    counter!(METRIC_OPPORTUNITIES_DETECTED).increment(1);
}
