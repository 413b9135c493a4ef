//! Metrics module for keyrelay
//!
//! This module provides optional metrics emission for monitoring the relay.
//! Enable with the `metrics` feature flag.
//!
//! # Example
//!
//! ```ignore
//! use keyrelay::metrics::describe_metrics;
//! use metrics_exporter_prometheus::PrometheusBuilder;
//!
//! // User sets up their preferred exporter
//! // Note: requires `metrics-exporter-prometheus` in your dependencies
//! PrometheusBuilder::new()
//!     .with_http_listener(([127, 0, 0, 1], 9090))
//!     .install()
//!     .expect("prometheus setup");
//!
//! // Describe metrics (optional, improves Prometheus discovery)
//! describe_metrics();
//! ```

pub mod labels;
mod recorder;

pub use recorder::*;

/// Metric name constants
pub mod names {
    /// Total number of upstream attempts, by outcome
    pub const ATTEMPTS_TOTAL: &str = "relay_attempts_total";
    /// Total number of moves to the next credential
    pub const FAILOVERS_TOTAL: &str = "relay_failovers_total";
    /// Total number of requests that ended without a success, by reason
    pub const FAILURES_TOTAL: &str = "relay_failures_total";
    /// Total number of swallowed logging failures, by stage
    pub const LOG_FAILURES_TOTAL: &str = "relay_log_failures_total";
    /// Generation request duration in seconds
    pub const REQUEST_DURATION: &str = "relay_request_duration_seconds";
}

/// Describe all metrics with their units and descriptions.
/// Call this after setting up your metrics exporter for better discovery.
pub fn describe_metrics() {
    use metrics::{describe_counter, describe_histogram, Unit};

    describe_counter!(
        names::ATTEMPTS_TOTAL,
        Unit::Count,
        "Total number of upstream attempts by outcome"
    );
    describe_counter!(
        names::FAILOVERS_TOTAL,
        Unit::Count,
        "Total number of moves to the next credential"
    );
    describe_counter!(
        names::FAILURES_TOTAL,
        Unit::Count,
        "Total number of requests that ended without a success by reason"
    );
    describe_counter!(
        names::LOG_FAILURES_TOTAL,
        Unit::Count,
        "Total number of swallowed logging failures by stage"
    );
    describe_histogram!(
        names::REQUEST_DURATION,
        Unit::Seconds,
        "Generation request duration in seconds"
    );
}
