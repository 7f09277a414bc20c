//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sitemap_requests_total` (counter): responses by kind (leaf, index) and status
//! - `sitemap_cache_lookups_total` (counter): lookups by kind and outcome (hit, rebuilt, stale)
//! - `sitemap_rebuild_duration_seconds` (histogram): supplier + normalization time
//! - `sitemap_registered_paths` (gauge): registered sitemap paths
//! - `sitemap_refresh_failures_total` (counter): failed background refreshes

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(kind: &'static str, status: u16) {
    ::metrics::counter!("sitemap_requests_total", "kind" => kind, "status" => status.to_string())
        .increment(1);
}

pub fn record_cache_lookup(kind: &'static str, outcome: &'static str) {
    ::metrics::counter!("sitemap_cache_lookups_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
}

pub fn record_rebuild(kind: &'static str, elapsed: Duration) {
    ::metrics::histogram!("sitemap_rebuild_duration_seconds", "kind" => kind)
        .record(elapsed.as_secs_f64());
}

pub fn record_registered_paths(count: usize) {
    ::metrics::gauge!("sitemap_registered_paths").set(count as f64);
}

pub fn record_refresh_failure() {
    ::metrics::counter!("sitemap_refresh_failures_total").increment(1);
}
