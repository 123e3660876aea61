//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define API metrics (requests, latency, cache effectiveness, auth outcomes)
//! - Render the Prometheus text format for `/actuator/prometheus`
//!
//! # Metrics
//! - `acme_http_requests_total` (counter): requests by method, path, status
//! - `acme_http_request_duration_seconds` (histogram): latency distribution
//! - `acme_cache_requests_total` (counter): cache lookups by cache, result
//! - `acme_directory_lookups_total` (counter): backend lookups by backend, outcome
//! - `acme_authentications_total` (counter): authentication outcomes
//!
//! # Design Decisions
//! - The recorder is process-global and installed at most once
//! - Path labels use the matched route template, never the raw path

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

const DURATION_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

fn describe() {
    describe_counter!("acme_http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "acme_http_request_duration_seconds",
        "HTTP request latency in seconds"
    );
    describe_counter!(
        "acme_cache_requests_total",
        "Cache lookups by cache name and hit/miss"
    );
    describe_counter!(
        "acme_directory_lookups_total",
        "User directory lookups by backend and outcome"
    );
    describe_counter!(
        "acme_authentications_total",
        "Header authentication attempts by outcome"
    );
}

fn install() -> Option<PrometheusHandle> {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &DURATION_BUCKETS,
        )
        .map_err(|e| tracing::error!(error = %e, "Invalid histogram buckets"))
        .ok()?;

    match builder.install_recorder() {
        Ok(handle) => {
            describe();
            tracing::info!("Prometheus recorder installed");
            Some(handle)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

/// Install the global recorder if needed and return its handle.
pub fn init_metrics() -> Option<PrometheusHandle> {
    HANDLE.get_or_init(install).clone()
}

/// Periodically drain histogram buffers so memory stays bounded.
pub fn spawn_upkeep(handle: PrometheusHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            handle.run_upkeep();
        }
    })
}

pub fn record_request(method: &str, path: &str, status: u16, start: Instant) {
    counter!("acme_http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!("acme_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(cache: &'static str, hit: bool) {
    counter!("acme_cache_requests_total",
        "cache" => cache,
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

pub fn record_directory_lookup(backend: &'static str, outcome: &'static str) {
    counter!("acme_directory_lookups_total",
        "backend" => backend,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_authentication(outcome: &'static str) {
    counter!("acme_authentications_total", "outcome" => outcome).increment(1);
}

/// Record count and latency for every request passing through.
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;
    record_request(&method, &path, response.status().as_u16(), start);
    response
}
