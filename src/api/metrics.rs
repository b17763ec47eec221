//! Prometheus metrics endpoint and HTTP request tracking middleware.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;

use crate::db::{Qualification, User};
use crate::AppState;

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const ADDRESS_SYNC_RUNS_TOTAL: &str = "address_sync_runs_total";
pub const ADDRESS_SYNC_RECORDS_TOTAL: &str = "address_sync_records_total";
pub const QUALIFICATIONS_TOTAL: &str = "qualifications_total";
pub const USERS_WITHOUT_ADDRESS: &str = "users_without_address";
pub const QUALIFICATIONS_WITH_LOCATION: &str = "qualifications_with_location";

/// Install the Prometheus recorder. Call once at startup.
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );
    describe_counter!(ADDRESS_SYNC_RUNS_TOTAL, "Completed address sync batch runs");
    describe_counter!(
        ADDRESS_SYNC_RECORDS_TOTAL,
        "Qualification records processed by address sync, by outcome"
    );
    describe_counter!(QUALIFICATIONS_TOTAL, "Qualification checks by result");
    describe_gauge!(USERS_WITHOUT_ADDRESS, "Users that have no address on record");
    describe_gauge!(
        QUALIFICATIONS_WITH_LOCATION,
        "Qualification records carrying a location"
    );

    Ok(handle)
}

/// GET /metrics - Prometheus text format, no authentication.
pub async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if let Ok(coverage) = User::address_coverage(&state.db).await {
        gauge!(USERS_WITHOUT_ADDRESS).set((coverage.total - coverage.with_address) as f64);
    }
    if let Ok(count) = Qualification::count_with_location(&state.db).await {
        gauge!(QUALIFICATIONS_WITH_LOCATION).set(count as f64);
    }

    match state.metrics_handle.as_ref() {
        Some(h) => (StatusCode::OK, h.render()),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Metrics not initialized".to_string(),
        ),
    }
}

/// Records `http_requests_total` and `http_request_duration_seconds`.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();

    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let method = request.method().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!(HTTP_REQUESTS_TOTAL, "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!(HTTP_REQUEST_DURATION_SECONDS, "method" => method, "path" => path).record(duration);

    response
}

pub fn record_sync_run() {
    counter!(ADDRESS_SYNC_RUNS_TOTAL).increment(1);
}

/// `outcome` is `synced` or `error`
pub fn record_sync_record(outcome: &'static str) {
    counter!(ADDRESS_SYNC_RECORDS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_qualification(result: &'static str) {
    counter!(QUALIFICATIONS_TOTAL, "result" => result).increment(1);
}
