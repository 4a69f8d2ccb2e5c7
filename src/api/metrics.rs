//! Operational endpoints
//!
//! Prometheus metrics and a liveness check.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Encoder, TextEncoder};

use crate::AppState;
use crate::metrics::REGISTRY;

/// Metrics endpoint handler
///
/// Returns all metrics in Prometheus text format.
async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_text) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, encoder.format_type())],
            metrics_text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

/// Liveness plus a database round trip
async fn health_check(State(state): State<AppState>) -> Response {
    match state.db.count_rows("users").await {
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(error) => {
            tracing::error!(%error, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable").into_response()
        }
    }
}

/// Create the `/metrics` and `/health` router
pub fn ops_router() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_check))
}
