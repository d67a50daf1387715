//! HTTP handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::debug;

use gcpstate_metrics::CONTENT_TYPE;

use crate::ApiState;

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let body = state.collector.render();
    debug!(bytes = body.len(), "metrics scraped");
    (StatusCode::OK, [("content-type", CONTENT_TYPE)], body)
}

/// GET /
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}
