//! gcpstate-api — HTTP surface of the exporter.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus exposition |
//! | GET | `/` (and anything else) | Liveness, always 200 |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use gcpstate_metrics::GcpCollector;

/// Shared state for handlers.
#[derive(Clone)]
pub struct ApiState {
    pub collector: Arc<GcpCollector>,
}

/// Build the exporter router.
pub fn build_router(collector: Arc<GcpCollector>) -> Router {
    let state = ApiState { collector };

    Router::new()
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/", get(handlers::liveness))
        .fallback(handlers::liveness)
        .with_state(state)
}
