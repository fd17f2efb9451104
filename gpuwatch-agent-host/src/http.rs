//! HTTP surface of the collector
//!
//! - `GET /gpu-info` -> HostTelemetry JSON, or 500 with the failure as plain text
//! - `GET /health`   -> "OK"

use crate::collector::Collector;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::warn;

pub fn build_router(collector: Arc<Collector>) -> Router {
    Router::new()
        .route("/gpu-info", get(gpu_info))
        .route("/health", get(|| async { "OK" }))
        .with_state(collector)
}

async fn gpu_info(State(collector): State<Arc<Collector>>) -> Response {
    match collector.get_telemetry().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => {
            warn!("GPU info request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to get GPU info: {e}"),
            )
                .into_response()
        }
    }
}
