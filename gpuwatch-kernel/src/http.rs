/**
 * HTTP FACADE - read-only view of the node registry
 *
 * ROUTES :
 * - GET /                  embedded dashboard
 * - GET /health            plain "OK" liveness probe
 * - GET /api/health        poller bookkeeping and liveness counts
 * - GET /api/nodes         every HostStatus, in config order
 * - GET /api/nodes/{name}  one HostStatus, 404 if the name is not configured
 *
 * Handlers never trigger a fetch; they only copy out what the poller wrote.
 */

use crate::health::{AggregatorHealth, PollerHealth};
use crate::models::HostStatus;
use crate::registry::NodeRegistry;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

const DASHBOARD: &str = include_str!("../assets/index.html");

#[derive(Clone)]
pub struct AppState {
    pub registry: NodeRegistry,
    pub health: PollerHealth,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(|| async { "OK" }))
        .route("/api/health", get(api_health))
        .route("/api/nodes", get(list_nodes))
        .route("/api/nodes/{name}", get(get_node))
        .with_state(state)
}

async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD)
}

async fn api_health(State(app): State<AppState>) -> Json<AggregatorHealth> {
    Json(app.health.get_health(&app.registry))
}

async fn list_nodes(State(app): State<AppState>) -> Json<Vec<HostStatus>> {
    Json(app.registry.get_all())
}

async fn get_node(State(app): State<AppState>, Path(name): Path<String>) -> Response {
    match app.registry.get(&name) {
        Ok(record) => Json(record).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Node not found").into_response(),
    }
}
