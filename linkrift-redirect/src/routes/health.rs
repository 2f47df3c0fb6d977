use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use linkrift_shared::types::HealthResponse;

use crate::AppState;

/// `GET /health` -- the wire contract is exactly
/// `{"status":"ok","service":"linkrift-redirect"}`.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok("linkrift-redirect"))
}

/// `GET /metrics` -- Prometheus exposition text.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state.metrics.render()
}
