use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use diesel::prelude::*;

use linkrift_shared::types::{HealthCheck, HealthResponse, HealthStatus};

use crate::WorkerState;

/// `GET /health` -- store connectivity.
pub async fn health_check(State(state): State<Arc<WorkerState>>) -> Json<HealthResponse> {
    let database = match state.db.get() {
        Ok(mut conn) => match diesel::sql_query("SELECT 1").execute(&mut conn) {
            Ok(_) => HealthStatus::Ok,
            Err(_) => HealthStatus::Unhealthy,
        },
        Err(_) => HealthStatus::Unhealthy,
    };

    Json(HealthResponse::ok("linkrift-webhooks").with_checks(vec![HealthCheck {
        name: "database".into(),
        status: database,
        message: None,
    }]))
}

/// `GET /metrics` -- Prometheus exposition text.
pub async fn metrics(State(state): State<Arc<WorkerState>>) -> String {
    state.metrics.render()
}
