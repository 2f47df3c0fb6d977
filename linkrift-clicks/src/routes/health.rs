use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use diesel::prelude::*;

use linkrift_shared::types::{HealthCheck, HealthResponse, HealthStatus, CLICK_QUEUE_KEY};

use crate::WorkerState;

/// `GET /health` -- store and cache connectivity, plus queue depth.
pub async fn health_check(State(state): State<Arc<WorkerState>>) -> Json<HealthResponse> {
    let database = match state.db.get() {
        Ok(mut conn) => match diesel::sql_query("SELECT 1").execute(&mut conn) {
            Ok(_) => HealthStatus::Ok,
            Err(_) => HealthStatus::Unhealthy,
        },
        Err(_) => HealthStatus::Unhealthy,
    };

    let (cache, queue_depth) = match state.redis.llen(CLICK_QUEUE_KEY).await {
        Ok(depth) => (HealthStatus::Ok, Some(depth)),
        Err(_) => (HealthStatus::Unhealthy, None),
    };

    Json(HealthResponse::ok("linkrift-clicks").with_checks(vec![
        HealthCheck {
            name: "database".into(),
            status: database,
            message: None,
        },
        HealthCheck {
            name: "redis".into(),
            status: cache,
            message: queue_depth.map(|depth| format!("queue depth {depth}")),
        },
    ]))
}

/// `GET /metrics` -- Prometheus exposition text.
pub async fn metrics(State(state): State<Arc<WorkerState>>) -> String {
    state.metrics.render()
}
