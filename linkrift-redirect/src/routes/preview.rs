use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;

use linkrift_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::PreviewResponse;
use crate::AppState;

/// `GET /:short_code/preview` -- snapshot summary as JSON. Never tracked.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(short_code): Path<String>,
) -> AppResult<Json<PreviewResponse>> {
    let snapshot = state
        .resolver
        .resolve(&short_code)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::LinkNotFound, "link not found"))?;

    Ok(Json(PreviewResponse {
        short_code: snapshot.short_code.clone(),
        destination_url: snapshot.destination_url.clone(),
        is_active: snapshot.is_active,
        has_password: snapshot.has_password,
        is_expired: snapshot.is_expired(Utc::now()),
    }))
}
