use crate::models::api::HealthResponse;
use axum::{http::StatusCode, response::IntoResponse, Json};
use std::time::{SystemTime, UNIX_EPOCH};

/// Health check handler
///
/// GET /health
pub async fn health_handler() -> impl IntoResponse {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            timestamp,
        }),
    )
}
