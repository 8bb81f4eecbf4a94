use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::api::AppState;

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health/live
pub async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

/// GET /health/ready
///
/// Ready only when the database answers; the external gateways are not
/// probed here, their failures surface per-request.
pub async fn readiness(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.pool {
        Some(pool) => match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => (StatusCode::OK, Json(json!({"database": "ok"}))),
            Err(e) => {
                error!(error = %e, "readiness check failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({"database": "unavailable"})),
                )
            }
        },
        None => (StatusCode::OK, Json(json!({"database": "in-memory"}))),
    }
}
