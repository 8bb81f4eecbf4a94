use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::api::AppState;
use crate::error::AppError;
use crate::services::WarrantyStatus;
use crate::store::PanelDetails;

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub email: String,
}

/// GET /api/warranty/{id}
pub async fn warranty_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WarrantyStatus>, AppError> {
    let status = state.warranty.status(&id).await?;
    Ok(Json(status))
}

/// POST /api/warranty/{id}/claim
pub async fn claim_warranty(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ClaimRequest>,
) -> Result<Json<PanelDetails>, AppError> {
    info!(transaction_id = %id, "warranty claim requested");
    let details = state.warranty.claim(&id, &request.email).await?;
    Ok(Json(details))
}
