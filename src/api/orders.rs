use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::info;

use serde::Serialize;

use crate::api::AppState;
use crate::catalog::Plan;
use crate::error::AppError;
use crate::services::checkout::HistoryEntry;
use crate::services::{CreateOrder, CreatedOrder, ReconcileOutcome};
use crate::store::Transaction;

/// GET /api/plans
pub async fn list_plans(State(state): State<Arc<AppState>>) -> Json<Vec<Plan>> {
    Json(state.catalog.all().to_vec())
}

/// POST /api/orders
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateOrder>,
) -> Result<Json<CreatedOrder>, AppError> {
    info!(plan = %request.plan_id, panel = %request.panel_kind, "checkout requested");
    let created = state.checkout.create_order(request).await?;
    Ok(Json(created))
}

/// GET /api/orders/{id}
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = state.checkout.get_order(&id).await?;
    Ok(Json(transaction))
}

/// POST /api/orders/{id}/check
///
/// The QR page polls this; the reconciler makes repeated calls safe.
pub async fn check_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReconcileOutcome>, AppError> {
    let outcome = state.reconciler.reconcile(&id).await?;
    Ok(Json(outcome))
}

/// GET /api/transactions
pub async fn history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let entries = state.checkout.history().await?;
    Ok(Json(entries))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_users: u64,
    pub total_servers: u64,
    pub total_purchases: u64,
}

/// GET /api/stats
///
/// Every completed purchase corresponds to one provisioned server.
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.checkout.stats().await?;
    Ok(Json(StatsResponse {
        total_users: stats.total_users,
        total_servers: stats.total_purchases,
        total_purchases: stats.total_purchases,
    }))
}
