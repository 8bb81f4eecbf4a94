use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::AppState;
use crate::error::AppError;
use crate::panel::PanelKind;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub panel: Option<PanelKind>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub username_exists: bool,
    pub email_exists: bool,
}

/// GET /api/availability
///
/// Pre-checks a username/email pair against the target panel's user list.
/// A panel failure propagates as an error; it never reads as "available".
pub async fn check_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let kind = query.panel.unwrap_or(PanelKind::Private);
    let users = state.panels.get(kind).list_users().await?;

    let username_exists = users
        .iter()
        .any(|u| u.username.eq_ignore_ascii_case(&query.username));
    let email_exists = users
        .iter()
        .any(|u| u.email.eq_ignore_ascii_case(&query.email));

    Ok(Json(AvailabilityResponse {
        username_exists,
        email_exists,
    }))
}
