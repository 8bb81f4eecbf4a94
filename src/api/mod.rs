//! HTTP surface
//!
//! The storefront's server actions as an axum API: checkout, invoice view,
//! payment polling, availability pre-check, warranty, history, and health
//! probes.

pub mod availability;
pub mod health;
pub mod orders;
pub mod warranty;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;

use crate::catalog::PlanCatalog;
use crate::panel::PanelGateways;
use crate::services::{CheckoutService, PaymentReconciler, WarrantyService};

/// Shared handler state.
pub struct AppState {
    pub checkout: CheckoutService,
    pub reconciler: PaymentReconciler,
    pub warranty: WarrantyService,
    pub panels: PanelGateways,
    pub catalog: Arc<PlanCatalog>,
    /// Absent when running against the in-memory store.
    pub pool: Option<PgPool>,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/api/plans", get(orders::list_plans))
        .route("/api/orders", post(orders::create_order))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/check", post(orders::check_order))
        .route("/api/transactions", get(orders::history))
        .route("/api/stats", get(orders::stats))
        .route("/api/availability", get(availability::check_availability))
        .route("/api/warranty/{id}", get(warranty::warranty_status))
        .route("/api/warranty/{id}/claim", post(warranty::claim_warranty))
        .with_state(state)
}
