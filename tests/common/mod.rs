//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use chrono::{Duration, Utc};
use std::sync::Arc;

use panelstore_backend::catalog::{AccessTier, PlanCatalog};
use panelstore_backend::config::{
    FeeConfig, GatewayConfig, PanelBackendConfig, PanelsConfig, WarrantyConfig,
};
use panelstore_backend::notify::{NotificationDispatcher, NullSink};
use panelstore_backend::panel::{PanelGateways, PanelKind};
use panelstore_backend::payments::QrisGateway;
use panelstore_backend::services::{PaymentReconciler, Provisioner, WarrantyService};
use panelstore_backend::store::{
    InMemoryTransactionStore, Transaction, TransactionStore, TxStatus,
};

pub fn panel_backend(base_url: &str) -> PanelBackendConfig {
    PanelBackendConfig {
        domain: base_url.trim_end_matches('/').to_string(),
        api_key: "ptla_test".to_string(),
        nest: "5".to_string(),
        egg: "15".to_string(),
        location: "1".to_string(),
    }
}

/// Both panel kinds pointed at the same mock server; retries disabled so
/// error-path tests stay fast.
pub fn panel_gateways(base_url: &str) -> PanelGateways {
    let config = PanelsConfig {
        private: panel_backend(base_url),
        public: panel_backend(base_url),
        timeout_secs: 5,
        max_retries: 0,
    };
    PanelGateways::from_config(&config).expect("panel gateways init")
}

pub fn gateway_config(base_url: &str) -> GatewayConfig {
    GatewayConfig {
        api_id: "API-TEST".to_string(),
        api_key: "secret".to_string(),
        create_url: format!("{}/api/create.php", base_url),
        status_url: format!("{}/api/status-transaction.php", base_url),
        callback_url: "https://shop.example/callback".to_string(),
        return_url: "https://shop.example/invoice".to_string(),
        expiry_hours: 24,
        timeout_secs: 5,
        max_retries: 0,
    }
}

pub fn qris_gateway(base_url: &str) -> Arc<QrisGateway> {
    Arc::new(QrisGateway::new(gateway_config(base_url)).expect("gateway init"))
}

pub fn dispatcher() -> NotificationDispatcher {
    NotificationDispatcher::new(Arc::new(NullSink), Arc::new(NullSink))
}

pub fn warranty_config() -> WarrantyConfig {
    WarrantyConfig {
        days: 12,
        replace_limit: 3,
    }
}

pub fn fee_config() -> FeeConfig {
    FeeConfig { min: 10, max: 50 }
}

/// A pending 1gb/private transaction as checkout would have written it.
pub fn pending_transaction(id: &str) -> Transaction {
    Transaction {
        transaction_id: id.to_string(),
        provider_transaction_id: format!("SKR-{}", id),
        username: "budi".to_string(),
        email: "budi@example.com".to_string(),
        plan_id: "1gb".to_string(),
        amount: 15000,
        fee: 12,
        total: 15012,
        qr_image_url: "https://cdn.example/qr.png".to_string(),
        expires_at: Utc::now() + Duration::hours(24),
        panel_kind: PanelKind::Private,
        access: AccessTier::Regular,
        status: TxStatus::Pending,
        created_at: Utc::now(),
        panel_details: None,
        replace_used: 0,
    }
}

pub struct Harness {
    pub store: Arc<InMemoryTransactionStore>,
    pub reconciler: PaymentReconciler,
    pub warranty: WarrantyService,
}

/// Wire the full service stack against mock gateway and panel servers.
pub fn harness(gateway_url: &str, panel_url: &str) -> Harness {
    let store = Arc::new(InMemoryTransactionStore::new());
    let store_dyn: Arc<dyn TransactionStore> = Arc::clone(&store) as Arc<dyn TransactionStore>;
    let panels = panel_gateways(panel_url);
    let provisioner = Arc::new(Provisioner::new(panels.clone()));
    let catalog = Arc::new(PlanCatalog::defaults());

    let reconciler = PaymentReconciler::new(
        Arc::clone(&store_dyn),
        qris_gateway(gateway_url),
        Arc::clone(&catalog),
        Arc::clone(&provisioner),
        dispatcher(),
    );
    let warranty = WarrantyService::new(
        store_dyn,
        panels,
        catalog,
        provisioner,
        dispatcher(),
        warranty_config(),
    );

    Harness {
        store,
        reconciler,
        warranty,
    }
}
