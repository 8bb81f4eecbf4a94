use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use panelstore_backend::api::{self, AppState};
use panelstore_backend::catalog::PlanCatalog;
use panelstore_backend::config::AppConfig;
use panelstore_backend::logging::init_tracing;
use panelstore_backend::notify::{HttpMailer, NotificationDispatcher, TelegramNotifier};
use panelstore_backend::panel::PanelGateways;
use panelstore_backend::payments::QrisGateway;
use panelstore_backend::services::{
    CheckoutService, PaymentReconciler, Provisioner, WarrantyService,
};
use panelstore_backend::store::{postgres, PgTransactionStore, TransactionStore};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!(e)
    })?;
    init_tracing(&config.logging);
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        "Starting panel storefront backend"
    );

    info!("Initializing database connection pool...");
    let pool = postgres::init_pool(&config.database).await.map_err(|e| {
        error!("Failed to initialize database pool: {}", e);
        anyhow::anyhow!(e)
    })?;
    postgres::ensure_schema(&pool).await?;
    info!(
        max_connections = config.database.max_connections,
        "Database connection pool initialized"
    );

    let store: Arc<dyn TransactionStore> = Arc::new(PgTransactionStore::new(pool.clone()));

    info!("Initializing panel gateways...");
    let panels = PanelGateways::from_config(&config.panels)?;
    info!(
        private = %config.panels.private.domain,
        public = %config.panels.public.domain,
        "Panel gateways initialized"
    );

    let gateway = Arc::new(QrisGateway::new(config.gateway.clone())?);
    let catalog = Arc::new(PlanCatalog::defaults());

    let dispatcher = NotificationDispatcher::new(
        Arc::new(HttpMailer::new(&config.notify)?),
        Arc::new(TelegramNotifier::new(config.notify.telegram.clone())?),
    );

    let provisioner = Arc::new(Provisioner::new(panels.clone()));
    let checkout = CheckoutService::new(
        Arc::clone(&store),
        Arc::clone(&gateway),
        Arc::clone(&catalog),
        config.fees.clone(),
    );
    let reconciler = PaymentReconciler::new(
        Arc::clone(&store),
        Arc::clone(&gateway),
        Arc::clone(&catalog),
        Arc::clone(&provisioner),
        dispatcher.clone(),
    );
    let warranty = WarrantyService::new(
        Arc::clone(&store),
        panels.clone(),
        Arc::clone(&catalog),
        Arc::clone(&provisioner),
        dispatcher,
        config.warranty.clone(),
    );

    let state = Arc::new(AppState {
        checkout,
        reconciler,
        warranty,
        panels,
        catalog,
        pool: Some(pool),
    });

    let app = api::router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id()),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind {}: {}", addr, e);
        anyhow::anyhow!(e)
    })?;

    info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
