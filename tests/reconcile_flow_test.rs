//! End-to-end reconciliation: gateway poll → provisioning → persistence.

mod common;

use chrono::{Duration, Utc};
use panelstore_backend::error::{AppErrorKind, DomainError};
use panelstore_backend::store::{TransactionStore, TxStatus};

const PAID_BODY: &str = r#"{"status":"200","data":[{"status":"berhasil"}]}"#;
const FAILED_BODY: &str = r#"{"status":"200","data":[{"status":"gagal"}]}"#;
const EGG_BODY: &str = r#"{"attributes":{"startup":"node index.js",
    "docker_images":{"ghcr.io/parkervcp/yolks:nodejs_20":"ghcr.io/parkervcp/yolks:nodejs_20"}}}"#;
const USER_BODY: &str = r#"{"attributes":{"id":7,"username":"budi","email":"budi@example.com"}}"#;
const SERVER_BODY: &str = r#"{"attributes":{"id":55,"name":"budi's Server","user":7}}"#;

#[tokio::test]
async fn successful_payment_provisions_once_and_completes() {
    let mut gateway = mockito::Server::new_async().await;
    let mut panel = mockito::Server::new_async().await;

    // The gateway must be consulted exactly once: the second reconcile
    // short-circuits on the cached completed state.
    let status_mock = gateway
        .mock("POST", "/api/status-transaction.php")
        .with_status(200)
        .with_body(PAID_BODY)
        .expect(1)
        .create_async()
        .await;
    let user_mock = panel
        .mock("POST", "/api/application/users")
        .with_status(201)
        .with_body(USER_BODY)
        .expect(1)
        .create_async()
        .await;
    let _egg_mock = panel
        .mock("GET", "/api/application/nests/5/eggs/15")
        .with_status(200)
        .with_body(EGG_BODY)
        .create_async()
        .await;
    let server_mock = panel
        .mock("POST", "/api/application/servers")
        .with_status(201)
        .with_body(SERVER_BODY)
        .expect(1)
        .create_async()
        .await;

    let h = common::harness(&gateway.url(), &panel.url());
    h.store
        .create(&common::pending_transaction("TRX-1"))
        .await
        .expect("seed transaction");

    let first = h.reconciler.reconcile("TRX-1").await.expect("first poll");
    assert_eq!(first.status, TxStatus::Completed);
    assert!(first.prompt_community_join);
    let details = first.panel_details.expect("credentials present");
    assert_eq!(details.server_id, 55);
    assert_eq!(details.username, "budi");
    assert_eq!(details.password.len(), 10);

    let second = h.reconciler.reconcile("TRX-1").await.expect("second poll");
    assert_eq!(second.status, TxStatus::Completed);
    assert!(!second.prompt_community_join);
    assert_eq!(second.panel_details.expect("cached credentials"), details);

    let stored = h
        .store
        .find_by_id("TRX-1")
        .await
        .expect("load")
        .expect("exists");
    assert_eq!(stored.status, TxStatus::Completed);
    assert!(stored.panel_details.is_some());

    status_mock.assert_async().await;
    user_mock.assert_async().await;
    server_mock.assert_async().await;
}

#[tokio::test]
async fn concurrent_polls_serialize_on_the_transaction_lock() {
    let mut gateway = mockito::Server::new_async().await;
    let mut panel = mockito::Server::new_async().await;

    let status_mock = gateway
        .mock("POST", "/api/status-transaction.php")
        .with_status(200)
        .with_body(PAID_BODY)
        .expect(1)
        .create_async()
        .await;
    let user_mock = panel
        .mock("POST", "/api/application/users")
        .with_status(201)
        .with_body(USER_BODY)
        .expect(1)
        .create_async()
        .await;
    let _egg_mock = panel
        .mock("GET", "/api/application/nests/5/eggs/15")
        .with_status(200)
        .with_body(EGG_BODY)
        .create_async()
        .await;
    let _server_mock = panel
        .mock("POST", "/api/application/servers")
        .with_status(201)
        .with_body(SERVER_BODY)
        .expect(1)
        .create_async()
        .await;

    let h = common::harness(&gateway.url(), &panel.url());
    h.store
        .create(&common::pending_transaction("TRX-1"))
        .await
        .expect("seed transaction");

    // Double-click on "check status": both polls land at once.
    let (a, b) = tokio::join!(
        h.reconciler.reconcile("TRX-1"),
        h.reconciler.reconcile("TRX-1")
    );
    assert_eq!(a.expect("first concurrent poll").status, TxStatus::Completed);
    assert_eq!(b.expect("second concurrent poll").status, TxStatus::Completed);

    status_mock.assert_async().await;
    user_mock.assert_async().await;
}

#[tokio::test]
async fn gateway_failure_marks_failed_without_provisioning() {
    let mut gateway = mockito::Server::new_async().await;
    let mut panel = mockito::Server::new_async().await;

    let _status_mock = gateway
        .mock("POST", "/api/status-transaction.php")
        .with_status(200)
        .with_body(FAILED_BODY)
        .create_async()
        .await;
    let user_mock = panel
        .mock("POST", "/api/application/users")
        .expect(0)
        .create_async()
        .await;

    let h = common::harness(&gateway.url(), &panel.url());
    h.store
        .create(&common::pending_transaction("TRX-1"))
        .await
        .expect("seed transaction");

    let outcome = h.reconciler.reconcile("TRX-1").await.expect("reconcile");
    assert_eq!(outcome.status, TxStatus::Failed);
    assert!(outcome.panel_details.is_none());

    let stored = h
        .store
        .find_by_id("TRX-1")
        .await
        .expect("load")
        .expect("exists");
    assert_eq!(stored.status, TxStatus::Failed);
    assert!(stored.panel_details.is_none());

    user_mock.assert_async().await;
}

#[tokio::test]
async fn failed_is_terminal_and_skips_the_gateway() {
    let mut gateway = mockito::Server::new_async().await;
    let panel = mockito::Server::new_async().await;

    let status_mock = gateway
        .mock("POST", "/api/status-transaction.php")
        .expect(0)
        .create_async()
        .await;

    let h = common::harness(&gateway.url(), &panel.url());
    let mut tx = common::pending_transaction("TRX-1");
    tx.status = TxStatus::Failed;
    h.store.create(&tx).await.expect("seed transaction");

    let outcome = h.reconciler.reconcile("TRX-1").await.expect("reconcile");
    assert_eq!(outcome.status, TxStatus::Failed);

    status_mock.assert_async().await;
}

#[tokio::test]
async fn partial_failure_rolls_back_the_user() {
    let mut gateway = mockito::Server::new_async().await;
    let mut panel = mockito::Server::new_async().await;

    let _status_mock = gateway
        .mock("POST", "/api/status-transaction.php")
        .with_status(200)
        .with_body(PAID_BODY)
        .create_async()
        .await;
    let _user_mock = panel
        .mock("POST", "/api/application/users")
        .with_status(201)
        .with_body(USER_BODY)
        .create_async()
        .await;
    let _egg_mock = panel
        .mock("GET", "/api/application/nests/5/eggs/15")
        .with_status(200)
        .with_body(EGG_BODY)
        .create_async()
        .await;
    let _server_mock = panel
        .mock("POST", "/api/application/servers")
        .with_status(500)
        .with_body(r#"{"errors":[{"detail":"No allocations available"}]}"#)
        .create_async()
        .await;
    let rollback_mock = panel
        .mock("DELETE", "/api/application/users/7")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let h = common::harness(&gateway.url(), &panel.url());
    h.store
        .create(&common::pending_transaction("TRX-1"))
        .await
        .expect("seed transaction");

    let err = h
        .reconciler
        .reconcile("TRX-1")
        .await
        .expect_err("provisioning failure surfaces");
    assert!(matches!(
        err.kind,
        AppErrorKind::Domain(DomainError::ProvisionFailed { .. })
    ));

    let stored = h
        .store
        .find_by_id("TRX-1")
        .await
        .expect("load")
        .expect("exists");
    assert_eq!(stored.status, TxStatus::Failed);
    assert!(stored.panel_details.is_none());

    rollback_mock.assert_async().await;
}

#[tokio::test]
async fn pending_poll_leaves_status_untouched() {
    let mut gateway = mockito::Server::new_async().await;
    let panel = mockito::Server::new_async().await;

    let _status_mock = gateway
        .mock("POST", "/api/status-transaction.php")
        .with_status(200)
        .with_body(r#"{"status":"200","data":[{"status":"pending"}]}"#)
        .create_async()
        .await;

    let h = common::harness(&gateway.url(), &panel.url());
    h.store
        .create(&common::pending_transaction("TRX-1"))
        .await
        .expect("seed transaction");

    let outcome = h.reconciler.reconcile("TRX-1").await.expect("reconcile");
    assert_eq!(outcome.status, TxStatus::Pending);

    let stored = h
        .store
        .find_by_id("TRX-1")
        .await
        .expect("load")
        .expect("exists");
    assert_eq!(stored.status, TxStatus::Pending);
}

#[tokio::test]
async fn unknown_gateway_wording_is_treated_as_pending() {
    let mut gateway = mockito::Server::new_async().await;
    let panel = mockito::Server::new_async().await;

    let _status_mock = gateway
        .mock("POST", "/api/status-transaction.php")
        .with_status(200)
        .with_body(r#"{"status":"200","data":[{"status":"menunggu konfirmasi"}]}"#)
        .create_async()
        .await;

    let h = common::harness(&gateway.url(), &panel.url());
    h.store
        .create(&common::pending_transaction("TRX-1"))
        .await
        .expect("seed transaction");

    let outcome = h.reconciler.reconcile("TRX-1").await.expect("reconcile");
    assert_eq!(outcome.status, TxStatus::Pending);
}

#[tokio::test]
async fn expired_pending_payment_is_refused_without_gateway_call() {
    let mut gateway = mockito::Server::new_async().await;
    let panel = mockito::Server::new_async().await;

    let status_mock = gateway
        .mock("POST", "/api/status-transaction.php")
        .expect(0)
        .create_async()
        .await;

    let h = common::harness(&gateway.url(), &panel.url());
    let mut tx = common::pending_transaction("TRX-1");
    tx.expires_at = Utc::now() - Duration::hours(1);
    h.store.create(&tx).await.expect("seed transaction");

    let err = h
        .reconciler
        .reconcile("TRX-1")
        .await
        .expect_err("expired intent refused");
    assert!(matches!(
        err.kind,
        AppErrorKind::Domain(DomainError::PaymentExpired { .. })
    ));

    // No transition happened: expiry is derived, not stored.
    let stored = h
        .store
        .find_by_id("TRX-1")
        .await
        .expect("load")
        .expect("exists");
    assert_eq!(stored.status, TxStatus::Pending);

    status_mock.assert_async().await;
}

#[tokio::test]
async fn missing_transaction_is_not_found() {
    let gateway = mockito::Server::new_async().await;
    let panel = mockito::Server::new_async().await;

    let h = common::harness(&gateway.url(), &panel.url());
    let err = h
        .reconciler
        .reconcile("TRX-404")
        .await
        .expect_err("absent transaction");
    assert!(matches!(
        err.kind,
        AppErrorKind::Domain(DomainError::TransactionNotFound { .. })
    ));
}
