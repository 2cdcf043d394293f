//! Integration tests for the wired-up tenant services.
//!
//! These run the connection manager, tracker, and provisioner together over
//! the in-memory store from `tenantry_provision::testing`.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tenantry::prelude::*;
use tenantry::provision::Availability;
use tenantry::provision::testing::FakeStore;
use tenantry_core::{AdminError, DriverError};

fn services(store: &FakeStore) -> TenantServices {
    TenantServices::with_drivers(
        &TenantryConfig::default(),
        Arc::new(store.connector().clone()),
        Arc::new(store.clone()),
    )
    .expect("default config is valid")
}

#[tokio::test]
async fn test_provision_then_check_is_ready() {
    let store = FakeStore::new().with_record("acme", json!({ "plan": "pro" }));
    let services = services(&store);

    services
        .create_tenant_database("acme", "restaurant")
        .await
        .unwrap();

    assert!(store.has_database("org_acme"));
    assert!(services.database_exists("acme").await);

    let check = services.check_setup("acme").await;
    assert!(check.is_setup);
    assert_eq!(check.status, SetupStatus::Completed);
    assert_eq!(check.error, None);
    assert_eq!(check.availability(), Availability::Ready);

    let stored = store.metadata("acme").unwrap();
    assert_eq!(stored["plan"], "pro");
    assert_eq!(stored["setup"]["setupStatus"], "completed");
    assert_eq!(stored["setup"]["database"], "org_acme");
    assert_eq!(stored["setup"]["organizationType"], "restaurant");
}

#[tokio::test]
async fn test_failed_provision_is_reported_and_keeps_other_keys() {
    let store = FakeStore::new()
        .with_record("acme", json!({ "plan": "pro", "setup": { "owner": "ops" } }))
        .with_database("org_acme");
    store.fail_admin(AdminError::Rejected {
        status: 400,
        body: "Parse error".to_string(),
    });
    let services = services(&store);

    let err = services
        .create_tenant_database("acme", "retail")
        .await
        .unwrap_err();
    assert!(err.is_provisioning_failed());

    let check = services.check_setup("acme").await;
    assert!(!check.is_setup);
    assert_eq!(check.status, SetupStatus::Failed);
    assert!(check.error.as_deref().unwrap().contains("org_acme"));
    assert_eq!(check.availability(), Availability::SetupFailed);

    let stored = store.metadata("acme").unwrap();
    assert_eq!(stored["plan"], "pro");
    assert_eq!(stored["setup"]["owner"], "ops");
}

#[tokio::test]
async fn test_failed_provision_without_database_is_failed() {
    let store = FakeStore::new().with_record("acme", json!({ "plan": "pro" }));
    store.fail_admin(AdminError::Transport("connection refused".to_string()));
    let services = services(&store);

    assert!(services.create_tenant_database("acme", "retail").await.is_err());
    assert!(!store.has_database("org_acme"));

    let check = services.check_setup("acme").await;
    assert!(check.is_failed());
    assert!(check.error.as_deref().unwrap().contains("connection refused"));
    assert_eq!(store.metadata("acme").unwrap()["plan"], "pro");
}

#[tokio::test]
async fn test_retry_after_failure_completes() {
    let store = FakeStore::new().with_record("acme", json!({}));
    store.fail_admin(AdminError::Transport("connection refused".to_string()));
    let services = services(&store);

    assert!(services.create_tenant_database("acme", "retail").await.is_err());

    store.clear_failures();
    services.create_tenant_database("acme", "retail").await.unwrap();

    let check = services.check_setup("acme").await;
    assert!(check.is_setup);
    assert_eq!(store.metadata("acme").unwrap()["setup"]["setupError"], json!(null));
}

#[tokio::test]
async fn test_completed_record_with_dropped_database_is_pending() {
    let store = FakeStore::new()
        .with_record(
            "acme",
            json!({ "setup": { "setupStatus": "completed", "database": "org_acme" } }),
        )
        .with_database("org_acme");
    let services = services(&store);
    store.drop_database("org_acme");

    let check = services.check_setup("acme").await;
    assert!(!check.is_setup);
    assert!(check.is_pending());
    assert_eq!(check.availability(), Availability::Provisioning);
}

#[tokio::test]
async fn test_completed_record_without_database_stays_pending() {
    let store = FakeStore::new().with_record(
        "acme",
        json!({ "setup": { "setupStatus": "completed", "database": "org_acme" } }),
    );
    let services = services(&store);

    assert!(services.check_setup("acme").await.is_pending());
    assert!(!services.database_exists("acme").await);
    assert!(!services.database_exists("acme").await);
    assert!(services.check_setup("acme").await.is_pending());

    assert!(!store.has_database("org_acme"));
    assert!(
        !services
            .manager()
            .is_cached(&TenantKey::new("organizations", "org_acme"))
    );
}

#[tokio::test]
async fn test_unknown_tenant_check_is_pending() {
    let store = FakeStore::new();
    let services = services(&store);

    let check = services.check_setup("ghost").await;
    assert!(check.is_pending());
    assert_eq!(check.error.as_deref(), Some("not found"));
    assert_eq!(check.metadata, None);
}

#[tokio::test]
async fn test_unreadable_control_record_is_pending_with_error() {
    let store = FakeStore::new().with_record("acme", json!({}));
    store.fail_reads(DriverError::query("permission denied"));
    let services = services(&store);

    let check = services.check_setup("acme").await;
    assert!(check.is_pending());
    assert!(check.error.unwrap().contains("permission denied"));
}

#[tokio::test]
async fn test_invalid_type_touches_nothing() {
    let store = FakeStore::new().with_record("acme", json!({}));
    let services = services(&store);

    let err = services
        .create_tenant_database("acme", "warehouse")
        .await
        .unwrap_err();
    assert!(err.is_invalid_tenant_type());
    assert_eq!(store.execution_count(), 0);
    assert_eq!(services.get_stats().count, 0);
    assert_eq!(store.metadata("acme").unwrap(), json!({}));
}

#[tokio::test]
async fn test_concurrent_provisioning_applies_once() {
    let store = FakeStore::new()
        .with_record("acme", json!({}))
        .with_admin_delay(Duration::from_millis(50));
    let services = services(&store);

    let (a, b) = tokio::join!(
        services.create_tenant_database("acme", "retail"),
        services.create_tenant_database("acme", "retail"),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(store.execution_count(), 1);
}

#[tokio::test]
async fn test_connections_are_shared_and_closed_on_shutdown() {
    let store = FakeStore::new();
    let services = services(&store);

    let (a, b) = tokio::join!(
        services.get_organization_database("acme"),
        services.get_connection("organizations", "org_acme"),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(store.connector().open_count(), 1);

    services.get_connection("platform", "main").await.unwrap();

    let stats = services.get_stats();
    assert_eq!(stats.count, 2);
    assert_eq!(
        stats.keys,
        vec![
            TenantKey::new("organizations", "org_acme"),
            TenantKey::new("platform", "main"),
        ]
    );

    let report = services.shutdown().await;
    assert_eq!(report.closed.len(), 2);
    assert!(report.failed.is_empty());
    assert_eq!(services.get_stats().count, 0);
    assert_eq!(store.connector().close_count(), 2);
}

#[tokio::test]
async fn test_connect_failure_is_not_cached() {
    let store = FakeStore::new();
    let services = services(&store);
    let failing = store.connector().clone().fail_open("org_acme", DriverError::transport("refused"));

    let err = services
        .get_organization_database("acme")
        .await
        .err()
        .expect("connect failure should surface");
    assert!(err.is_connection_failed());
    assert_eq!(services.get_stats().count, 0);

    failing.clear_failures();
    services.get_organization_database("acme").await.unwrap();
    assert_eq!(services.get_stats().count, 1);
    assert_eq!(store.connector().open_count(), 2);
}
