//! Administrative endpoint behavior.

use pretty_assertions::assert_eq;
use serde_json::json;
use tenantry_core::{AdminError, AdminExecutor, TenantKey};
use tenantry_surreal::{SurrealAdmin, SurrealConfig};
use wiremock::matchers::{basic_auth, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn admin(server: &MockServer) -> SurrealAdmin {
    let config = SurrealConfig::builder()
        .url(format!("{}/rpc", server.uri()))
        .username("root")
        .password("secret")
        .build()
        .unwrap();
    SurrealAdmin::new(&config).unwrap()
}

fn key() -> TenantKey {
    TenantKey::new("organizations", "org_acme")
}

#[tokio::test]
async fn script_is_posted_to_sql_endpoint() {
    let server = MockServer::start().await;
    let script = "DEFINE DATABASE org_acme; DEFINE TABLE product SCHEMAFULL;";

    Mock::given(method("POST"))
        .and(path("/sql"))
        .and(basic_auth("root", "secret"))
        .and(header("accept", "application/json"))
        .and(header("surreal-ns", "organizations"))
        .and(header("surreal-db", "org_acme"))
        .and(body_string(script))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "status": "OK", "time": "1ms", "result": null },
            { "status": "OK", "time": "1ms", "result": null }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let admin = admin(&server);
    assert!(admin.url().as_str().ends_with("/sql"));
    admin.execute(&key(), script).await.unwrap();
}

#[tokio::test]
async fn non_success_status_is_rejected_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sql"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Parse error at line 1"))
        .mount(&server)
        .await;

    let err = admin(&server).execute(&key(), "DEFINE").await.unwrap_err();
    assert_eq!(
        err,
        AdminError::Rejected {
            status: 400,
            body: "Parse error at line 1".into()
        }
    );
}

#[tokio::test]
async fn failed_statement_in_success_response_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "status": "OK", "time": "1ms", "result": null },
            { "status": "ERR", "time": "1ms", "result": "The index 'idx_sku' already exists" }
        ])))
        .mount(&server)
        .await;

    match admin(&server).execute(&key(), "DEFINE INDEX idx_sku ON product").await {
        Err(AdminError::Rejected { status, body }) => {
            assert_eq!(status, 200);
            assert!(body.contains("idx_sku"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let config = SurrealConfig::from_url("ws://root:root@127.0.0.1:1/rpc").unwrap();
    let admin = SurrealAdmin::new(&config).unwrap();
    assert_eq!(admin.url().as_str(), "http://127.0.0.1:1/sql");

    let err = admin.execute(&key(), "INFO FOR DB").await.unwrap_err();
    assert!(matches!(err, AdminError::Transport(_)));
}
