//! JSON-RPC over HTTP.
//!
//! Every call is a `POST` of `{"id", "method", "params"}` to the RPC
//! endpoint. The session lives in request headers: the bearer token from
//! sign-in and the `surreal-ns` / `surreal-db` selectors.

use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tenantry_core::TenantKey;
use tracing::trace;
use url::Url;

use crate::error::{SurrealError, SurrealResult};

/// Namespace selector header.
pub const NS_HEADER: &str = "surreal-ns";

/// Database selector header.
pub const DB_HEADER: &str = "surreal-db";

#[derive(Debug, Serialize)]
struct Request<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// One statement's entry in a query response.
#[derive(Debug, Clone, Deserialize)]
pub struct StatementResult {
    /// `OK` or `ERR`.
    pub status: String,
    /// Rows on success, the error message on failure.
    #[serde(default)]
    pub result: Value,
    /// Execution time as reported by the store.
    #[serde(default)]
    pub time: Option<String>,
}

impl StatementResult {
    /// Check if the statement failed.
    pub fn is_err(&self) -> bool {
        self.status.eq_ignore_ascii_case("ERR")
    }

    /// The error message of a failed statement.
    pub fn message(&self) -> String {
        match &self.result {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Split a list of statement results into values, failing on the first `ERR`.
pub fn statement_values(results: Vec<StatementResult>) -> SurrealResult<Vec<Value>> {
    results
        .into_iter()
        .map(|r| {
            if r.is_err() {
                Err(SurrealError::Statement(r.message()))
            } else {
                Ok(r.result)
            }
        })
        .collect()
}

/// Headers selecting a tenant.
pub fn tenant_headers(key: &TenantKey) -> SurrealResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(NS_HEADER, header_value(key.namespace())?);
    headers.insert(DB_HEADER, header_value(key.database())?);
    Ok(headers)
}

fn header_value(value: &str) -> SurrealResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| SurrealError::config(format!("'{}' is not a valid header value", value)))
}

/// Client for the RPC endpoint, scoped to one tenant.
#[derive(Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    url: Url,
    headers: HeaderMap,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client sending `headers` with every call.
    pub fn new(http: reqwest::Client, url: Url, headers: HeaderMap) -> Self {
        Self {
            http,
            url,
            headers,
            next_id: AtomicU64::new(1),
        }
    }

    /// Send `token` as a bearer token on later calls.
    pub fn set_token(&mut self, token: &str) -> SurrealResult<()> {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| SurrealError::protocol("sign-in returned an unusable token"))?;
        self.headers.insert(reqwest::header::AUTHORIZATION, value);
        Ok(())
    }

    /// Call `method` and return its `result`.
    pub async fn call(&self, method: &str, params: Value) -> SurrealResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        trace!(id, method, url = %self.url, "RPC call");

        let resp = self
            .http
            .post(self.url.clone())
            .headers(self.headers.clone())
            .json(&Request { id, method, params })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SurrealError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: Response = resp
            .json()
            .await
            .map_err(|e| SurrealError::protocol(format!("invalid RPC response: {}", e)))?;

        match (response.error, response.result) {
            (Some(error), _) => Err(SurrealError::Rpc {
                code: error.code,
                message: error.message,
            }),
            (None, result) => Ok(result.unwrap_or(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_statement_values() {
        let results: Vec<StatementResult> = serde_json::from_value(json!([
            { "status": "OK", "result": [{ "id": "product:1" }], "time": "1ms" },
            { "status": "OK", "result": null },
        ]))
        .unwrap();

        let values = statement_values(results).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0][0]["id"], "product:1");
        assert!(values[1].is_null());
    }

    #[test]
    fn test_statement_error() {
        let results: Vec<StatementResult> = serde_json::from_value(json!([
            { "status": "OK", "result": [] },
            { "status": "ERR", "result": "The table 'x' does not exist" },
        ]))
        .unwrap();

        match statement_values(results) {
            Err(SurrealError::Statement(msg)) => assert!(msg.contains("does not exist")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_tenant_headers() {
        let headers = tenant_headers(&TenantKey::new("organizations", "org_acme")).unwrap();
        assert_eq!(headers[NS_HEADER], "organizations");
        assert_eq!(headers[DB_HEADER], "org_acme");

        assert!(tenant_headers(&TenantKey::new("ns", "bad\ndb")).is_err());
    }
}
