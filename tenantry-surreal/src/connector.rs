//! Opens signed-in connections.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tenantry_core::{Connector, DriverResult, SharedConnection, TenantKey};
use tracing::debug;

use crate::config::SurrealConfig;
use crate::connection::SurrealConnection;
use crate::error::{SurrealError, SurrealResult};
use crate::rpc::{RpcClient, tenant_headers};

/// [`Connector`] for the store's RPC endpoint.
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use tenantry_core::{ConnectionManager, ManagerConfig};
/// use tenantry_surreal::{SurrealConfig, SurrealConnector};
///
/// let config = SurrealConfig::from_url("ws://root:root@localhost:8000/rpc")?;
/// let connector = SurrealConnector::new(config)?;
/// let manager = ConnectionManager::new(Arc::new(connector), ManagerConfig::default());
/// ```
#[derive(Debug, Clone)]
pub struct SurrealConnector {
    config: Arc<SurrealConfig>,
    http: reqwest::Client,
}

impl SurrealConnector {
    /// Create a connector with its own HTTP client.
    pub fn new(config: SurrealConfig) -> SurrealResult<Self> {
        let http = build_http_client(&config)?;
        Ok(Self::with_client(config, http))
    }

    /// Create a connector sharing an existing HTTP client.
    pub fn with_client(config: SurrealConfig, http: reqwest::Client) -> Self {
        Self {
            config: Arc::new(config),
            http,
        }
    }

    /// The endpoint configuration.
    pub fn config(&self) -> &SurrealConfig {
        &self.config
    }

    async fn connect(&self, key: &TenantKey) -> SurrealResult<SurrealConnection> {
        let headers = tenant_headers(key)?;
        let mut rpc = RpcClient::new(self.http.clone(), self.config.rpc_url().clone(), headers);

        if let Some((user, pass)) = self.config.credentials() {
            let token = signin(&rpc, user, pass).await?;
            rpc.set_token(&token)?;
        }

        Ok(SurrealConnection::new(key.clone(), rpc))
    }
}

/// Build the HTTP client used for both endpoints.
pub fn build_http_client(config: &SurrealConfig) -> SurrealResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .build()
        .map_err(SurrealError::from)
}

async fn signin(rpc: &RpcClient, user: &str, pass: &str) -> SurrealResult<String> {
    let result = rpc
        .call("signin", json!([{ "user": user, "pass": pass }]))
        .await
        .map_err(|e| match e {
            SurrealError::Rpc { message, .. } => SurrealError::Authentication(message),
            SurrealError::Status {
                status: 401 | 403,
                body,
            } => SurrealError::Authentication(body),
            other => other,
        })?;

    match result {
        Value::String(token) => Ok(token),
        other => Err(SurrealError::protocol(format!(
            "sign-in returned {} instead of a token",
            other
        ))),
    }
}

#[async_trait]
impl Connector for SurrealConnector {
    async fn open(&self, key: &TenantKey) -> DriverResult<SharedConnection> {
        debug!(tenant = %key, url = %self.config.rpc_url(), "Opening connection");
        let connection = self.connect(key).await?;
        Ok(Arc::new(connection))
    }
}
