//! The administrative SQL endpoint.
//!
//! Provisioning scripts bypass the pooled connections: each one is a single
//! `POST` of raw text to the admin URL with basic credentials and the tenant's
//! selector headers.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use tenantry_core::{AdminError, AdminExecutor, TenantKey};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SurrealConfig;
use crate::connector::build_http_client;
use crate::error::SurrealResult;
use crate::rpc::{StatementResult, tenant_headers};

/// [`AdminExecutor`] posting scripts to the SQL endpoint.
#[derive(Debug, Clone)]
pub struct SurrealAdmin {
    http: reqwest::Client,
    url: Url,
    credentials: Option<(String, String)>,
}

impl SurrealAdmin {
    /// Create an executor with its own HTTP client.
    pub fn new(config: &SurrealConfig) -> SurrealResult<Self> {
        Ok(Self::with_client(config, build_http_client(config)?))
    }

    /// Create an executor sharing an existing HTTP client.
    pub fn with_client(config: &SurrealConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            url: config.admin_url().clone(),
            credentials: config
                .credentials()
                .map(|(user, pass)| (user.to_string(), pass.to_string())),
        }
    }

    /// The endpoint scripts are posted to.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl AdminExecutor for SurrealAdmin {
    async fn execute(&self, key: &TenantKey, script: &str) -> Result<(), AdminError> {
        let headers = tenant_headers(key).map_err(|e| AdminError::Transport(e.to_string()))?;
        info!(tenant = %key, url = %self.url, bytes = script.len(), "Executing administrative script");

        let mut request = self
            .http
            .post(self.url.clone())
            .headers(headers)
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .body(script.to_string());
        if let Some((user, pass)) = &self.credentials {
            request = request.basic_auth(user, Some(pass));
        }

        let resp = request
            .send()
            .await
            .map_err(|e| AdminError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let success = resp.status().is_success();
        let body = resp
            .text()
            .await
            .map_err(|e| AdminError::Transport(e.to_string()))?;

        if !success {
            warn!(tenant = %key, status, "Administrative script rejected");
            return Err(AdminError::Rejected { status, body });
        }

        match serde_json::from_str::<Vec<StatementResult>>(&body) {
            Ok(results) => {
                if let Some(failed) = results.iter().find(|r| r.is_err()) {
                    warn!(tenant = %key, status, "Administrative script statement failed");
                    return Err(AdminError::Rejected {
                        status,
                        body: failed.message(),
                    });
                }
                debug!(tenant = %key, statements = results.len(), "Administrative script applied");
            }
            Err(e) => {
                debug!(tenant = %key, error = %e, "Administrative response is not a statement list");
            }
        }

        Ok(())
    }
}
