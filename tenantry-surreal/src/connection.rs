//! A tenant-bound connection over the RPC endpoint.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use tenantry_core::{Connection, DriverResult, TenantKey};
use tracing::debug;

use crate::error::{SurrealError, SurrealResult};
use crate::rpc::{RpcClient, StatementResult, statement_values};

/// A signed-in session bound to one namespace/database pair.
///
/// The session is carried in headers, so concurrent calls on one handle are
/// independent requests.
#[derive(Debug)]
pub struct SurrealConnection {
    key: TenantKey,
    rpc: RpcClient,
    closed: AtomicBool,
}

impl SurrealConnection {
    pub(crate) fn new(key: TenantKey, rpc: RpcClient) -> Self {
        Self {
            key,
            rpc,
            closed: AtomicBool::new(false),
        }
    }

    /// Check whether [`close`](Connection::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> SurrealResult<()> {
        if self.is_closed() {
            Err(SurrealError::Closed)
        } else {
            Ok(())
        }
    }

    async fn run_query(&self, statement: &str, vars: Value) -> SurrealResult<Vec<Value>> {
        self.ensure_open()?;
        debug!(tenant = %self.key, statement = %statement, "Executing query");

        let vars = match vars {
            Value::Null => json!({}),
            other => other,
        };
        let result = self.rpc.call("query", json!([statement, vars])).await?;
        let results: Vec<StatementResult> = serde_json::from_value(result)
            .map_err(|e| SurrealError::protocol(format!("invalid query result: {}", e)))?;
        statement_values(results)
    }
}

#[async_trait]
impl Connection for SurrealConnection {
    fn key(&self) -> &TenantKey {
        &self.key
    }

    async fn select(&self) -> DriverResult<()> {
        self.ensure_open()?;
        self.rpc
            .call("use", json!([self.key.namespace(), self.key.database()]))
            .await?;
        Ok(())
    }

    async fn query(&self, statement: &str, vars: Value) -> DriverResult<Vec<Value>> {
        Ok(self.run_query(statement, vars).await?)
    }

    async fn close(&self) -> DriverResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(tenant = %self.key, "Invalidating session");
        self.rpc.call("invalidate", json!([])).await?;
        Ok(())
    }
}
