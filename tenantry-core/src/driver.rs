//! Traits a store driver implements.
//!
//! The [`ConnectionManager`](crate::ConnectionManager) only knows these traits;
//! the concrete transport lives in a driver crate such as `tenantry-surreal`.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AdminError, DriverResult};
use crate::tenant::TenantKey;

/// A connection shared between every caller of one tenant.
pub type SharedConnection = Arc<dyn Connection>;

/// An open, authenticated handle bound to one tenant for its whole life.
///
/// Implementations must allow concurrent calls on one handle, serializing
/// internally if the transport cannot multiplex.
#[async_trait]
pub trait Connection: Send + Sync {
    /// The tenant this handle is bound to.
    fn key(&self) -> &TenantKey;

    /// Select the tenant's namespace and database on the session.
    async fn select(&self) -> DriverResult<()>;

    /// Run one or more statements, returning one result per statement.
    async fn query(&self, statement: &str, vars: Value) -> DriverResult<Vec<Value>>;

    /// Run statements and return the first statement's result.
    async fn query_first(&self, statement: &str, vars: Value) -> DriverResult<Value> {
        let mut results = self.query(statement, vars).await?;
        if results.is_empty() {
            Ok(Value::Null)
        } else {
            Ok(results.swap_remove(0))
        }
    }

    /// Close the handle. Later calls fail with [`DriverError::Closed`](crate::DriverError::Closed).
    async fn close(&self) -> DriverResult<()>;
}

/// Opens connections for tenants.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open and authenticate a connection for `key`.
    ///
    /// The returned handle is not yet scoped; the manager calls
    /// [`Connection::select`] before caching it.
    async fn open(&self, key: &TenantKey) -> DriverResult<SharedConnection>;
}

/// Runs administrative scripts against a tenant outside the pooled connections.
#[async_trait]
pub trait AdminExecutor: Send + Sync {
    /// Execute `script` scoped to `key`.
    async fn execute(&self, key: &TenantKey, script: &str) -> Result<(), AdminError>;
}
