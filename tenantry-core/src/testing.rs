//! In-memory drivers for tests.
//!
//! Enabled inside this crate's tests and, for other crates, through the
//! `testing` feature.
//!
//! ```rust,ignore
//! use tenantry_core::testing::{MockAdmin, MockConnector};
//!
//! let connector = MockConnector::new()
//!     .with_delay(Duration::from_millis(20))
//!     .with_query_handler(|key, statement, vars| Ok(vec![serde_json::Value::Null]));
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::driver::{AdminExecutor, Connection, Connector, SharedConnection};
use crate::error::{AdminError, DriverError, DriverResult};
use crate::tenant::TenantKey;

/// Callback answering queries issued on mock connections.
pub type QueryHandler =
    Arc<dyn Fn(&TenantKey, &str, &Value) -> DriverResult<Vec<Value>> + Send + Sync>;

#[derive(Default)]
struct Failures {
    open: HashMap<String, DriverError>,
    select: HashMap<String, DriverError>,
    close: HashMap<String, DriverError>,
}

struct ConnectorInner {
    delay: Mutex<Option<Duration>>,
    failures: Mutex<Failures>,
    handler: Mutex<Option<QueryHandler>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    queries: AtomicUsize,
}

/// A [`Connector`] that opens in-memory connections and counts its calls.
///
/// Failures are injected per database name.
#[derive(Clone)]
pub struct MockConnector {
    inner: Arc<ConnectorInner>,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Create a connector that always succeeds.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ConnectorInner {
                delay: Mutex::new(None),
                failures: Mutex::new(Failures::default()),
                handler: Mutex::new(None),
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                queries: AtomicUsize::new(0),
            }),
        }
    }

    /// Delay every open by `delay`.
    pub fn with_delay(self, delay: Duration) -> Self {
        *self.inner.delay.lock() = Some(delay);
        self
    }

    /// Answer queries with `handler`.
    pub fn with_query_handler<F>(self, handler: F) -> Self
    where
        F: Fn(&TenantKey, &str, &Value) -> DriverResult<Vec<Value>> + Send + Sync + 'static,
    {
        *self.inner.handler.lock() = Some(Arc::new(handler));
        self
    }

    /// Fail opens for `database`.
    pub fn fail_open(self, database: impl Into<String>, error: DriverError) -> Self {
        self.inner.failures.lock().open.insert(database.into(), error);
        self
    }

    /// Fail namespace selection for `database`.
    pub fn fail_select(self, database: impl Into<String>, error: DriverError) -> Self {
        self.inner.failures.lock().select.insert(database.into(), error);
        self
    }

    /// Fail closing connections for `database`.
    pub fn fail_close(self, database: impl Into<String>, error: DriverError) -> Self {
        self.inner.failures.lock().close.insert(database.into(), error);
        self
    }

    /// Remove every injected failure.
    pub fn clear_failures(&self) {
        *self.inner.failures.lock() = Failures::default();
    }

    /// Number of opens performed.
    pub fn open_count(&self) -> usize {
        self.inner.opens.load(Ordering::SeqCst)
    }

    /// Number of closes performed.
    pub fn close_count(&self) -> usize {
        self.inner.closes.load(Ordering::SeqCst)
    }

    /// Number of queries issued across all connections.
    pub fn query_count(&self) -> usize {
        self.inner.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn open(&self, key: &TenantKey) -> DriverResult<SharedConnection> {
        self.inner.opens.fetch_add(1, Ordering::SeqCst);

        let delay = *self.inner.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.inner.failures.lock().open.get(key.database()).cloned();
        if let Some(error) = failure {
            return Err(error);
        }

        Ok(Arc::new(MockConnection {
            key: key.clone(),
            connector: Arc::clone(&self.inner),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Connection handed out by [`MockConnector`].
pub struct MockConnection {
    key: TenantKey,
    connector: Arc<ConnectorInner>,
    closed: AtomicBool,
}

impl MockConnection {
    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn key(&self) -> &TenantKey {
        &self.key
    }

    async fn select(&self) -> DriverResult<()> {
        self.ensure_open()?;
        let failure = self
            .connector
            .failures
            .lock()
            .select
            .get(self.key.database())
            .cloned();
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn query(&self, statement: &str, vars: Value) -> DriverResult<Vec<Value>> {
        self.ensure_open()?;
        self.connector.queries.fetch_add(1, Ordering::SeqCst);
        let handler = self.connector.handler.lock().clone();
        match handler {
            Some(handler) => handler(&self.key, statement, &vars),
            None => Ok(Vec::new()),
        }
    }

    async fn close(&self) -> DriverResult<()> {
        self.connector.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        let failure = self
            .connector
            .failures
            .lock()
            .close
            .get(self.key.database())
            .cloned();
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// An [`AdminExecutor`] that records scripts instead of running them.
#[derive(Clone, Default)]
pub struct MockAdmin {
    executions: Arc<Mutex<Vec<(TenantKey, String)>>>,
    failure: Arc<Mutex<Option<AdminError>>>,
    delay: Option<Duration>,
}

impl MockAdmin {
    /// Create an executor that accepts every script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every execution by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reject every script with `error`.
    pub fn failing(self, error: AdminError) -> Self {
        *self.failure.lock() = Some(error);
        self
    }

    /// Accept scripts again.
    pub fn succeed(&self) {
        *self.failure.lock() = None;
    }

    /// Scripts executed so far.
    pub fn executions(&self) -> Vec<(TenantKey, String)> {
        self.executions.lock().clone()
    }

    /// Number of scripts executed so far.
    pub fn execution_count(&self) -> usize {
        self.executions.lock().len()
    }
}

#[async_trait]
impl AdminExecutor for MockAdmin {
    async fn execute(&self, key: &TenantKey, script: &str) -> Result<(), AdminError> {
        self.executions.lock().push((key.clone(), script.to_string()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
