//! An in-memory store for provisioning tests.
//!
//! [`FakeStore`] answers the control-tenant statements issued by
//! [`SetupTracker`](crate::SetupTracker), the existence probe's introspection,
//! and administrative scripts. Executing a script creates the target database.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tenantry_core::testing::MockConnector;
use tenantry_core::{
    AdminError, AdminExecutor, ConnectionManager, DriverError, DriverResult, ManagerConfig,
    TenantKey,
};

use crate::probe::INFO_FOR_DB;
use crate::tracker::{SELECT_METADATA, UPDATE_METADATA};

#[derive(Default)]
struct StoreState {
    records: HashMap<String, Value>,
    databases: HashSet<String>,
    read_failure: Option<DriverError>,
    write_failure: Option<DriverError>,
    admin_failure: Option<AdminError>,
    admin_delay: Option<Duration>,
    executions: Vec<(TenantKey, String)>,
}

/// Control records, existing databases and an administrative endpoint.
#[derive(Clone)]
pub struct FakeStore {
    state: Arc<Mutex<StoreState>>,
    connector: MockConnector,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let state = Arc::new(Mutex::new(StoreState::default()));
        let handler_state = Arc::clone(&state);
        let connector = MockConnector::new().with_query_handler(move |key, statement, vars| {
            handle(&handler_state, key, statement, vars)
        });
        Self { state, connector }
    }

    /// Add an organization record with the given metadata.
    pub fn with_record(self, tenant_id: impl Into<String>, metadata: Value) -> Self {
        self.state.lock().records.insert(tenant_id.into(), metadata);
        self
    }

    /// Mark a database as existing.
    pub fn with_database(self, database: impl Into<String>) -> Self {
        self.state.lock().databases.insert(database.into());
        self
    }

    /// Delay every administrative script.
    pub fn with_admin_delay(self, delay: Duration) -> Self {
        self.state.lock().admin_delay = Some(delay);
        self
    }

    /// Fail metadata reads.
    pub fn fail_reads(&self, error: DriverError) {
        self.state.lock().read_failure = Some(error);
    }

    /// Fail metadata writes.
    pub fn fail_writes(&self, error: DriverError) {
        self.state.lock().write_failure = Some(error);
    }

    /// Reject administrative scripts.
    pub fn fail_admin(&self, error: AdminError) {
        self.state.lock().admin_failure = Some(error);
    }

    /// Remove every injected failure.
    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.read_failure = None;
        state.write_failure = None;
        state.admin_failure = None;
    }

    /// Drop a database, as if deleted out of band.
    pub fn drop_database(&self, database: &str) {
        self.state.lock().databases.remove(database);
    }

    /// Stored metadata of a record.
    pub fn metadata(&self, tenant_id: &str) -> Option<Value> {
        self.state.lock().records.get(tenant_id).cloned()
    }

    /// Check whether a database exists.
    pub fn has_database(&self, database: &str) -> bool {
        self.state.lock().databases.contains(database)
    }

    /// Scripts executed so far.
    pub fn executions(&self) -> Vec<(TenantKey, String)> {
        self.state.lock().executions.clone()
    }

    /// Number of scripts executed so far.
    pub fn execution_count(&self) -> usize {
        self.state.lock().executions.len()
    }

    /// The connector serving this store.
    pub fn connector(&self) -> &MockConnector {
        &self.connector
    }

    /// A fresh manager over this store with default settings.
    pub fn manager(&self) -> ConnectionManager {
        ConnectionManager::new(Arc::new(self.connector.clone()), ManagerConfig::default())
    }
}

fn handle(
    state: &Mutex<StoreState>,
    key: &TenantKey,
    statement: &str,
    vars: &Value,
) -> DriverResult<Vec<Value>> {
    let mut state = state.lock();
    let id = vars["id"].as_str().unwrap_or_default();

    match statement {
        SELECT_METADATA => {
            if let Some(error) = &state.read_failure {
                return Err(error.clone());
            }
            let rows = match state.records.get(id) {
                Some(metadata) => json!([{ "metadata": metadata }]),
                None => json!([]),
            };
            Ok(vec![rows])
        }
        UPDATE_METADATA => {
            if let Some(error) = &state.write_failure {
                return Err(error.clone());
            }
            if let Some(record) = state.records.get_mut(id) {
                *record = vars["metadata"].clone();
            }
            Ok(vec![Value::Null])
        }
        INFO_FOR_DB => {
            if state.databases.contains(key.database()) {
                Ok(vec![json!({
                    "analyzers": {},
                    "tables": { "product": "DEFINE TABLE product SCHEMAFULL" }
                })])
            } else {
                Err(DriverError::query(format!(
                    "The database '{}' does not exist",
                    key.database()
                )))
            }
        }
        other => Err(DriverError::query(format!("unsupported statement: {}", other))),
    }
}

#[async_trait]
impl AdminExecutor for FakeStore {
    async fn execute(&self, key: &TenantKey, script: &str) -> Result<(), AdminError> {
        let delay = {
            let mut state = self.state.lock();
            state.executions.push((key.clone(), script.to_string()));
            state.admin_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if let Some(error) = &state.admin_failure {
            return Err(error.clone());
        }
        state.databases.insert(key.database().to_string());
        Ok(())
    }
}
