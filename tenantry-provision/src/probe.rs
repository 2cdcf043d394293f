//! Database existence checks.

use serde_json::Value;
use tenantry_core::{Connection, ConnectionManager, TenantKey};
use tracing::debug;

/// Introspection statement run against the tenant database.
pub const INFO_FOR_DB: &str = "INFO FOR DB";

/// Answers whether an organization's database exists.
///
/// Never fails: any error means "does not exist".
#[derive(Debug, Clone)]
pub struct DatabaseProbe {
    manager: ConnectionManager,
}

impl DatabaseProbe {
    /// Create a probe using `manager`'s connections.
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    /// Check whether `org_id`'s database exists.
    ///
    /// A cached connection counts as proof. Otherwise the database is
    /// connected and introspected; it exists when the introspection lists at
    /// least one definition. The connection opened for the check stays cached
    /// only when the database exists, so later checks for the same tenant take
    /// the fast path. Otherwise it is evicted and closed.
    pub async fn exists(&self, org_id: &str) -> bool {
        let key = match self.manager.config().organization_key(org_id) {
            Ok(key) => key,
            Err(e) => {
                debug!(org_id, error = %e, "Existence check on invalid id");
                return false;
            }
        };
        self.key_exists(&key).await
    }

    /// Check whether the database behind `key` exists.
    pub async fn key_exists(&self, key: &TenantKey) -> bool {
        if self.manager.is_cached(key) {
            return true;
        }

        let connection = match self.manager.get(key).await {
            Ok(connection) => connection,
            Err(e) => {
                debug!(tenant = %key, error = %e, "Existence check could not connect");
                return false;
            }
        };

        let exists = match connection.query_first(INFO_FOR_DB, Value::Null).await {
            Ok(info) => has_definitions(&info),
            Err(e) => {
                debug!(tenant = %key, error = %e, "Existence check introspection failed");
                false
            }
        };

        if !exists {
            self.discard(key).await;
        }
        exists
    }

    /// Evict and close the tenant's connection after a negative check.
    async fn discard(&self, key: &TenantKey) {
        let Some(evicted) = self.manager.evict(key) else {
            return;
        };
        if let Err(e) = evicted.close().await {
            debug!(tenant = %key, error = %e, "Closing connection to absent database failed");
        }
    }
}

/// Whether an `INFO FOR DB` result lists anything.
pub fn has_definitions(info: &Value) -> bool {
    match info {
        Value::Object(sections) => sections.values().any(|section| match section {
            Value::Object(entries) => !entries.is_empty(),
            Value::Array(entries) => !entries.is_empty(),
            _ => false,
        }),
        Value::Array(rows) => rows.iter().any(has_definitions),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use tenantry_core::testing::MockConnector;
    use tenantry_core::{DriverError, ManagerConfig};

    #[test]
    fn test_has_definitions() {
        assert!(has_definitions(&json!({
            "analyzers": {},
            "tables": { "product": "DEFINE TABLE product SCHEMAFULL" }
        })));
        assert!(!has_definitions(&json!({ "analyzers": {}, "tables": {} })));
        assert!(!has_definitions(&json!(null)));
        assert!(!has_definitions(&json!([])));
    }

    fn probe(connector: &MockConnector) -> DatabaseProbe {
        DatabaseProbe::new(ConnectionManager::new(
            Arc::new(connector.clone()),
            ManagerConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_introspection_decides() {
        let connector = MockConnector::new().with_query_handler(|key, _, _| {
            if key.database() == "org_real" {
                Ok(vec![json!({ "tables": { "product": "DEFINE TABLE product" } })])
            } else {
                Ok(vec![json!({ "tables": {} })])
            }
        });
        let probe = probe(&connector);

        assert!(probe.exists("real").await);
        assert!(!probe.exists("ghost").await);

        let manager = &probe.manager;
        assert!(manager.is_cached(&TenantKey::new("organizations", "org_real")));
        assert!(!manager.is_cached(&TenantKey::new("organizations", "org_ghost")));
        assert_eq!(connector.close_count(), 1);
    }

    #[tokio::test]
    async fn test_absent_database_stays_absent() {
        let connector =
            MockConnector::new().with_query_handler(|_, _, _| Ok(vec![json!({ "tables": {} })]));
        let probe = probe(&connector);

        assert!(!probe.exists("ghost").await);
        assert!(!probe.exists("ghost").await);

        assert_eq!(connector.open_count(), 2);
        assert_eq!(connector.close_count(), 2);
        assert_eq!(probe.manager.get_stats().count, 0);
    }

    #[tokio::test]
    async fn test_errors_mean_absent() {
        let connector = MockConnector::new()
            .fail_open("org_down", DriverError::transport("refused"))
            .with_query_handler(|_, _, _| Err(DriverError::query("database does not exist")));
        let probe = probe(&connector);

        assert!(!probe.exists("down").await);
        assert!(!probe.exists("missing").await);
        assert!(!probe.exists("").await);
        assert!(!probe.manager.is_cached(&TenantKey::new("organizations", "org_missing")));
    }

    #[tokio::test]
    async fn test_cached_connection_is_fast_path() {
        let connector = MockConnector::new();
        let probe = probe(&connector);
        probe
            .manager
            .get_organization_database("acme")
            .await
            .unwrap();

        let queries = connector.query_count();
        assert!(probe.exists("acme").await);
        assert_eq!(connector.query_count(), queries);
    }
}
