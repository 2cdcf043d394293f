//! One long-lived connection per tenant, with deduplicated establishment.
//!
//! The manager keeps the [`ConnectionCache`] and the [`InFlightRegistry`]
//! behind a single lock. A lookup either:
//!
//! - hits the cache and returns immediately,
//! - joins the attempt already registered for the tenant, or
//! - registers a new attempt and awaits it.
//!
//! Attempts run as spawned tasks, so an attempt keeps going after every caller
//! has lost interest; the task itself populates the cache and clears its
//! registry entry. Exactly one connect is issued per tenant while an attempt is
//! pending, and every waiter sees the same outcome.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tenantry_core::{ConnectionManager, ManagerConfig};
//!
//! let manager = ConnectionManager::new(Arc::new(connector), ManagerConfig::default());
//!
//! let main = manager.get_connection("platform", "main").await?;
//! let org = manager.get_organization_database("acme").await?;
//!
//! let stats = manager.get_stats();
//! assert_eq!(stats.count, 2);
//!
//! manager.shutdown().await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::driver::{Connector, SharedConnection};
use crate::error::{DriverError, DriverResult, TenantError, TenantResult};

use super::cache::ConnectionCache;
use super::key::{TenantKey, organization_database};
use super::registry::{AttemptId, InFlightAttempt, InFlightRegistry};

/// Configuration for the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Namespace holding every organization database.
    pub organization_namespace: String,
    /// Prefix prepended to an organization id to form its database name.
    pub database_prefix: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            organization_namespace: "organizations".to_string(),
            database_prefix: "org_".to_string(),
        }
    }
}

impl ManagerConfig {
    /// Create a new config builder.
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }

    /// Derive the tenant key for an organization.
    pub fn organization_key(&self, org_id: &str) -> TenantResult<TenantKey> {
        if org_id.is_empty() {
            return Err(TenantError::invalid_identifier(
                "organization id must not be empty",
            ));
        }
        TenantKey::try_new(
            self.organization_namespace.clone(),
            organization_database(&self.database_prefix, org_id),
        )
    }
}

/// Builder for [`ManagerConfig`].
#[derive(Debug, Default)]
pub struct ManagerConfigBuilder {
    organization_namespace: Option<String>,
    database_prefix: Option<String>,
}

impl ManagerConfigBuilder {
    /// Set the organization namespace.
    pub fn organization_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.organization_namespace = Some(namespace.into());
        self
    }

    /// Set the database prefix.
    pub fn database_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.database_prefix = Some(prefix.into());
        self
    }

    /// Build the config.
    pub fn build(self) -> ManagerConfig {
        let defaults = ManagerConfig::default();
        ManagerConfig {
            organization_namespace: self
                .organization_namespace
                .unwrap_or(defaults.organization_namespace),
            database_prefix: self.database_prefix.unwrap_or(defaults.database_prefix),
        }
    }
}

/// Snapshot of the manager's state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManagerStats {
    /// Number of cached connections.
    pub count: usize,
    /// Keys of the cached connections, sorted.
    pub keys: Vec<TenantKey>,
    /// Number of attempts in progress.
    pub in_flight_count: usize,
    /// Connect attempts started since creation.
    pub connects_started: u64,
    /// Connect attempts that failed since creation.
    pub connects_failed: u64,
    /// Lookups answered from the cache.
    pub cache_hits: u64,
}

/// Thread-safe counters.
#[derive(Debug, Default)]
struct AtomicManagerStats {
    connects_started: AtomicU64,
    connects_failed: AtomicU64,
    cache_hits: AtomicU64,
}

impl AtomicManagerStats {
    #[inline]
    fn record_start(&self) {
        self.connects_started.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_failure(&self) {
        self.connects_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }
}

/// Outcome of [`ConnectionManager::shutdown`].
#[derive(Debug, Default)]
pub struct ShutdownReport {
    /// Tenants whose connection closed cleanly.
    pub closed: Vec<TenantKey>,
    /// Tenants whose close failed.
    pub failed: Vec<(TenantKey, DriverError)>,
}

#[derive(Debug, Default)]
struct ManagerState {
    cache: ConnectionCache,
    registry: InFlightRegistry,
}

/// Clears the registry entry when an attempt task ends, including by panic.
struct AttemptGuard {
    state: Arc<Mutex<ManagerState>>,
    key: TenantKey,
    id: AttemptId,
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        self.state.lock().registry.complete(&self.key, self.id);
    }
}

/// Manager for per-tenant connections.
///
/// Construct once per process and share it (it is cheap to clone).
#[derive(Clone)]
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    config: Arc<ManagerConfig>,
    state: Arc<Mutex<ManagerState>>,
    stats: Arc<AtomicManagerStats>,
}

impl ConnectionManager {
    /// Create a manager using `connector` to open connections.
    pub fn new(connector: Arc<dyn Connector>, config: ManagerConfig) -> Self {
        Self {
            connector,
            config: Arc::new(config),
            state: Arc::new(Mutex::new(ManagerState::default())),
            stats: Arc::new(AtomicManagerStats::default()),
        }
    }

    /// Get the manager configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Get the connection for a namespace/database pair.
    pub async fn get_connection(
        &self,
        namespace: &str,
        database: &str,
    ) -> TenantResult<SharedConnection> {
        let key = TenantKey::try_new(namespace, database)?;
        self.get(&key).await
    }

    /// Get the connection for an organization's database.
    pub async fn get_organization_database(&self, org_id: &str) -> TenantResult<SharedConnection> {
        let key = self.config.organization_key(org_id)?;
        self.get(&key).await
    }

    /// Get the connection for a tenant key.
    pub async fn get(&self, key: &TenantKey) -> TenantResult<SharedConnection> {
        let attempt = {
            let mut state = self.state.lock();

            if let Some(connection) = state.cache.get(key) {
                self.stats.record_hit();
                debug!(tenant = %key, "Connection cache hit");
                return Ok(connection);
            }

            match state.registry.get(key) {
                Some(attempt) => {
                    debug!(tenant = %key, "Joining in-flight connection attempt");
                    attempt
                }
                None => {
                    let id = state.registry.next_id();
                    let attempt = self.spawn_attempt(key.clone(), id);
                    state.registry.register(key.clone(), id, attempt.clone());
                    attempt
                }
            }
        };

        attempt
            .await
            .map_err(|source| TenantError::connection_failed(key.clone(), source))
    }

    /// Check whether a tenant already has an established connection.
    pub fn is_cached(&self, key: &TenantKey) -> bool {
        self.state.lock().cache.contains(key)
    }

    /// Remove a tenant's connection from the cache without closing it.
    ///
    /// The next lookup for `key` connects again. Closing the returned handle
    /// is up to the caller.
    pub fn evict(&self, key: &TenantKey) -> Option<SharedConnection> {
        let evicted = self.state.lock().cache.remove(key);
        if evicted.is_some() {
            debug!(tenant = %key, "Evicted tenant connection");
        }
        evicted
    }

    /// Snapshot of cached connections and in-flight attempts.
    pub fn get_stats(&self) -> ManagerStats {
        let state = self.state.lock();
        ManagerStats {
            count: state.cache.len(),
            keys: state.cache.keys(),
            in_flight_count: state.registry.len(),
            connects_started: self.stats.connects_started.load(Ordering::Relaxed),
            connects_failed: self.stats.connects_failed.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
        }
    }

    /// Close every cached connection and forget all state.
    ///
    /// Attempts still in progress are awaited first, so a connection they
    /// establish is closed here too. A failing close is logged and does not
    /// stop the others. Must not race with new [`get`](Self::get) calls.
    pub async fn shutdown(&self) -> ShutdownReport {
        let attempts = self.state.lock().registry.drain();
        if !attempts.is_empty() {
            debug!(pending = attempts.len(), "Waiting for in-flight connection attempts");
            futures::future::join_all(attempts.into_iter().map(|(_, attempt)| attempt)).await;
        }

        let connections = self.state.lock().cache.drain();

        let mut report = ShutdownReport::default();
        for (key, connection) in connections {
            match connection.close().await {
                Ok(()) => {
                    debug!(tenant = %key, "Connection closed");
                    report.closed.push(key);
                }
                Err(e) => {
                    error!(tenant = %key, error = %e, "Failed to close tenant connection");
                    report.failed.push((key, e));
                }
            }
        }

        info!(
            closed = report.closed.len(),
            failed = report.failed.len(),
            "Connection manager shut down"
        );
        report
    }

    /// Start an attempt on the runtime and return a shareable handle to it.
    fn spawn_attempt(&self, key: TenantKey, id: AttemptId) -> InFlightAttempt {
        self.stats.record_start();
        info!(tenant = %key, "Establishing tenant connection");

        let connector = Arc::clone(&self.connector);
        let state = Arc::clone(&self.state);
        let stats = Arc::clone(&self.stats);

        let task = tokio::spawn(async move {
            let guard = AttemptGuard {
                state: Arc::clone(&state),
                key: key.clone(),
                id,
            };

            let result = establish(connector.as_ref(), &key).await;

            let mut locked = state.lock();
            match &result {
                Ok(connection) => {
                    locked.cache.insert(key.clone(), Arc::clone(connection));
                    info!(tenant = %key, "Tenant connection established");
                }
                Err(e) => {
                    stats.record_failure();
                    warn!(tenant = %key, error = %e, "Tenant connection failed");
                }
            }
            locked.registry.complete(&key, id);
            drop(locked);
            drop(guard);

            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(DriverError::transport(format!(
                    "connection attempt aborted: {}",
                    e
                ))),
            }
        }
        .boxed()
        .shared()
    }
}

/// Open a connection and scope it to its tenant.
async fn establish(connector: &dyn Connector, key: &TenantKey) -> DriverResult<SharedConnection> {
    let connection = connector.open(key).await?;

    if let Err(e) = connection.select().await {
        if let Err(close_err) = connection.close().await {
            debug!(tenant = %key, error = %close_err, "Discarding unscoped connection failed");
        }
        return Err(e);
    }

    Ok(connection)
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("config", &self.config)
            .field("state", &*self.state.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockConnector;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn manager(connector: &MockConnector) -> ConnectionManager {
        ConnectionManager::new(Arc::new(connector.clone()), ManagerConfig::default())
    }

    #[test]
    fn test_config_builder() {
        let config = ManagerConfig::builder()
            .organization_namespace("orgs")
            .database_prefix("tenant_")
            .build();

        let key = config.organization_key("acme").unwrap();
        assert_eq!(key, TenantKey::new("orgs", "tenant_acme"));
        assert!(config.organization_key("").is_err());
    }

    #[tokio::test]
    async fn test_cache_hit_does_not_reconnect() {
        let connector = MockConnector::new();
        let manager = manager(&connector);

        let first = manager.get_connection("platform", "main").await.unwrap();
        let second = manager.get_connection("platform", "main").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.open_count(), 1);

        let stats = manager.get_stats();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.keys, vec![TenantKey::new("platform", "main")]);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_attempt() {
        let connector = MockConnector::new().with_delay(Duration::from_millis(50));
        let manager = manager(&connector);

        let calls = (0..16).map(|_| manager.get_connection("organizations", "org_acme"));
        let results = futures::future::join_all(calls).await;

        assert_eq!(connector.open_count(), 1);
        let first = results[0].as_ref().unwrap();
        for result in &results {
            assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
        }
        assert_eq!(manager.get_stats().in_flight_count, 0);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_failure() {
        let connector = MockConnector::new()
            .with_delay(Duration::from_millis(20))
            .fail_open("org_down", DriverError::transport("connection refused"));
        let manager = manager(&connector);

        let calls = (0..8).map(|_| manager.get_connection("organizations", "org_down"));
        let results = futures::future::join_all(calls).await;

        assert_eq!(connector.open_count(), 1);
        for result in results {
            match result {
                Err(TenantError::ConnectionFailed { key, source }) => {
                    assert_eq!(key.database(), "org_down");
                    assert_eq!(source, DriverError::transport("connection refused"));
                }
                Err(other) => panic!("unexpected error: {other}"),
                Ok(_) => panic!("expected failure"),
            }
        }

        let stats = manager.get_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.in_flight_count, 0);
        assert_eq!(stats.connects_failed, 1);
    }

    #[tokio::test]
    async fn test_retry_after_failure_reconnects() {
        let connector =
            MockConnector::new().fail_open("org_flaky", DriverError::transport("refused"));
        let manager = manager(&connector);

        assert!(manager.get_connection("organizations", "org_flaky").await.is_err());

        connector.clear_failures();
        assert!(manager.get_connection("organizations", "org_flaky").await.is_ok());
        assert_eq!(connector.open_count(), 2);
    }

    #[tokio::test]
    async fn test_select_failure_discards_connection() {
        let connector =
            MockConnector::new().fail_select("org_noscope", DriverError::query("no such ns"));
        let manager = manager(&connector);

        let err = manager
            .get_connection("organizations", "org_noscope")
            .await
            .err()
            .expect("select failure should fail the lookup");
        assert!(err.is_connection_failed());
        assert_eq!(connector.close_count(), 1);
        assert_eq!(manager.get_stats().count, 0);
    }

    #[tokio::test]
    async fn test_empty_identifiers_rejected_before_io() {
        let connector = MockConnector::new();
        let manager = manager(&connector);

        assert!(matches!(
            manager.get_connection("", "main").await,
            Err(TenantError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            manager.get_connection("platform", "").await,
            Err(TenantError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            manager.get_organization_database("").await,
            Err(TenantError::InvalidIdentifier(_))
        ));
        assert_eq!(connector.open_count(), 0);
    }

    #[tokio::test]
    async fn test_organization_database_derivation() {
        let connector = MockConnector::new();
        let manager = manager(&connector);

        let conn = manager.get_organization_database("acme").await.unwrap();
        assert_eq!(conn.key(), &TenantKey::new("organizations", "org_acme"));
        assert!(manager.is_cached(&TenantKey::new("organizations", "org_acme")));
    }

    #[tokio::test]
    async fn test_abandoned_attempt_still_completes() {
        let connector = MockConnector::new().with_delay(Duration::from_millis(30));
        let manager = manager(&connector);

        let pending = manager.get_connection("organizations", "org_gone");
        let _ = tokio::time::timeout(Duration::from_millis(5), pending).await;
        assert_eq!(manager.get_stats().in_flight_count, 1);

        tokio::time::sleep(Duration::from_millis(80)).await;

        let stats = manager.get_stats();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.in_flight_count, 0);

        manager
            .get_connection("organizations", "org_gone")
            .await
            .unwrap();
        assert_eq!(connector.open_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_everything() {
        let connector = MockConnector::new().fail_close("org_b", DriverError::transport("reset"));
        let manager = manager(&connector);

        for db in ["org_a", "org_b", "org_c"] {
            manager.get_connection("organizations", db).await.unwrap();
        }

        let report = manager.shutdown().await;
        assert_eq!(report.closed.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.database(), "org_b");
        assert_eq!(connector.close_count(), 3);

        let stats = manager.get_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.in_flight_count, 0);
        assert!(stats.keys.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_pending_attempt() {
        let connector = MockConnector::new().with_delay(Duration::from_millis(30));
        let manager = manager(&connector);

        let pending = manager.get_connection("organizations", "org_late");
        let _ = tokio::time::timeout(Duration::from_millis(5), pending).await;
        assert_eq!(manager.get_stats().in_flight_count, 1);

        let report = manager.shutdown().await;
        assert_eq!(report.closed, vec![TenantKey::new("organizations", "org_late")]);
        assert_eq!(connector.close_count(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;

        let stats = manager.get_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.in_flight_count, 0);
    }

    #[tokio::test]
    async fn test_evict_forces_reconnect() {
        let connector = MockConnector::new();
        let manager = manager(&connector);
        let key = TenantKey::new("organizations", "org_acme");

        let first = manager.get(&key).await.unwrap();
        let evicted = manager.evict(&key).expect("connection was cached");
        assert!(Arc::ptr_eq(&first, &evicted));
        assert!(!manager.is_cached(&key));
        assert!(manager.evict(&key).is_none());

        manager.get(&key).await.unwrap();
        assert_eq!(connector.open_count(), 2);
    }
}
