//! Established connections, one per tenant.
//!
//! This is a plain map with no locking and no I/O; the
//! [`ConnectionManager`](super::ConnectionManager) owns it behind the same lock
//! as the in-flight registry so lookups and inserts are linearized.

use std::collections::HashMap;

use crate::driver::SharedConnection;

use super::key::TenantKey;

/// Cache of established tenant connections.
#[derive(Default)]
pub struct ConnectionCache {
    entries: HashMap<TenantKey, SharedConnection>,
}

impl ConnectionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the connection for a tenant.
    pub fn get(&self, key: &TenantKey) -> Option<SharedConnection> {
        self.entries.get(key).cloned()
    }

    /// Check whether a tenant has a connection.
    pub fn contains(&self, key: &TenantKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert a connection, returning the one it replaced.
    pub fn insert(&mut self, key: TenantKey, connection: SharedConnection) -> Option<SharedConnection> {
        self.entries.insert(key, connection)
    }

    /// Remove a tenant's connection.
    pub fn remove(&mut self, key: &TenantKey) -> Option<SharedConnection> {
        self.entries.remove(key)
    }

    /// Keys of all cached tenants, sorted.
    pub fn keys(&self) -> Vec<TenantKey> {
        let mut keys: Vec<_> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Take every connection out of the cache.
    pub fn drain(&mut self) -> Vec<(TenantKey, SharedConnection)> {
        self.entries.drain().collect()
    }

    /// Number of cached connections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ConnectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionCache")
            .field("keys", &self.keys())
            .finish()
    }
}
