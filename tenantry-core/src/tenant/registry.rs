//! Connection attempts currently in progress.
//!
//! Each entry is a shared future: the first caller for a key registers it,
//! every later caller clones and awaits the same future. Entries carry an
//! attempt id so a finishing attempt only ever removes itself.

use std::collections::HashMap;

use futures::future::{BoxFuture, Shared};

use crate::driver::SharedConnection;
use crate::error::DriverResult;

use super::key::TenantKey;

/// A shareable, in-progress connection attempt.
pub type InFlightAttempt = Shared<BoxFuture<'static, DriverResult<SharedConnection>>>;

/// Identifier of one registered attempt.
pub type AttemptId = u64;

struct Entry {
    id: AttemptId,
    attempt: InFlightAttempt,
}

/// Registry of in-flight connection attempts.
#[derive(Default)]
pub struct InFlightRegistry {
    entries: HashMap<TenantKey, Entry>,
    next_id: AttemptId,
}

impl InFlightRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the attempt running for a tenant.
    pub fn get(&self, key: &TenantKey) -> Option<InFlightAttempt> {
        self.entries.get(key).map(|e| e.attempt.clone())
    }

    /// Reserve an id for a new attempt.
    pub fn next_id(&mut self) -> AttemptId {
        self.next_id += 1;
        self.next_id
    }

    /// Register an attempt. An existing entry for the key is replaced.
    pub fn register(&mut self, key: TenantKey, id: AttemptId, attempt: InFlightAttempt) {
        self.entries.insert(key, Entry { id, attempt });
    }

    /// Remove the entry for `key` if it still belongs to attempt `id`.
    pub fn complete(&mut self, key: &TenantKey, id: AttemptId) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.id == id => {
                self.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Check whether an attempt is running for a tenant.
    pub fn contains(&self, key: &TenantKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of attempts in progress.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no attempt is in progress.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take every registered attempt out of the registry.
    ///
    /// The attempts keep running; awaiting them waits for their outcome.
    pub fn drain(&mut self) -> Vec<(TenantKey, InFlightAttempt)> {
        self.entries
            .drain()
            .map(|(key, entry)| (key, entry.attempt))
            .collect()
    }
}

impl std::fmt::Debug for InFlightRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightRegistry")
            .field("in_flight", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;
    use futures::FutureExt;

    fn failing_attempt() -> InFlightAttempt {
        async { Err(DriverError::transport("refused")) }.boxed().shared()
    }

    #[test]
    fn test_register_and_complete() {
        let mut registry = InFlightRegistry::new();
        let key = TenantKey::new("ns", "db");

        let id = registry.next_id();
        registry.register(key.clone(), id, failing_attempt());
        assert!(registry.contains(&key));
        assert_eq!(registry.len(), 1);

        assert!(registry.complete(&key, id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stale_attempt_does_not_remove_newer() {
        let mut registry = InFlightRegistry::new();
        let key = TenantKey::new("ns", "db");

        let old = registry.next_id();
        let new = registry.next_id();
        assert_ne!(old, new);

        registry.register(key.clone(), new, failing_attempt());
        assert!(!registry.complete(&key, old));
        assert!(registry.contains(&key));
    }

    #[tokio::test]
    async fn test_drain_hands_back_attempts() {
        let mut registry = InFlightRegistry::new();
        for db in ["a", "b"] {
            let id = registry.next_id();
            registry.register(TenantKey::new("ns", db), id, failing_attempt());
        }

        let drained = registry.drain();
        assert_eq!(drained.len(), 2);
        assert!(registry.is_empty());

        for (_, attempt) in drained {
            assert!(attempt.await.is_err());
        }
    }

    #[tokio::test]
    async fn test_waiters_share_outcome() {
        let mut registry = InFlightRegistry::new();
        let key = TenantKey::new("ns", "db");
        let id = registry.next_id();
        registry.register(key.clone(), id, failing_attempt());

        let a = registry.get(&key).unwrap();
        let b = registry.get(&key).unwrap();
        let (ra, rb) = tokio::join!(a, b);
        assert_eq!(ra.err(), rb.err());
    }
}
