//! Provisioning status stored on the control tenant.
//!
//! Each organization has one record in the control tenant's organization
//! table, keyed by its id. The record's `metadata` object carries a `setup`
//! sub-object maintained here; every other metadata key belongs to someone
//! else and is written back untouched.

use serde::Serialize;
use serde_json::{Value, json};
use tenantry_core::{
    Connection, ConnectionManager, SetupPatch, SetupStatus, TenantError, TenantKey,
    TenantMetadata, TenantResult, TenantryConfig,
};
use tracing::{debug, info};

use crate::probe::DatabaseProbe;

/// Reads one record's metadata.
pub const SELECT_METADATA: &str = "SELECT metadata FROM type::thing($table, $id)";

/// Replaces one record's metadata.
pub const UPDATE_METADATA: &str =
    "UPDATE type::thing($table, $id) SET metadata = $metadata RETURN NONE";

/// Error text reported when no record exists.
pub const NOT_FOUND: &str = "not found";

/// Location of the organization records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// The control tenant.
    pub control: TenantKey,
    /// Table holding one record per organization.
    pub table: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            control: TenantKey::new("platform", "main"),
            table: "organization".to_string(),
        }
    }
}

impl TrackerConfig {
    /// Take the control tenant and table from a loaded config.
    pub fn from_config(config: &TenantryConfig) -> TenantResult<Self> {
        Ok(Self {
            control: config.control_key()?,
            table: config.control.table.clone(),
        })
    }
}

/// How collaborators should treat a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Provisioned and usable.
    Ready,
    /// Not usable yet. Retry later.
    Provisioning,
    /// Provisioning failed. Needs support.
    SetupFailed,
}

/// Result of [`SetupTracker::check_setup`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupCheck {
    /// Whether the tenant is provisioned and usable.
    pub is_setup: bool,
    /// Effective status.
    pub status: SetupStatus,
    /// Stored failure text, or why the status could not be determined.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The tenant's metadata, when a record was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TenantMetadata>,
}

impl SetupCheck {
    fn pending(error: impl Into<String>, metadata: Option<TenantMetadata>) -> Self {
        Self {
            is_setup: false,
            status: SetupStatus::Pending,
            error: Some(error.into()),
            metadata,
        }
    }

    /// Check if the tenant is still pending.
    pub fn is_pending(&self) -> bool {
        self.status == SetupStatus::Pending
    }

    /// Check if the last provisioning attempt failed.
    pub fn is_failed(&self) -> bool {
        self.status == SetupStatus::Failed
    }

    /// Classify for presentation.
    pub fn availability(&self) -> Availability {
        match self.status {
            SetupStatus::Completed if self.is_setup => Availability::Ready,
            SetupStatus::Failed => Availability::SetupFailed,
            _ => Availability::Provisioning,
        }
    }
}

/// Records and reports provisioning outcomes.
#[derive(Debug, Clone)]
pub struct SetupTracker {
    manager: ConnectionManager,
    probe: DatabaseProbe,
    config: TrackerConfig,
}

impl SetupTracker {
    /// Create a tracker reading the control tenant through `manager`.
    pub fn new(manager: ConnectionManager, config: TrackerConfig) -> Self {
        Self {
            probe: DatabaseProbe::new(manager.clone()),
            manager,
            config,
        }
    }

    /// The tracker configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn record_vars(&self, tenant_id: &str) -> Value {
        json!({ "table": self.config.table, "id": tenant_id })
    }

    /// Read a tenant's metadata. `None` when the record does not exist.
    pub async fn fetch_metadata(&self, tenant_id: &str) -> TenantResult<Option<TenantMetadata>> {
        if tenant_id.is_empty() {
            return Err(TenantError::invalid_identifier("tenant id must not be empty"));
        }

        let control = self.manager.get(&self.config.control).await?;
        let rows = control
            .query_first(SELECT_METADATA, self.record_vars(tenant_id))
            .await?;

        let row = match rows {
            Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            Value::Object(row) => Value::Object(row),
            _ => return Ok(None),
        };

        let metadata = row.get("metadata").cloned().unwrap_or(Value::Null);
        Ok(Some(TenantMetadata::from_value(metadata)?))
    }

    /// Merge `patch` into a tenant's `setup` object and write the metadata back.
    ///
    /// Fails with [`TenantError::SetupNotFound`] when the record does not
    /// exist; records are never created here.
    pub async fn record_setup_outcome(&self, tenant_id: &str, patch: SetupPatch) -> TenantResult<()> {
        let mut metadata = self
            .fetch_metadata(tenant_id)
            .await?
            .ok_or_else(|| TenantError::SetupNotFound(tenant_id.to_string()))?;

        let status = patch.setup_status;
        metadata.merge_setup(patch);

        let mut vars = self.record_vars(tenant_id);
        vars["metadata"] = metadata.to_value()?;

        let control = self.manager.get(&self.config.control).await?;
        control.query(UPDATE_METADATA, vars).await?;

        info!(tenant_id, status = ?status, "Recorded setup outcome");
        Ok(())
    }

    /// Report a tenant's provisioning state. Never fails.
    ///
    /// Database existence is checked first and overrides a stored `completed`
    /// or `pending`: a missing database is `pending`. A stored `failed` is
    /// reported as is, since a rejected script usually leaves no database
    /// behind. For an existing database the stored status wins, and a record
    /// without one is taken as `completed`.
    pub async fn check_setup(&self, tenant_id: &str) -> SetupCheck {
        let metadata = match self.fetch_metadata(tenant_id).await {
            Ok(Some(metadata)) => metadata,
            Ok(None) => return SetupCheck::pending(NOT_FOUND, None),
            Err(e) => {
                debug!(tenant_id, error = %e, "Setup check could not read control record");
                return SetupCheck::pending(e.to_string(), None);
            }
        };

        let stored = metadata.setup_status();
        if stored != Some(SetupStatus::Failed) && !self.probe.exists(tenant_id).await {
            return SetupCheck {
                is_setup: false,
                status: SetupStatus::Pending,
                error: None,
                metadata: Some(metadata),
            };
        }

        let (status, error) = match &metadata.setup {
            Some(setup) => (
                setup.setup_status.unwrap_or(SetupStatus::Completed),
                setup.setup_error.clone(),
            ),
            None => (SetupStatus::Completed, None),
        };

        SetupCheck {
            is_setup: status == SetupStatus::Completed,
            status,
            error: if status == SetupStatus::Failed { error } else { None },
            metadata: Some(metadata),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStore;
    use pretty_assertions::assert_eq;
    use tenantry_core::{DriverError, TenantType};

    fn tracker(store: &FakeStore) -> SetupTracker {
        SetupTracker::new(store.manager(), TrackerConfig::default())
    }

    #[tokio::test]
    async fn test_fetch_missing_record() {
        let store = FakeStore::new();
        assert_eq!(tracker(&store).fetch_metadata("acme").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fetch_null_metadata_is_empty() {
        let store = FakeStore::new().with_record("acme", Value::Null);
        let metadata = tracker(&store).fetch_metadata("acme").await.unwrap().unwrap();
        assert_eq!(metadata, TenantMetadata::default());
    }

    #[tokio::test]
    async fn test_record_merges_into_existing_metadata() {
        let store = FakeStore::new().with_record(
            "acme",
            json!({ "plan": "pro", "setup": { "setupStatus": "pending", "owner": "ops" } }),
        );
        let tracker = tracker(&store);

        tracker
            .record_setup_outcome("acme", SetupPatch::failed("org_acme", TenantType::Retail, "boom"))
            .await
            .unwrap();

        let stored = store.metadata("acme").unwrap();
        assert_eq!(stored["plan"], "pro");
        assert_eq!(stored["setup"]["owner"], "ops");
        assert_eq!(stored["setup"]["setupStatus"], "failed");
        assert_eq!(stored["setup"]["setupError"], "boom");
    }

    #[tokio::test]
    async fn test_record_on_missing_record() {
        let store = FakeStore::new();
        let err = tracker(&store)
            .record_setup_outcome("ghost", SetupPatch::completed("org_ghost", TenantType::Retail))
            .await
            .unwrap_err();
        assert!(err.is_setup_not_found());
        assert!(store.metadata("ghost").is_none());
    }

    #[tokio::test]
    async fn test_check_not_found() {
        let store = FakeStore::new();
        let check = tracker(&store).check_setup("acme").await;
        assert_eq!(check, SetupCheck::pending(NOT_FOUND, None));
        assert_eq!(check.availability(), Availability::Provisioning);
    }

    #[tokio::test]
    async fn test_check_inferred_completed() {
        let store = FakeStore::new()
            .with_record("legacy", json!({ "plan": "basic" }))
            .with_database("org_legacy");

        let check = tracker(&store).check_setup("legacy").await;
        assert!(check.is_setup);
        assert_eq!(check.status, SetupStatus::Completed);
        assert_eq!(check.availability(), Availability::Ready);
    }

    #[tokio::test]
    async fn test_check_missing_database_overrides_completed() {
        let store = FakeStore::new().with_record(
            "acme",
            json!({ "setup": { "setupStatus": "completed", "database": "org_acme" } }),
        );

        let check = tracker(&store).check_setup("acme").await;
        assert!(!check.is_setup);
        assert!(check.is_pending());
        assert!(check.metadata.is_some());
    }

    #[tokio::test]
    async fn test_check_failed_reports_error() {
        let store = FakeStore::new()
            .with_record(
                "acme",
                json!({ "setup": { "setupStatus": "failed", "setupError": "syntax error" } }),
            )
            .with_database("org_acme");

        let check = tracker(&store).check_setup("acme").await;
        assert!(check.is_failed());
        assert!(!check.is_setup);
        assert_eq!(check.error.as_deref(), Some("syntax error"));
        assert_eq!(check.availability(), Availability::SetupFailed);
    }

    #[tokio::test]
    async fn test_check_failed_without_database_stays_failed() {
        let store = FakeStore::new().with_record(
            "acme",
            json!({ "setup": { "setupStatus": "failed", "setupError": "connection refused" } }),
        );

        let check = tracker(&store).check_setup("acme").await;
        assert!(check.is_failed());
        assert_eq!(check.error.as_deref(), Some("connection refused"));
        assert_eq!(store.connector().open_count(), 1);
    }

    #[tokio::test]
    async fn test_check_control_failure_is_pending() {
        let store = FakeStore::new().with_record("acme", json!({}));
        store.fail_reads(DriverError::query("control tenant unavailable"));

        let check = tracker(&store).check_setup("acme").await;
        assert!(check.is_pending());
        assert!(check.error.unwrap().contains("control tenant unavailable"));
    }

    #[test]
    fn test_config_from_tenantry_config() {
        let mut config = TenantryConfig::default();
        config.control.table = "tenant".into();

        let tracker_config = TrackerConfig::from_config(&config).unwrap();
        assert_eq!(tracker_config.control, TenantKey::new("platform", "main"));
        assert_eq!(tracker_config.table, "tenant");
    }

    #[test]
    fn test_check_serializes_camel_case() {
        let check = SetupCheck::pending(NOT_FOUND, None);
        let value = serde_json::to_value(&check).unwrap();
        assert_eq!(value, json!({ "isSetup": false, "status": "pending", "error": "not found" }));
    }
}
