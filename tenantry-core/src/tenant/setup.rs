//! Provisioning status records stored on a tenant's control-tenant entry.
//!
//! A tenant's metadata object has one typed key, `setup`, and any number of
//! unrelated keys owned by other parts of the platform. Updates go through
//! [`TenantMetadata::merge_setup`], which only ever touches `setup`:
//!
//! ```rust
//! use serde_json::json;
//! use tenantry_core::{SetupPatch, SetupStatus, TenantMetadata, TenantType};
//!
//! let mut metadata: TenantMetadata = serde_json::from_value(json!({
//!     "plan": "pro",
//!     "setup": { "setupStatus": "failed", "setupError": "boom", "notes": "kept" }
//! })).unwrap();
//!
//! metadata.merge_setup(SetupPatch::completed("org_acme", TenantType::Retail));
//!
//! let setup = metadata.setup.as_ref().unwrap();
//! assert_eq!(setup.setup_status, Some(SetupStatus::Completed));
//! assert_eq!(setup.setup_error, None);
//! assert_eq!(setup.extra["notes"], "kept");
//! assert_eq!(metadata.extra["plan"], "pro");
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::key::TenantType;

/// Lifecycle state of a tenant's provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetupStatus {
    /// Not provisioned yet, or provisioning in progress.
    Pending,
    /// The schema was applied.
    Completed,
    /// The last attempt failed.
    Failed,
}

impl SetupStatus {
    /// Get the stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SetupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `setup` sub-object of a tenant's metadata.
///
/// Fields are optional because records written by hand or by older releases
/// may carry only some of them. Keys this type does not know are kept in
/// `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupRecord {
    /// Derived database name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Outcome of the last provisioning attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_status: Option<SetupStatus>,
    /// When the outcome was recorded (ISO-8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_timestamp: Option<DateTime<Utc>>,
    /// Failure description of the last failed attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_error: Option<String>,
    /// Tenant type the schema was selected for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_type: Option<String>,
    /// Any other keys found in the stored object.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SetupRecord {
    /// Apply a patch. Every field the patch sets wins; the rest is untouched.
    pub fn apply(&mut self, patch: SetupPatch) {
        if let Some(database) = patch.database {
            self.database = Some(database);
        }
        if let Some(status) = patch.setup_status {
            self.setup_status = Some(status);
        }
        if let Some(timestamp) = patch.setup_timestamp {
            self.setup_timestamp = Some(timestamp);
        }
        if let Some(error) = patch.setup_error {
            self.setup_error = error;
        }
        if let Some(kind) = patch.organization_type {
            self.organization_type = Some(kind);
        }
    }
}

/// A partial update to a [`SetupRecord`].
///
/// `setup_error` is two-level: `None` leaves the stored value alone,
/// `Some(None)` removes it, `Some(Some(..))` replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupPatch {
    /// New database name.
    pub database: Option<String>,
    /// New status.
    pub setup_status: Option<SetupStatus>,
    /// New timestamp.
    pub setup_timestamp: Option<DateTime<Utc>>,
    /// New error, or its removal.
    pub setup_error: Option<Option<String>>,
    /// New tenant type.
    pub organization_type: Option<String>,
}

impl SetupPatch {
    /// Patch recording a successful attempt. Clears any earlier error.
    pub fn completed(database: impl Into<String>, tenant_type: TenantType) -> Self {
        Self {
            database: Some(database.into()),
            setup_status: Some(SetupStatus::Completed),
            setup_timestamp: Some(Utc::now()),
            setup_error: Some(None),
            organization_type: Some(tenant_type.as_str().to_string()),
        }
    }

    /// Patch recording a failed attempt.
    pub fn failed(
        database: impl Into<String>,
        tenant_type: TenantType,
        error: impl Into<String>,
    ) -> Self {
        Self {
            database: Some(database.into()),
            setup_status: Some(SetupStatus::Failed),
            setup_timestamp: Some(Utc::now()),
            setup_error: Some(Some(error.into())),
            organization_type: Some(tenant_type.as_str().to_string()),
        }
    }

    /// Override the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.setup_timestamp = Some(timestamp);
        self
    }
}

/// Metadata object stored on a tenant's control-tenant record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantMetadata {
    /// Provisioning status, absent until the first attempt is recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<SetupRecord>,
    /// Metadata owned by other components.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TenantMetadata {
    /// Parse a stored metadata value. `null` yields empty metadata.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Null => Ok(Self::default()),
            other => serde_json::from_value(other),
        }
    }

    /// Convert back into a JSON object.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Merge a patch into the `setup` object, creating it if needed.
    pub fn merge_setup(&mut self, patch: SetupPatch) {
        self.setup.get_or_insert_with(SetupRecord::default).apply(patch);
    }

    /// Recorded status, if any.
    pub fn setup_status(&self) -> Option<SetupStatus> {
        self.setup.as_ref().and_then(|s| s.setup_status)
    }
}
