//! Tenant identity: the namespace/database key and the tenant type discriminator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TenantError, TenantResult};

/// A unique key for one tenant store.
///
/// Two keys are the same tenant when both parts match exactly; no
/// normalization (case folding, trimming) is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantKey {
    namespace: String,
    database: String,
}

impl TenantKey {
    /// Create a new tenant key without validation.
    pub fn new(namespace: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            database: database.into(),
        }
    }

    /// Create a tenant key, rejecting empty identifiers.
    pub fn try_new(namespace: impl Into<String>, database: impl Into<String>) -> TenantResult<Self> {
        let key = Self::new(namespace, database);
        if key.namespace.is_empty() {
            return Err(TenantError::invalid_identifier("namespace must not be empty"));
        }
        if key.database.is_empty() {
            return Err(TenantError::invalid_identifier("database must not be empty"));
        }
        Ok(key)
    }

    /// Get the namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get the database.
    pub fn database(&self) -> &str {
        &self.database
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.database)
    }
}

/// Derive the database name for an organization.
///
/// The derivation is a plain concatenation so the same id always maps to the
/// same database across processes.
pub fn organization_database(prefix: &str, org_id: &str) -> String {
    format!("{}{}", prefix, org_id)
}

/// Kind of tenant, selecting which schema template is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantType {
    /// Retail store.
    Retail,
    /// Restaurant.
    Restaurant,
}

impl TenantType {
    /// All accepted tenant types.
    pub const ALL: [TenantType; 2] = [TenantType::Retail, TenantType::Restaurant];

    /// Get the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retail => "retail",
            Self::Restaurant => "restaurant",
        }
    }
}

impl fmt::Display for TenantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantType {
    type Err = TenantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retail" => Ok(Self::Retail),
            "restaurant" => Ok(Self::Restaurant),
            other => Err(TenantError::InvalidTenantType(other.to_string())),
        }
    }
}
