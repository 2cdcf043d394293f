//! Error types for tenant connection and provisioning operations.
//!
//! The taxonomy mirrors what collaborators need to tell apart:
//!
//! - [`TenantError::ConnectionFailed`]: establishing a tenant connection failed (never retried here)
//! - [`TenantError::InvalidTenantType`]: an unknown provisioning discriminator, rejected before I/O
//! - [`TenantError::ProvisioningFailed`]: the administrative endpoint rejected the schema script
//! - [`TenantError::SetupNotFound`]: the control tenant has no record for the tenant id
//!
//! Drivers report failures with [`DriverError`], which is `Clone` so that a single
//! failed establishment attempt can be handed to every caller waiting on it.
//!
//! ```rust
//! use tenantry_core::{DriverError, TenantError, TenantKey};
//!
//! let err = TenantError::connection_failed(
//!     TenantKey::new("organizations", "org_acme"),
//!     DriverError::transport("connection refused"),
//! );
//! assert!(err.is_connection_failed());
//! assert!(err.to_string().contains("org_acme"));
//! ```

use thiserror::Error;

use crate::tenant::TenantKey;

/// Result type for tenant operations.
pub type TenantResult<T> = Result<T, TenantError>;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors reported by a store driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The endpoint could not be reached or the exchange broke off.
    #[error("transport error: {0}")]
    Transport(String),

    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A statement was rejected by the store.
    #[error("query failed: {0}")]
    Query(String),

    /// The store answered with something the driver does not understand.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Driver configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The handle was already closed.
    #[error("connection closed")]
    Closed,
}

impl DriverError {
    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Errors reported by an administrative script endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    /// The endpoint answered but refused the script.
    #[error("rejected with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, kept for diagnostics.
        body: String,
    },

    /// The endpoint could not be reached.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors surfaced to collaborators.
///
/// `Clone`, so one provisioning attempt can report its outcome to every caller
/// that joined it.
#[derive(Error, Debug, Clone)]
pub enum TenantError {
    /// A connection to the tenant could not be established.
    #[error("connection establishment failed for {key}: {source}")]
    ConnectionFailed {
        /// Tenant the attempt was for.
        key: TenantKey,
        /// Underlying transport error.
        #[source]
        source: DriverError,
    },

    /// Unknown tenant type passed to the provisioner.
    #[error("invalid tenant type: '{0}'")]
    InvalidTenantType(String),

    /// The administrative endpoint rejected the provisioning script.
    #[error("provisioning execution failed for {database}: {message}")]
    ProvisioningFailed {
        /// Database that was being provisioned.
        database: String,
        /// HTTP status, when the endpoint answered.
        status: Option<u16>,
        /// Response body, when the endpoint answered.
        body: Option<String>,
        /// Human readable summary.
        message: String,
    },

    /// The control tenant holds no record for this tenant id.
    #[error("setup record not found for tenant '{0}'")]
    SetupNotFound(String),

    /// An empty or otherwise unusable identifier.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A query against an established connection failed.
    #[error("query error: {0}")]
    Query(#[from] DriverError),

    /// Schema template could not be loaded or rendered.
    #[error("template error ({path}): {message}")]
    Template {
        /// Template location.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// Stored metadata could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for TenantError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl TenantError {
    /// Create a connection failure for a tenant.
    pub fn connection_failed(key: TenantKey, source: DriverError) -> Self {
        Self::ConnectionFailed { key, source }
    }

    /// Create an invalid identifier error.
    pub fn invalid_identifier(message: impl Into<String>) -> Self {
        Self::InvalidIdentifier(message.into())
    }

    /// Create a template error.
    pub fn template(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Build a provisioning failure from an administrative endpoint error.
    pub fn provisioning_failed(database: impl Into<String>, err: AdminError) -> Self {
        let database = database.into();
        match err {
            AdminError::Rejected { status, body } => Self::ProvisioningFailed {
                message: format!("administrative endpoint returned {}", status),
                database,
                status: Some(status),
                body: Some(body),
            },
            AdminError::Transport(message) => Self::ProvisioningFailed {
                database,
                status: None,
                body: None,
                message,
            },
        }
    }

    /// Check if this is a connection failure.
    pub fn is_connection_failed(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. })
    }

    /// Check if this is an invalid tenant type.
    pub fn is_invalid_tenant_type(&self) -> bool {
        matches!(self, Self::InvalidTenantType(_))
    }

    /// Check if this is a provisioning failure.
    pub fn is_provisioning_failed(&self) -> bool {
        matches!(self, Self::ProvisioningFailed { .. })
    }

    /// Check if this is a missing setup record.
    pub fn is_setup_not_found(&self) -> bool {
        matches!(self, Self::SetupNotFound(_))
    }
}
