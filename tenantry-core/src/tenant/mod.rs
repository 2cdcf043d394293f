//! Tenant identity, provisioning records and per-tenant connections.
//!
//! Every tenant lives in its own `(namespace, database)` pair on one store
//! server. The [`ConnectionManager`] hands out exactly one long-lived
//! connection per pair, establishing it on first use and sharing any
//! in-progress attempt between concurrent callers.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tenantry_core::tenant::{ConnectionManager, ManagerConfig};
//!
//! let manager = ConnectionManager::new(Arc::new(connector), ManagerConfig::default());
//!
//! // The control tenant
//! let control = manager.get_connection("platform", "main").await?;
//!
//! // An organization: organizations/org_acme
//! let acme = manager.get_organization_database("acme").await?;
//! let rows = acme.query("SELECT * FROM product", serde_json::Value::Null).await?;
//! ```
//!
//! # Organization databases
//!
//! Organization ids map to databases by prefixing, with no escaping:
//!
//! ```rust
//! use tenantry_core::tenant::organization_database;
//!
//! assert_eq!(organization_database("org_", "acme"), "org_acme");
//! ```

mod cache;
mod key;
mod manager;
mod registry;
mod setup;

pub use cache::ConnectionCache;
pub use key::{TenantKey, TenantType, organization_database};
pub use manager::{
    ConnectionManager, ManagerConfig, ManagerConfigBuilder, ManagerStats, ShutdownReport,
};
pub use registry::{AttemptId, InFlightAttempt, InFlightRegistry};
pub use setup::{SetupPatch, SetupRecord, SetupStatus, TenantMetadata};
