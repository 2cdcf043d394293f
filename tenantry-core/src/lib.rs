//! # tenantry-core
//!
//! Core building blocks for multi-tenant access to a namespace/database store.
//!
//! - [`tenant`]: tenant keys, provisioning records, and the [`ConnectionManager`]
//! - [`driver`]: the traits a store driver implements
//! - [`error`]: the error taxonomy shared by every Tenantry crate
//! - [`config`]: `tenantry.toml` loading with environment expansion
//! - [`logging`]: `TENANTRY_*` controlled tracing setup
//!
//! ## Connections
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tenantry_core::{ConnectionManager, ManagerConfig};
//!
//! let manager = ConnectionManager::new(Arc::new(connector), ManagerConfig::default());
//! let conn = manager.get_organization_database("acme").await?;
//! ```
//!
//! ## Tenant types
//!
//! ```rust
//! use tenantry_core::TenantType;
//!
//! let kind: TenantType = "retail".parse().unwrap();
//! assert_eq!(kind, TenantType::Retail);
//! assert!("Retail".parse::<TenantType>().is_err());
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod tenant;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{ConfigError, TenantryConfig};
pub use driver::{AdminExecutor, Connection, Connector, SharedConnection};
pub use error::{AdminError, DriverError, DriverResult, TenantError, TenantResult};
pub use tenant::{
    ConnectionCache, ConnectionManager, InFlightRegistry, ManagerConfig, ManagerStats,
    SetupPatch, SetupRecord, SetupStatus, ShutdownReport, TenantKey, TenantMetadata,
    TenantType, organization_database,
};
