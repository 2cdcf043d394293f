//! # tenantry-surreal
//!
//! Driver for namespace/database stores speaking the SurrealDB HTTP protocol.
//!
//! - [`SurrealConnector`] opens connections over the JSON-RPC endpoint
//!   (`/rpc`), signing in with root credentials
//! - [`SurrealConnection`] runs queries with the tenant's selector headers
//! - [`SurrealAdmin`] posts provisioning scripts to the SQL endpoint (`/sql`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tenantry_core::{ConnectionManager, ManagerConfig};
//! use tenantry_surreal::{SurrealAdmin, SurrealConfig, SurrealConnector};
//!
//! let config = SurrealConfig::from_env()?;
//! let manager = ConnectionManager::new(
//!     Arc::new(SurrealConnector::new(config.clone())?),
//!     ManagerConfig::default(),
//! );
//! let admin = SurrealAdmin::new(&config)?;
//! ```

pub mod admin;
pub mod config;
pub mod connection;
pub mod connector;
pub mod error;
pub mod rpc;

pub use admin::SurrealAdmin;
pub use config::{SurrealConfig, SurrealConfigBuilder};
pub use connection::SurrealConnection;
pub use connector::SurrealConnector;
pub use error::{SurrealError, SurrealResult};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::admin::SurrealAdmin;
    pub use crate::config::{SurrealConfig, SurrealConfigBuilder};
    pub use crate::connection::SurrealConnection;
    pub use crate::connector::SurrealConnector;
    pub use crate::error::{SurrealError, SurrealResult};
}
