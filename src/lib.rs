//! # Tenantry
//!
//! Per-tenant connections and database provisioning for stores that
//! partition data by namespace and database.
//!
//! Tenantry provides:
//! - One cached, authenticated connection per namespace/database pair, with
//!   concurrent first requests sharing a single connect attempt
//! - Provisioning of organization databases from per-type schema templates
//! - Setup status tracking on a control tenant
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tenantry::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tenantry::TenantError> {
//!     let config = TenantryConfig::load("tenantry.toml")?;
//!     let services = TenantServices::from_config(&config)?;
//!
//!     services.create_tenant_database("acme", "retail").await?;
//!     let check = services.check_setup("acme").await;
//!     assert!(check.is_setup);
//!
//!     services.shutdown().await;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use tracing::info;

/// Connection management, configuration, and shared types.
pub mod tenant {
    pub use tenantry_core::*;
}

/// The SurrealDB driver.
pub mod surreal {
    pub use tenantry_surreal::*;
}

/// Tenant database provisioning and setup tracking.
pub mod provision {
    pub use tenantry_provision::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::TenantServices;
    pub use tenantry_core::{
        Connection, ConnectionManager, ManagerStats, SetupStatus, TenantError, TenantKey,
        TenantResult, TenantType, TenantryConfig,
    };
    pub use tenantry_provision::{Provisioner, SetupCheck, SetupTracker};
}

// Re-export key types at the crate root
pub use tenantry_core::{
    AdminExecutor, Connector, ManagerStats, SharedConnection, ShutdownReport, TenantError,
    TenantKey, TenantResult, TenantType, TenantryConfig,
};
pub use tenantry_provision::{SetupCheck, TemplateStore};

use tenantry_core::ConnectionManager;
use tenantry_provision::{Provisioner, SetupTracker, TrackerConfig};
use tenantry_surreal::{SurrealAdmin, SurrealConfig, SurrealConnector};

/// The connection manager, setup tracker, and provisioner wired together.
///
/// Cheap to clone; clones share the same connections.
#[derive(Clone, Debug)]
pub struct TenantServices {
    manager: ConnectionManager,
    tracker: SetupTracker,
    provisioner: Provisioner,
}

impl TenantServices {
    /// Build services backed by SurrealDB from a loaded configuration.
    ///
    /// No connection is opened until the first request.
    pub fn from_config(config: &TenantryConfig) -> TenantResult<Self> {
        let surreal = SurrealConfig::from_database_config(&config.database)
            .map_err(|e| TenantError::config(e.to_string()))?;
        let connector =
            SurrealConnector::new(surreal.clone()).map_err(|e| TenantError::config(e.to_string()))?;
        let admin = SurrealAdmin::new(&surreal).map_err(|e| TenantError::config(e.to_string()))?;

        info!(
            url = %surreal.rpc_url(),
            admin = %surreal.admin_url(),
            "Configured SurrealDB driver"
        );

        Self::with_drivers(config, Arc::new(connector), Arc::new(admin))
    }

    /// Build services on custom drivers.
    pub fn with_drivers(
        config: &TenantryConfig,
        connector: Arc<dyn Connector>,
        admin: Arc<dyn AdminExecutor>,
    ) -> TenantResult<Self> {
        let manager = ConnectionManager::new(connector, config.manager_config());
        let tracker = SetupTracker::new(manager.clone(), TrackerConfig::from_config(config)?);
        let templates = TemplateStore::from_directory(config.templates.directory.as_deref());
        let provisioner = Provisioner::new(manager.clone(), admin, templates, tracker.clone());

        Ok(Self {
            manager,
            tracker,
            provisioner,
        })
    }

    /// The connection manager.
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// The setup tracker.
    pub fn tracker(&self) -> &SetupTracker {
        &self.tracker
    }

    /// The provisioner.
    pub fn provisioner(&self) -> &Provisioner {
        &self.provisioner
    }

    /// Get the connection for a namespace/database pair.
    pub async fn get_connection(
        &self,
        namespace: &str,
        database: &str,
    ) -> TenantResult<SharedConnection> {
        self.manager.get_connection(namespace, database).await
    }

    /// Get the connection for an organization's database.
    pub async fn get_organization_database(&self, org_id: &str) -> TenantResult<SharedConnection> {
        self.manager.get_organization_database(org_id).await
    }

    /// Provision the database for `tenant_id` from the `tenant_type` template.
    pub async fn create_tenant_database(&self, tenant_id: &str, tenant_type: &str) -> TenantResult<()> {
        self.provisioner
            .create_tenant_database(tenant_id, tenant_type)
            .await
    }

    /// Check whether the organization's database exists and has definitions.
    pub async fn database_exists(&self, org_id: &str) -> bool {
        self.provisioner.database_exists(org_id).await
    }

    /// Report the organization's setup status.
    pub async fn check_setup(&self, org_id: &str) -> SetupCheck {
        self.tracker.check_setup(org_id).await
    }

    /// Snapshot of cached connections and in-flight attempts.
    pub fn get_stats(&self) -> ManagerStats {
        self.manager.get_stats()
    }

    /// Close every cached connection.
    pub async fn shutdown(&self) -> ShutdownReport {
        self.manager.shutdown().await
    }
}
