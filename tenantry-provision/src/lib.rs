//! # tenantry-provision
//!
//! Creating tenant databases and tracking whether they are ready.
//!
//! - [`TemplateStore`] resolves a [`TenantType`](tenantry_core::TenantType) to
//!   its schema template and substitutes the database name
//! - [`Provisioner`] applies the rendered template through an
//!   [`AdminExecutor`](tenantry_core::AdminExecutor)
//! - [`SetupTracker`] records each outcome on the control tenant and answers
//!   [`check_setup`](SetupTracker::check_setup)
//!
//! ## Lifecycle
//!
//! ```text
//! (no record) ──▶ pending ──success──▶ completed
//!                    │
//!                    └──failure──▶ failed ──retry──▶ pending ...
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tenantry_provision::{Provisioner, SetupTracker, TemplateStore, TrackerConfig};
//!
//! let tracker = SetupTracker::new(manager.clone(), TrackerConfig::default());
//! let provisioner = Provisioner::new(manager, Arc::new(admin), TemplateStore::embedded(), tracker.clone());
//!
//! provisioner.create_tenant_database("acme", "retail").await?;
//! let check = tracker.check_setup("acme").await;
//! assert!(check.is_setup);
//! ```

pub mod probe;
pub mod provisioner;
pub mod template;
pub mod tracker;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use probe::DatabaseProbe;
pub use provisioner::Provisioner;
pub use template::{PLACEHOLDER, Template, TemplateStore};
pub use tracker::{Availability, SetupCheck, SetupTracker, TrackerConfig};
