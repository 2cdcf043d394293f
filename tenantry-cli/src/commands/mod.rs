//! CLI command implementations.
//!
//! Every command that touches the store builds its own [`TenantServices`]
//! and shuts it down before returning, whether the command succeeded or not.

pub mod check;
pub mod exists;
pub mod provision;
pub mod stats;
pub mod version;

use std::future::Future;
use std::path::Path;

use tenantry::TenantServices;
use tracing::debug;

use crate::config::{ConfigSource, load_config};
use crate::error::CliResult;
use crate::output;

/// Build services from the configuration and run `body` against them.
///
/// The services are shut down once `body` finishes; close failures are
/// reported as warnings and do not change the command's result.
pub async fn with_services<F, Fut, T>(config_path: Option<&Path>, body: F) -> CliResult<T>
where
    F: FnOnce(TenantServices, ConfigSource) -> Fut,
    Fut: Future<Output = CliResult<T>>,
{
    let (config, source) = load_config(config_path)?;
    let services = TenantServices::from_config(&config)?;

    let result = body(services.clone(), source).await;

    let report = services.shutdown().await;
    debug!(closed = report.closed.len(), "Services shut down");
    for (key, error) in &report.failed {
        output::warn(&format!("Failed to close connection to {}: {}", key, error));
    }

    result
}
