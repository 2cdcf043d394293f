//! `tenantry exists` command - Check for an organization's database.

use std::path::Path;

use crate::cli::TenantArgs;
use crate::commands::with_services;
use crate::error::CliResult;
use crate::output;

/// Run the exists command
pub async fn run(args: TenantArgs, config: Option<&Path>) -> CliResult<()> {
    with_services(config, |services, _| async move {
        let key = services
            .manager()
            .config()
            .organization_key(&args.tenant_id)?;

        if services.database_exists(&args.tenant_id).await {
            output::success(&format!("Database {} exists", key));
        } else {
            output::info(&format!("Database {} does not exist", key));
        }

        Ok(())
    })
    .await
}
