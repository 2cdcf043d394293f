//! `tenantry provision` command - Create an organization's database.

use tenantry::{TenantServices, TenantType};

use crate::cli::ProvisionArgs;
use crate::commands::with_services;
use crate::config::ConfigSource;
use crate::error::CliResult;
use crate::output::{self, kv, success};

/// Run the provision command
pub async fn run(args: ProvisionArgs, config: Option<&std::path::Path>) -> CliResult<()> {
    // Reject unknown types before loading config or touching the network
    let tenant_type: TenantType = args.tenant_type.parse()?;

    with_services(config, |services, source| {
        provision(services, source, args.tenant_id, tenant_type)
    })
    .await
}

async fn provision(
    services: TenantServices,
    source: ConfigSource,
    tenant_id: String,
    tenant_type: TenantType,
) -> CliResult<()> {
    output::header("Provision");

    let key = services
        .manager()
        .config()
        .organization_key(&tenant_id)?;

    kv("Config", &source.to_string());
    kv("Tenant", &tenant_id);
    kv("Type", tenant_type.as_str());
    kv("Database", &key.to_string());
    kv("Template", &services.provisioner().templates().path_for(tenant_type));
    output::newline();

    output::step(1, 2, "Applying schema template...");
    services
        .provisioner()
        .provision(&tenant_id, tenant_type)
        .await?;

    output::step(2, 2, "Verifying setup...");
    let check = services.check_setup(&tenant_id).await;

    output::newline();
    if check.is_setup {
        success(&format!("Tenant '{}' provisioned", tenant_id));
    } else {
        output::warn(&format!(
            "Schema applied but setup reports '{}'{}",
            check.status.as_str(),
            check
                .error
                .as_deref()
                .map(|e| format!(": {}", e))
                .unwrap_or_default()
        ));
    }

    Ok(())
}
