//! `tenantry check` command - Report an organization's setup status.

use std::path::Path;

use tenantry::provision::Availability;

use crate::cli::CheckArgs;
use crate::commands::with_services;
use crate::error::CliResult;
use crate::output::{self, kv};

/// Run the check command
pub async fn run(args: CheckArgs, config: Option<&Path>) -> CliResult<()> {
    with_services(config, |services, _| async move {
        let check = services.check_setup(&args.tenant_id).await;

        if args.json {
            return output::json(&check);
        }

        output::header("Setup Status");
        kv("Tenant", &args.tenant_id);

        let status = match check.availability() {
            Availability::Ready => output::style_success(check.status.as_str()),
            Availability::Provisioning => output::style_pending(check.status.as_str()),
            Availability::SetupFailed => output::style_error(check.status.as_str()),
        };
        kv("Status", &status);
        kv("Ready", if check.is_setup { "yes" } else { "no" });

        if let Some(error) = &check.error {
            kv("Error", error);
        }

        if let Some(setup) = check.metadata.as_ref().and_then(|m| m.setup.as_ref()) {
            output::newline();
            output::section("Last attempt");
            if let Some(database) = &setup.database {
                kv("Database", database);
            }
            if let Some(tenant_type) = &setup.organization_type {
                kv("Type", tenant_type);
            }
            if let Some(timestamp) = &setup.setup_timestamp {
                kv("Recorded", &timestamp.to_rfc3339());
            }
        }

        Ok(())
    })
    .await
}
