//! `tenantry stats` command - Show connection manager statistics.

use std::path::Path;

use crate::cli::StatsArgs;
use crate::commands::with_services;
use crate::error::CliResult;
use crate::output::{self, kv};

/// Run the stats command
pub async fn run(args: StatsArgs, config: Option<&Path>) -> CliResult<()> {
    with_services(config, |services, source| async move {
        let control = &services.tracker().config().control;
        if let Err(e) = services
            .get_connection(control.namespace(), control.database())
            .await
        {
            output::warn(&format!("Control tenant {}: {}", control, e));
        }

        for tenant_id in &args.tenants {
            if let Err(e) = services.get_organization_database(tenant_id).await {
                output::warn(&format!("{}: {}", tenant_id, e));
            }
        }

        let stats = services.get_stats();

        if args.json {
            return output::json(&stats);
        }

        output::header("Connection Manager");
        kv("Config", &source.to_string());
        kv("Connections", &stats.count.to_string());
        kv("In flight", &stats.in_flight_count.to_string());
        kv("Connects started", &stats.connects_started.to_string());
        kv("Connects failed", &stats.connects_failed.to_string());
        kv("Cache hits", &stats.cache_hits.to_string());

        if !stats.keys.is_empty() {
            output::newline();
            output::section("Tenants");
            for key in &stats.keys {
                output::list_item(&key.to_string());
            }
        }

        Ok(())
    })
    .await
}
