//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Tenantry CLI - Provision and inspect tenant databases
#[derive(Parser, Debug)]
#[command(name = "tenantry")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(about = "Tenantry CLI - Provision and inspect tenant databases", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file (defaults to ./tenantry.toml, then the environment)
    #[arg(short, long, global = true, env = "TENANTRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provision an organization's database from its type's schema template
    Provision(ProvisionArgs),

    /// Report an organization's setup status
    Check(CheckArgs),

    /// Check whether an organization's database exists
    Exists(TenantArgs),

    /// Show connection manager statistics
    Stats(StatsArgs),

    /// Display version information
    Version,
}

/// Arguments for the `provision` command
#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Organization id
    pub tenant_id: String,

    /// Tenant type selecting the schema template (retail or restaurant)
    #[arg(short = 't', long = "type")]
    pub tenant_type: String,
}

/// Arguments for the `check` command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Organization id
    pub tenant_id: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments naming one organization
#[derive(Args, Debug)]
pub struct TenantArgs {
    /// Organization id
    pub tenant_id: String,
}

/// Arguments for the `stats` command
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Organizations to connect to before reporting
    #[arg(short, long = "tenant", value_name = "TENANT_ID")]
    pub tenants: Vec<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}
