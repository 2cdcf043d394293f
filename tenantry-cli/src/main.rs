//! Tenantry CLI - Provision and inspect tenant databases.

use clap::Parser;

use tenantry_cli::cli::{Cli, Command};
use tenantry_cli::commands;
use tenantry_cli::error::CliResult;
use tenantry_cli::output;

#[tokio::main]
async fn main() {
    tenantry_core::logging::init();

    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Command::Provision(args) => commands::provision::run(args, config).await,
        Command::Check(args) => commands::check::run(args, config).await,
        Command::Exists(args) => commands::exists::run(args, config).await,
        Command::Stats(args) => commands::stats::run(args, config).await,
        Command::Version => commands::version::run().await,
    }
}
