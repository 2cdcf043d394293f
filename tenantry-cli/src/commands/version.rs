//! `tenantry version` command - Display version information.

use tenantry::TenantType;

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name
const NAME: &str = env!("CARGO_PKG_NAME");

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::header("Tenantry");

    kv("Version", VERSION);
    kv("Binary", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);

    let types: Vec<_> = TenantType::ALL.iter().map(|t| t.as_str()).collect();
    kv("Tenant types", &types.join(", "));

    output::newline();

    output::section("Components");
    kv("tenantry-core", env!("CARGO_PKG_VERSION"));
    kv("tenantry-surreal", env!("CARGO_PKG_VERSION"));
    kv("tenantry-provision", env!("CARGO_PKG_VERSION"));

    output::newline();
    output::dim("https://github.com/pegasusheavy/tenantry");

    Ok(())
}
