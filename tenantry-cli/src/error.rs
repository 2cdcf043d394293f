//! CLI error types and result alias.

use miette::Diagnostic;
use tenantry::TenantError;
use tenantry_core::ConfigError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(tenantry::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(tenantry::config),
        help("set TENANTRY_DB_URL or pass --config <path to tenantry.toml>")
    )]
    Config(String),

    /// Tenant operation error
    #[error("{0}")]
    #[diagnostic(code(tenantry::tenant))]
    Tenant(#[from] TenantError),

    /// Output serialization error
    #[error("Output error: {0}")]
    #[diagnostic(code(tenantry::output))]
    Output(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}
