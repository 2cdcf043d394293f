//! Locating and loading the CLI configuration.

use std::path::{Path, PathBuf};

use tenantry::TenantryConfig;
use tenantry_core::config::CONFIG_FILE_NAME;
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Where a configuration was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A config file.
    File(PathBuf),
    /// `TENANTRY_*` environment variables only.
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// Load the configuration.
///
/// An explicit path must exist. Without one, `tenantry.toml` in the current
/// directory is used when present, and the environment otherwise.
pub fn load_config(explicit: Option<&Path>) -> CliResult<(TenantryConfig, ConfigSource)> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Some(path.to_path_buf())
        }
        None => {
            let default = std::env::current_dir()?.join(CONFIG_FILE_NAME);
            default.exists().then_some(default)
        }
    };

    match path {
        Some(path) => {
            debug!(path = %path.display(), "Loading config file");
            let config = TenantryConfig::load(&path)?;
            Ok((config, ConfigSource::File(path)))
        }
        None => {
            debug!("No config file, reading environment");
            Ok((TenantryConfig::from_env()?, ConfigSource::Environment))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/tenantry.toml"))).unwrap_err();
        assert!(matches!(err, CliError::Config(msg) if msg.contains("not found")));
    }

    #[test]
    fn test_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[database]\nurl = \"ws://localhost:8000/rpc\"\n\n[control]\ntable = \"org\"\n",
        )
        .unwrap();

        let (config, source) = load_config(Some(&path)).unwrap();
        assert_eq!(config.database.url.as_deref(), Some("ws://localhost:8000/rpc"));
        assert_eq!(config.control.table, "org");
        assert_eq!(source, ConfigSource::File(path));
    }

    #[test]
    fn test_source_display() {
        assert_eq!(ConfigSource::Environment.to_string(), "environment");
        assert_eq!(
            ConfigSource::File(PathBuf::from("tenantry.toml")).to_string(),
            "tenantry.toml"
        );
    }
}
