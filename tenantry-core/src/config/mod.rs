//! Process configuration.
//!
//! Loaded from a `tenantry.toml` file or from `TENANTRY_*` environment
//! variables. String values under `[database]` and `[templates]` may reference
//! environment variables with `${VAR}` / `${VAR:-default}`.
//!
//! ```toml
//! [database]
//! url = "ws://${DB_HOST:-localhost}:8000/rpc"
//! username = "root"
//! password = "${DB_PASSWORD}"
//!
//! [control]
//! namespace = "platform"
//! database = "main"
//! table = "organization"
//!
//! [organizations]
//! namespace = "organizations"
//! database_prefix = "org_"
//!
//! [templates]
//! directory = "./templates"
//! ```

mod env;

pub use env::{EnvExpander, EnvSource, MapEnvSource, StdEnvSource};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{TenantError, TenantResult};
use crate::tenant::{ManagerConfig, TenantKey};

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "tenantry.toml";

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A referenced environment variable is not set.
    #[error("environment variable not found: {0}")]
    MissingVariable(String),

    /// A variable reference is malformed or a required variable is empty.
    #[error("invalid environment variable '{name}': {message}")]
    InvalidVariable { name: String, message: String },

    /// A value is out of range.
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl From<ConfigError> for TenantError {
    fn from(err: ConfigError) -> Self {
        TenantError::Config(err.to_string())
    }
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantryConfig {
    /// Store endpoint and root credentials.
    pub database: DatabaseConfig,
    /// Location of the control tenant's organization records.
    pub control: ControlConfig,
    /// Where organization databases live.
    pub organizations: OrganizationsConfig,
    /// Schema templates.
    pub templates: TemplatesConfig,
}

/// Store endpoint and root credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Endpoint URL, e.g. `ws://localhost:8000/rpc`.
    pub url: Option<String>,
    /// Root user name.
    pub username: Option<String>,
    /// Root password.
    pub password: Option<String>,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
}

/// Location of the control tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub namespace: String,
    pub database: String,
    /// Table holding one record per organization.
    pub table: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            namespace: "platform".to_string(),
            database: "main".to_string(),
            table: "organization".to_string(),
        }
    }
}

impl ControlConfig {
    /// The control tenant's key.
    pub fn key(&self) -> TenantResult<TenantKey> {
        TenantKey::try_new(self.namespace.clone(), self.database.clone())
    }
}

/// Where organization databases live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationsConfig {
    pub namespace: String,
    pub database_prefix: String,
}

impl Default for OrganizationsConfig {
    fn default() -> Self {
        let defaults = ManagerConfig::default();
        Self {
            namespace: defaults.organization_namespace,
            database_prefix: defaults.database_prefix,
        }
    }
}

/// Schema template location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory holding `<type>.surql` files. Built-in templates are used when unset.
    pub directory: Option<PathBuf>,
}

impl TenantryConfig {
    /// Load a config file, expanding variables from the process environment.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::load_with(path, &StdEnvSource)
    }

    /// Load a config file, expanding variables from `source`.
    pub fn load_with(path: impl AsRef<Path>, source: &dyn EnvSource) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str_with(&content, source)
    }

    /// Parse TOML, expanding variables from the process environment.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Self::from_toml_str_with(content, &StdEnvSource)
    }

    /// Parse TOML, expanding variables from `source`.
    pub fn from_toml_str_with(content: &str, source: &dyn EnvSource) -> ConfigResult<Self> {
        let mut config: TenantryConfig = toml::from_str(content)?;
        config.expand(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a config from `TENANTRY_*` process environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_source(&StdEnvSource)
    }

    /// Build a config from `TENANTRY_*` variables in `source`.
    ///
    /// | Variable | Key |
    /// |----------|-----|
    /// | `TENANTRY_DB_URL` | `database.url` |
    /// | `TENANTRY_DB_USER` | `database.username` |
    /// | `TENANTRY_DB_PASS` | `database.password` |
    /// | `TENANTRY_CONNECT_TIMEOUT` | `database.connect_timeout_secs` |
    /// | `TENANTRY_CONTROL_NS` | `control.namespace` |
    /// | `TENANTRY_CONTROL_DB` | `control.database` |
    /// | `TENANTRY_CONTROL_TABLE` | `control.table` |
    /// | `TENANTRY_ORG_NS` | `organizations.namespace` |
    /// | `TENANTRY_DB_PREFIX` | `organizations.database_prefix` |
    /// | `TENANTRY_TEMPLATES_DIR` | `templates.directory` |
    pub fn from_source(source: &dyn EnvSource) -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_env(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Override values with any `TENANTRY_*` variables set in `source`.
    pub fn apply_env(&mut self, source: &dyn EnvSource) -> ConfigResult<()> {
        let set = |target: &mut String, name: &str| {
            if let Some(value) = source.get(name) {
                *target = value;
            }
        };

        if let Some(url) = source.get("TENANTRY_DB_URL") {
            self.database.url = Some(url);
        }
        if let Some(user) = source.get("TENANTRY_DB_USER") {
            self.database.username = Some(user);
        }
        if let Some(pass) = source.get("TENANTRY_DB_PASS") {
            self.database.password = Some(pass);
        }
        if let Some(timeout) = source.get("TENANTRY_CONNECT_TIMEOUT") {
            let secs = timeout.trim().parse().map_err(|_| {
                ConfigError::invalid("TENANTRY_CONNECT_TIMEOUT", "expected a number of seconds")
            })?;
            self.database.connect_timeout_secs = Some(secs);
        }

        set(&mut self.control.namespace, "TENANTRY_CONTROL_NS");
        set(&mut self.control.database, "TENANTRY_CONTROL_DB");
        set(&mut self.control.table, "TENANTRY_CONTROL_TABLE");
        set(&mut self.organizations.namespace, "TENANTRY_ORG_NS");
        set(&mut self.organizations.database_prefix, "TENANTRY_DB_PREFIX");

        if let Some(dir) = source.get("TENANTRY_TEMPLATES_DIR") {
            self.templates.directory = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Settings for the connection manager.
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig::builder()
            .organization_namespace(self.organizations.namespace.clone())
            .database_prefix(self.organizations.database_prefix.clone())
            .build()
    }

    /// The control tenant's key.
    pub fn control_key(&self) -> TenantResult<TenantKey> {
        self.control.key()
    }

    fn expand(&mut self, source: &dyn EnvSource) -> ConfigResult<()> {
        let expander = EnvExpander::with_source(source);
        for value in [
            &mut self.database.url,
            &mut self.database.username,
            &mut self.database.password,
        ]
        .into_iter()
        .flatten()
        {
            if EnvExpander::<&dyn EnvSource>::has_variables(value) {
                *value = expander.expand(value)?;
            }
        }

        if let Some(dir) = &self.templates.directory {
            let raw = dir.to_string_lossy();
            if EnvExpander::<&dyn EnvSource>::has_variables(&raw) {
                self.templates.directory = Some(PathBuf::from(expander.expand(&raw)?));
            }
        }
        Ok(())
    }

    fn validate(&self) -> ConfigResult<()> {
        let required = [
            ("control.namespace", &self.control.namespace),
            ("control.database", &self.control.database),
            ("control.table", &self.control.table),
            ("organizations.namespace", &self.organizations.namespace),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(key, "must not be empty"));
            }
        }
        if self.database.connect_timeout_secs == Some(0) {
            return Err(ConfigError::invalid(
                "database.connect_timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}
