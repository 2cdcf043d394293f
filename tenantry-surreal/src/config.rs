//! Endpoint configuration.

use std::time::Duration;

use tenantry_core::config::{DatabaseConfig, EnvSource, StdEnvSource};
use url::Url;

use crate::error::{SurrealError, SurrealResult};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Store endpoint and root credentials.
#[derive(Debug, Clone)]
pub struct SurrealConfig {
    /// The URL as given.
    pub url: String,
    /// Root user name.
    pub username: Option<String>,
    /// Root password.
    pub password: Option<String>,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Timeout for a whole request.
    pub request_timeout: Duration,
    rpc: Url,
    admin: Url,
}

impl SurrealConfig {
    /// Parse an endpoint URL such as `ws://root:root@localhost:8000/rpc`.
    ///
    /// Accepted schemes are `ws`, `wss`, `http` and `https`. Credentials in
    /// the URL become the root credentials; `connect_timeout` (seconds) may be
    /// given as a query parameter.
    pub fn from_url(url: impl Into<String>) -> SurrealResult<Self> {
        let url = url.into();
        let parsed = Url::parse(&url)
            .map_err(|e| SurrealError::config(format!("invalid database URL: {}", e)))?;

        if !matches!(parsed.scheme(), "ws" | "wss" | "http" | "https") {
            return Err(SurrealError::config(format!(
                "invalid scheme: expected 'ws', 'wss', 'http' or 'https', got '{}'",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(SurrealError::config("missing host in URL"));
        }

        let username = Some(parsed.username())
            .filter(|u| !u.is_empty())
            .map(String::from);
        let password = parsed.password().map(String::from);

        let mut connect_timeout = DEFAULT_CONNECT_TIMEOUT;
        for (key, value) in parsed.query_pairs() {
            if key == "connect_timeout" {
                let secs: u64 = value
                    .parse()
                    .map_err(|_| SurrealError::config("invalid connect_timeout"))?;
                connect_timeout = Duration::from_secs(secs);
            }
        }

        let (rpc, admin) = endpoints(&parsed)?;

        Ok(Self {
            url,
            username,
            password,
            connect_timeout,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            rpc,
            admin,
        })
    }

    /// Create a builder.
    pub fn builder() -> SurrealConfigBuilder {
        SurrealConfigBuilder::new()
    }

    /// Read `TENANTRY_DB_URL`, `TENANTRY_DB_USER`, `TENANTRY_DB_PASS` and
    /// `TENANTRY_CONNECT_TIMEOUT` from the process environment.
    pub fn from_env() -> SurrealResult<Self> {
        Self::from_env_source(&StdEnvSource)
    }

    /// Like [`from_env`](Self::from_env), reading from `source`.
    pub fn from_env_source(source: &dyn EnvSource) -> SurrealResult<Self> {
        let url = source
            .get("TENANTRY_DB_URL")
            .ok_or_else(|| SurrealError::config("TENANTRY_DB_URL is not set"))?;

        let mut builder = Self::builder().url(url);
        if let Some(user) = source.get("TENANTRY_DB_USER") {
            builder = builder.username(user);
        }
        if let Some(pass) = source.get("TENANTRY_DB_PASS") {
            builder = builder.password(pass);
        }
        if let Some(timeout) = source.get("TENANTRY_CONNECT_TIMEOUT") {
            let secs: u64 = timeout
                .trim()
                .parse()
                .map_err(|_| SurrealError::config("invalid TENANTRY_CONNECT_TIMEOUT"))?;
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    /// Build from the `[database]` section of a loaded config.
    pub fn from_database_config(config: &DatabaseConfig) -> SurrealResult<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| SurrealError::config("database.url is not set"))?;

        let mut builder = Self::builder().url(url);
        if let Some(user) = &config.username {
            builder = builder.username(user.clone());
        }
        if let Some(pass) = &config.password {
            builder = builder.password(pass.clone());
        }
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    /// The JSON-RPC endpoint: the URL with `ws` mapped to `http` and `wss` to `https`.
    pub fn rpc_url(&self) -> &Url {
        &self.rpc
    }

    /// The administrative SQL endpoint.
    ///
    /// ```rust
    /// use tenantry_surreal::SurrealConfig;
    ///
    /// let config = SurrealConfig::from_url("wss://db.example.com/rpc").unwrap();
    /// assert_eq!(config.admin_url().as_str(), "https://db.example.com/sql");
    /// ```
    pub fn admin_url(&self) -> &Url {
        &self.admin
    }

    /// Root credentials, when both parts are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}

/// Derive the RPC and admin endpoints from a parsed URL.
fn endpoints(parsed: &Url) -> SurrealResult<(Url, Url)> {
    let mut rpc = parsed.clone();
    rpc.set_query(None);
    rpc.set_fragment(None);
    let _ = rpc.set_username("");
    let _ = rpc.set_password(None);

    let scheme = match rpc.scheme() {
        "ws" => Some("http"),
        "wss" => Some("https"),
        _ => None,
    };
    if let Some(scheme) = scheme {
        rpc.set_scheme(scheme)
            .map_err(|_| SurrealError::config(format!("cannot rewrite scheme to {}", scheme)))?;
    }

    let mut admin = rpc.clone();
    let path = admin.path().trim_end_matches('/');
    let sql_path = match path.strip_suffix("/rpc") {
        Some(base) => format!("{}/sql", base),
        None => format!("{}/sql", path),
    };
    admin.set_path(&sql_path);

    Ok((rpc, admin))
}

/// Builder for [`SurrealConfig`].
#[derive(Debug, Default)]
pub struct SurrealConfigBuilder {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl SurrealConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the root user name.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the root password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build the configuration. Explicit values override those in the URL.
    pub fn build(self) -> SurrealResult<SurrealConfig> {
        let url = self
            .url
            .ok_or_else(|| SurrealError::config("database URL is required"))?;
        let mut config = SurrealConfig::from_url(url)?;

        if let Some(username) = self.username {
            config.username = Some(username);
        }
        if let Some(password) = self.password {
            config.password = Some(password);
        }
        if let Some(timeout) = self.connect_timeout {
            config.connect_timeout = timeout;
        }
        if let Some(timeout) = self.request_timeout {
            config.request_timeout = timeout;
        }
        if config.connect_timeout.is_zero() {
            return Err(SurrealError::config("connect timeout must be greater than zero"));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tenantry_core::config::MapEnvSource;

    #[test]
    fn test_config_from_url() {
        let config = SurrealConfig::from_url("ws://root:secret@localhost:8000/rpc").unwrap();
        assert_eq!(config.credentials(), Some(("root", "secret")));
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.rpc_url().as_str(), "http://localhost:8000/rpc");
    }

    #[test]
    fn test_admin_url_rewriting() {
        let cases = [
            ("ws://h:8000/rpc", "http://h:8000/sql"),
            ("wss://h/rpc", "https://h/sql"),
            ("http://h:8000/rpc", "http://h:8000/sql"),
            ("https://h/db/rpc/", "https://h/db/sql"),
            ("ws://h:8000", "http://h:8000/sql"),
            ("ws://h:8000/custom", "http://h:8000/custom/sql"),
        ];
        for (input, expected) in cases {
            let config = SurrealConfig::from_url(input).unwrap();
            assert_eq!(config.admin_url().as_str(), expected, "for {}", input);
        }
    }

    #[test]
    fn test_endpoints_drop_credentials() {
        let config = SurrealConfig::from_url("wss://root:pw@db.example.com/rpc").unwrap();
        assert_eq!(config.rpc_url().as_str(), "https://db.example.com/rpc");
        assert_eq!(config.admin_url().username(), "");
        assert_eq!(config.admin_url().password(), None);
    }

    #[test]
    fn test_config_from_url_with_timeout() {
        let config = SurrealConfig::from_url("ws://localhost:8000/rpc?connect_timeout=3").unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert!(config.credentials().is_none());
        assert!(!config.rpc_url().as_str().contains("connect_timeout"));
    }

    #[test]
    fn test_config_invalid_scheme() {
        assert!(SurrealConfig::from_url("postgres://localhost/db").is_err());
        assert!(SurrealConfig::from_url("not a url").is_err());
    }

    #[test]
    fn test_builder_overrides_url() {
        let config = SurrealConfig::builder()
            .url("ws://root:root@localhost:8000/rpc")
            .username("admin")
            .password("hunter2")
            .request_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        assert_eq!(config.credentials(), Some(("admin", "hunter2")));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(SurrealConfig::builder().build().is_err());
    }

    #[test]
    fn test_from_env_source() {
        let env = MapEnvSource::new()
            .set("TENANTRY_DB_URL", "ws://localhost:8000/rpc")
            .set("TENANTRY_DB_USER", "root")
            .set("TENANTRY_DB_PASS", "root")
            .set("TENANTRY_CONNECT_TIMEOUT", "2");

        let config = SurrealConfig::from_env_source(&env).unwrap();
        assert_eq!(config.credentials(), Some(("root", "root")));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));

        assert!(SurrealConfig::from_env_source(&MapEnvSource::new()).is_err());
    }

    #[test]
    fn test_from_database_config() {
        let section = DatabaseConfig {
            url: Some("http://localhost:8000/rpc".into()),
            username: Some("root".into()),
            password: Some("root".into()),
            connect_timeout_secs: Some(4),
        };
        let config = SurrealConfig::from_database_config(&section).unwrap();
        assert_eq!(config.connect_timeout, Duration::from_secs(4));

        assert!(SurrealConfig::from_database_config(&DatabaseConfig::default()).is_err());
    }
}
