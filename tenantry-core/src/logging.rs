//! Logging setup for Tenantry processes.
//!
//! Library code only emits `tracing` events. A binary calls [`init`] once to
//! install a subscriber (requires the `tracing-subscriber` feature).
//!
//! # Environment Variables
//!
//! - `TENANTRY_DEBUG=true|1|yes` - log at debug level
//! - `TENANTRY_LOG_LEVEL=trace|debug|info|warn|error` - explicit level
//! - `TENANTRY_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! When neither `TENANTRY_DEBUG` nor `TENANTRY_LOG_LEVEL` is set, [`init`]
//! installs nothing.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line, human oriented.
    Pretty,
    /// Single line, human oriented.
    Compact,
}

impl LogFormat {
    /// Parse a format name. Unknown or missing names give [`LogFormat::Json`].
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_lowercase).as_deref() {
            Some("pretty") => Self::Pretty,
            Some("compact") => Self::Compact,
            _ => Self::Json,
        }
    }

    /// Format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        }
    }
}

fn truthy(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

/// Resolve the level from raw `TENANTRY_LOG_LEVEL` and `TENANTRY_DEBUG` values.
///
/// An unrecognized level falls back to the debug switch: `debug` when on,
/// `warn` otherwise.
pub fn resolve_level(level: Option<&str>, debug: Option<&str>) -> &'static str {
    match level.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ if truthy(debug) => "debug",
        _ => "warn",
    }
}

/// Check whether `TENANTRY_DEBUG` is on.
#[inline]
pub fn is_debug_enabled() -> bool {
    truthy(env::var("TENANTRY_DEBUG").ok().as_deref())
}

/// The level selected by the environment.
pub fn get_log_level() -> &'static str {
    resolve_level(
        env::var("TENANTRY_LOG_LEVEL").ok().as_deref(),
        env::var("TENANTRY_DEBUG").ok().as_deref(),
    )
}

/// The format selected by the environment.
pub fn get_log_format() -> LogFormat {
    LogFormat::parse(env::var("TENANTRY_LOG_FORMAT").ok().as_deref())
}

/// Install the global subscriber. Later calls do nothing.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("TENANTRY_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let format = get_log_format();
            let filter = EnvFilter::try_new(format!(
                "tenantry={level},tenantry_core={level},tenantry_surreal={level},\
                 tenantry_provision={level},tenantry_cli={level}"
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let layer = fmt::layer().with_writer(std::io::stderr);
            let installed = match format {
                LogFormat::Json => registry.with(layer.json()).try_init(),
                LogFormat::Compact => registry.with(layer.compact()).try_init(),
                LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level, format = format.as_str(), "Tenantry logging initialized");
            }
        }
    });
}
