//! `${VAR}` expansion for configuration values.

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use super::{ConfigError, ConfigResult};

/// Where variable values come from.
pub trait EnvSource: Send + Sync {
    /// Look up a variable.
    fn get(&self, name: &str) -> Option<String>;

    /// Check if a variable is set.
    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed set of variables, mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct MapEnvSource {
    vars: HashMap<String, String>,
}

impl MapEnvSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvSource for MapEnvSource {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

impl<S: EnvSource + ?Sized> EnvSource for &S {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }
}

/// Expands variable references inside a string.
///
/// Supported forms:
/// - `${VAR}` fails when `VAR` is unset
/// - `${VAR:-default}` falls back to `default` when `VAR` is unset or empty
/// - `${VAR:?message}` fails with `message` when `VAR` is unset or empty
/// - `$VAR` fails when `VAR` is unset
///
/// A `$` not followed by a name is kept as is.
#[derive(Debug, Clone)]
pub struct EnvExpander<S: EnvSource = StdEnvSource> {
    source: S,
}

impl EnvExpander<StdEnvSource> {
    /// Expand against the process environment.
    pub fn new() -> Self {
        Self {
            source: StdEnvSource,
        }
    }
}

impl Default for EnvExpander<StdEnvSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EnvSource> EnvExpander<S> {
    /// Expand against a custom source.
    pub fn with_source(source: S) -> Self {
        Self { source }
    }

    /// Expand every reference in `input`.
    ///
    /// ```rust
    /// use tenantry_core::config::{EnvExpander, MapEnvSource};
    ///
    /// let env = MapEnvSource::new().set("DB_HOST", "db.internal");
    /// let expander = EnvExpander::with_source(env);
    /// assert_eq!(
    ///     expander.expand("ws://${DB_HOST}:8000/rpc").unwrap(),
    ///     "ws://db.internal:8000/rpc"
    /// );
    /// ```
    pub fn expand(&self, input: &str) -> ConfigResult<String> {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }

            match chars.peek() {
                Some('{') => {
                    chars.next();
                    result.push_str(&self.expand_braced(&mut chars)?);
                }
                Some(next) if next.is_alphabetic() || *next == '_' => {
                    result.push_str(&self.expand_bare(&mut chars)?);
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }

    fn expand_braced(&self, chars: &mut Peekable<Chars<'_>>) -> ConfigResult<String> {
        let mut name = String::new();
        let mut modifier = None;
        let mut argument = String::new();
        let mut closed = false;

        for c in chars.by_ref() {
            match c {
                '}' => {
                    closed = true;
                    break;
                }
                ':' if modifier.is_none() && argument.is_empty() => modifier = Some(None),
                c if modifier == Some(None) => modifier = Some(Some(c)),
                c if modifier.is_some() => argument.push(c),
                c => name.push(c),
            }
        }

        if !closed {
            return Err(ConfigError::InvalidVariable {
                name,
                message: "missing closing '}'".to_string(),
            });
        }
        if name.is_empty() {
            return Err(ConfigError::InvalidVariable {
                name,
                message: "empty variable name".to_string(),
            });
        }

        match self.source.get(&name) {
            Some(value) if !value.is_empty() => Ok(value),
            value => match modifier.flatten() {
                Some('-') => Ok(argument),
                Some('?') => Err(ConfigError::InvalidVariable {
                    message: if argument.is_empty() {
                        format!("required variable '{}' is not set", name)
                    } else {
                        argument
                    },
                    name,
                }),
                _ => value.ok_or(ConfigError::MissingVariable(name)),
            },
        }
    }

    fn expand_bare(&self, chars: &mut Peekable<Chars<'_>>) -> ConfigResult<String> {
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                chars.next();
            } else {
                break;
            }
        }

        self.source
            .get(&name)
            .ok_or(ConfigError::MissingVariable(name))
    }

    /// Check if a string contains variable references.
    pub fn has_variables(input: &str) -> bool {
        input.contains('$')
    }
}
