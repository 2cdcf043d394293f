//! Error types for the store driver.

use tenantry_core::DriverError;
use thiserror::Error;

/// Result type for driver operations.
pub type SurrealResult<T> = Result<T, SurrealError>;

/// Errors raised while talking to the store.
#[derive(Error, Debug)]
pub enum SurrealError {
    /// The HTTP exchange failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The RPC call returned an error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Sign-in was rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A statement reported `ERR`.
    #[error("statement failed: {0}")]
    Statement(String),

    /// The response could not be understood.
    #[error("unexpected response: {0}")]
    Protocol(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The connection was closed.
    #[error("connection closed")]
    Closed,
}

impl SurrealError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Check if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

impl From<SurrealError> for DriverError {
    fn from(err: SurrealError) -> Self {
        match err {
            SurrealError::Http(e) => DriverError::Transport(e.to_string()),
            SurrealError::Status { status: 401 | 403, body } => DriverError::Authentication(body),
            SurrealError::Status { status, body } => {
                DriverError::Transport(format!("endpoint returned {}: {}", status, body))
            }
            SurrealError::Rpc { message, .. } => DriverError::Query(message),
            SurrealError::Authentication(msg) => DriverError::Authentication(msg),
            SurrealError::Statement(msg) => DriverError::Query(msg),
            SurrealError::Protocol(msg) => DriverError::Protocol(msg),
            SurrealError::Config(msg) => DriverError::Config(msg),
            SurrealError::Closed => DriverError::Closed,
        }
    }
}
