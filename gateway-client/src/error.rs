//! Error types for gateway operations.
//!
//! Every failure the client can observe is classified into one of a small
//! set of kinds so callers can match on them instead of parsing messages.
//! The classification also drives the retry policy and the circuit breaker.

use std::time::Duration;
use serde::Serialize;
use thiserror::Error;

/// Maximum number of bytes of a remote error body kept in [`GatewayError::Http`].
pub const MAX_ERROR_BODY_BYTES: usize = 512;

/// Error raised by gateway operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Network-level failure (DNS, connection refused, reset, TLS)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote call did not complete within its time bound
    #[error("Operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The gateway answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// Truncated response body
        body: String,
    },

    /// The response was not the JSON or JSON-RPC shape we expected
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The gateway answered with a JSON-RPC error or the tool reported failure
    #[error("Remote call failed: {0}")]
    Rpc(String),

    /// The circuit breaker rejected the call before any network attempt
    #[error("Circuit breaker open for {gateway}")]
    CircuitOpen {
        /// Gateway the circuit protects
        gateway: String,
    },

    /// The request was rejected locally before it reached the network
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The client could not be configured or built
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Discriminant of [`GatewayError`], suitable for metrics labels and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// See [`GatewayError::Transport`]
    Transport,
    /// See [`GatewayError::Timeout`]
    Timeout,
    /// See [`GatewayError::Http`]
    Http,
    /// See [`GatewayError::Protocol`]
    Protocol,
    /// See [`GatewayError::Rpc`]
    Rpc,
    /// See [`GatewayError::CircuitOpen`]
    CircuitOpen,
    /// See [`GatewayError::InvalidRequest`]
    InvalidRequest,
    /// See [`GatewayError::Config`]
    Config,
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// Get the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Http { .. } => ErrorKind::Http,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Rpc(_) => ErrorKind::Rpc,
            Self::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Only transport failures and 5xx responses are transient. A 4xx means the
    /// request itself is wrong and a timeout has already used up its bound.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcp_gateway_client::GatewayError;
    ///
    /// assert!(GatewayError::transport("connection refused").is_retryable());
    /// assert!(GatewayError::http(503, "unavailable").is_retryable());
    /// assert!(!GatewayError::http(404, "no such tool").is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Check if this error counts as a failure against the circuit breaker.
    ///
    /// True when the gateway itself looks unhealthy: it could not be reached,
    /// it did not answer in time, or it answered with a 5xx.
    #[must_use]
    pub const fn trips_circuit(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Create a transport error with the given message.
    #[must_use]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an HTTP error, truncating the body.
    #[must_use]
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: truncate_body(body.into()),
        }
    }

    /// Create a protocol error with the given message.
    #[must_use]
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a remote call error with the given message.
    #[must_use]
    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    /// Create a circuit open error for the given gateway.
    #[must_use]
    pub fn circuit_open(gateway: impl Into<String>) -> Self {
        Self::CircuitOpen {
            gateway: gateway.into(),
        }
    }

    /// Create an invalid request error with the given message.
    #[must_use]
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a configuration error with the given message.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY_BYTES {
        let mut cut = MAX_ERROR_BODY_BYTES;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
