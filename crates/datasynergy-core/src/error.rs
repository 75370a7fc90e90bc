//! Error taxonomy shared by every façade operation.
//!
//! Every variant carries a stable machine-readable [`code`](ServiceError::code)
//! which the HTTP layer copies into its error body and the CLI prints.

use serde::Serialize;
use thiserror::Error;

/// Convenience alias used throughout the core and façade crates.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Why a backing store could not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionFailure {
    /// The host did not answer (DNS, refused, routing).
    Unreachable,
    /// The host answered and rejected the credentials.
    AuthenticationRejected,
    /// The backend could not tell what went wrong.
    Other,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    /// Unknown data source id.
    #[error("data source not found: {0}")]
    NotFound(String),

    /// Missing or malformed required field.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Query text rejected before reaching a backend.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Network or authentication failure while reaching a backing store.
    #[error("connection failed: {message}")]
    Connection {
        failure: ConnectionFailure,
        message: String,
    },

    /// The AI backend refused the client-credential exchange.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The AI backend answered with a failure.
    #[error("backend error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Backend {
        status: Option<u16>,
        message: String,
    },

    /// A bounded stage ran out of time.
    #[error("timed out: {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn connection(failure: ConnectionFailure, message: impl Into<String>) -> Self {
        Self::Connection {
            failure,
            message: message.into(),
        }
    }

    pub fn backend(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::InvalidQuery(_) => "invalid_query",
            Self::Connection { .. } => "connection",
            Self::Authentication(_) => "authentication",
            Self::Backend { .. } => "backend",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal",
        }
    }

    /// The message without the variant prefix, for user-facing text.
    pub fn detail(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::Validation(m)
            | Self::InvalidQuery(m)
            | Self::Authentication(m)
            | Self::Timeout(m)
            | Self::Internal(m) => m,
            Self::Connection { message, .. } | Self::Backend { message, .. } => message,
        }
    }

    /// True for errors the caller can fix by changing its input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Validation(_) | Self::InvalidQuery(_)
        )
    }
}
