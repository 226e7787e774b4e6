//! Error types used throughout the workspace

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest response body kept on an [`SyncError::Http`] value.
pub const MAX_ERROR_BODY_CHARS: usize = 1000;

/// Main error type for CMDB sync
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SyncError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Data error: {0}")]
    Data(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Build an HTTP error, truncating the response body.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        let body: String = body.into();
        Self::Http { status, body: body.chars().take(MAX_ERROR_BODY_CHARS).collect() }
    }

    /// True for HTTP 429 style failures that deserve a backoff retry.
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// True for connection level failures.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Configuration faults are raised before any pass starts and are never
    /// recovered.
    pub const fn is_fatal_at_startup(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Response body attached to the error, if any.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Http { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

/// Result type alias for CMDB sync operations
pub type Result<T> = std::result::Result<T, SyncError>;
