//! Service error types

use std::time::Duration;

/// Result type for collaborator calls
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Failures of the transformation service or the context lookup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// No reply within the deadline
    #[error("service call timed out after {0:?}")]
    Timeout(Duration),

    /// Connection or protocol failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("service returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Reply carried no content
    #[error("service returned an empty reply")]
    EmptyReply,

    /// Adapter misconfigured
    #[error("invalid service configuration: {0}")]
    InvalidConfig(String),

    /// Supporting-context lookup failed
    #[error("context lookup failed: {0}")]
    Lookup(String),
}

impl ServiceError {
    /// Create transport error
    #[inline]
    #[must_use]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create status error, keeping at most 500 characters of the body
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: body.chars().take(500).collect(),
        }
    }

    /// Create configuration error
    #[inline]
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether repeating the same request can succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) | Self::EmptyReply => true,
            Self::Status { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            Self::InvalidConfig(_) | Self::Lookup(_) => false,
        }
    }
}
