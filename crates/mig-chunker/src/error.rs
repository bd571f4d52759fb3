use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur while splitting a document
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// Document has no non-whitespace content
    #[error("empty document")]
    EmptyContent,

    /// Invalid configuration
    #[error("invalid chunker configuration: {0}")]
    InvalidConfig(String),
}

impl ChunkerError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
