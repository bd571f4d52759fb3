//! Error types for the conversion pipeline
//!
//! Only two conditions end a conversion without an artifact: a blank
//! document and a run where no fragment was translated. Everything else is
//! recorded as an [`Issue`](mig_artifact::Issue) and the run continues.

use mig_artifact::Issue;
use mig_chunker::ChunkerError;
use mig_composition::MergeError;
use std::path::PathBuf;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Fatal pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Document has no non-whitespace content
    #[error("empty document")]
    EmptyDocument,

    /// Every fragment failed; the per-fragment issues explain why
    #[error("none of {fragments} fragments was translated")]
    NoFragmentTranslated {
        /// Number of fragments attempted
        fragments: usize,
        /// Issues collected before giving up
        issues: Vec<Issue>,
    },

    /// Cancelled between fragments; persisted progress is kept
    #[error("conversion cancelled after {completed} fragments")]
    Cancelled {
        /// Fragments finished before the cancellation was observed
        completed: usize,
    },

    /// A conversion with this identifier is already in progress
    #[error("conversion {0} is already running")]
    AlreadyRunning(String),

    /// Chunking failed
    #[error("chunking failed: {0}")]
    Chunker(#[from] ChunkerError),

    /// Merge failed
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    /// Persisted state could not be read or written
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Create configuration error
    #[inline]
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether running the same conversion again can succeed
    ///
    /// A cancelled or store-failed run resumes from persisted state; a run
    /// where every fragment failed may succeed once the service recovers.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cancelled { .. }
            | Self::Store(_)
            | Self::NoFragmentTranslated { .. }
            | Self::AlreadyRunning(_) => true,
            Self::EmptyDocument | Self::Chunker(_) | Self::Merge(_) | Self::Config(_) => false,
        }
    }
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("io error at {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Record could not be encoded or decoded
    #[error("malformed record {path}: {source}")]
    Serde {
        /// Record file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Create io error
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create serialization error
    #[must_use]
    pub fn serde(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serde {
            path: path.into(),
            source,
        }
    }
}
