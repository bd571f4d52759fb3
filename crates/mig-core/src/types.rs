//! Core types for the pipeline
//!
//! - Conversion identifiers
//! - Conversion requests and their outcome

use mig_artifact::{Issue, SourceLanguage, StructuralDescriptor, TargetLanguage};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ulid::Ulid;

/// Unique conversion identifier (ULID for sortability)
///
/// Persisted state lives under this identifier; converting again with the
/// same id resumes where the previous run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConversionId(pub Ulid);

impl ConversionId {
    /// Generate new conversion ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ConversionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConversionId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// One document to convert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Identifier; reuse it to resume
    pub id: ConversionId,
    /// Legacy source text
    pub document: String,
    /// Business rules forwarded with every translation request
    #[serde(default)]
    pub domain_requirements: String,
    /// Output language; the pipeline default when unset
    #[serde(default)]
    pub target: Option<TargetLanguage>,
    /// Legacy language; configured or detected when unset
    #[serde(default)]
    pub source: Option<SourceLanguage>,
}

impl ConversionRequest {
    /// Request with a fresh identifier
    #[must_use]
    pub fn new(document: impl Into<String>, domain_requirements: impl Into<String>) -> Self {
        Self {
            id: ConversionId::new(),
            document: document.into(),
            domain_requirements: domain_requirements.into(),
            target: None,
            source: None,
        }
    }

    /// Use an existing identifier (resume)
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: ConversionId) -> Self {
        self.id = id;
        self
    }

    /// Override the output language
    #[inline]
    #[must_use]
    pub fn with_target(mut self, target: TargetLanguage) -> Self {
        self.target = Some(target);
        self
    }

    /// Override the legacy language
    #[inline]
    #[must_use]
    pub fn with_source(mut self, source: SourceLanguage) -> Self {
        self.source = Some(source);
        self
    }
}

/// Result of a conversion that produced an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutcome {
    pub id: ConversionId,
    /// Final artifact text
    pub merged_text: String,
    /// Final descriptor version
    pub descriptor: StructuralDescriptor,
    /// Every non-fatal issue, in the order raised
    pub issues: Vec<Issue>,
    /// Merge notes
    pub notes: String,
    /// Whether the converted code touches persistent storage
    pub uses_storage: bool,
    /// Fragments the document was split into
    pub fragment_count: usize,
    /// Fragments replaced by a placeholder
    pub failed_fragments: Vec<usize>,
    /// Fragments taken from persisted state instead of the service
    pub resumed_fragments: usize,
}

impl ConversionOutcome {
    /// Whether every fragment was translated
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_fragments.is_empty()
    }
}
