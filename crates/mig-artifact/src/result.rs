//! Per-fragment results and non-fatal issues

use serde::{Deserialize, Serialize};
use std::fmt;

/// Class of a non-fatal problem surfaced with the merged artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Service call timed out or failed in transport, retries exhausted
    TransportFailure,
    /// Reply could not be decoded by any strategy
    DecodeFailure,
    /// Reply was cut short and partially salvaged
    ResponseTruncated,
    /// Structural descriptor update failed; previous version kept
    DescriptorUpdate,
    /// Problem reported by the transformation service itself
    ServiceReported,
    /// Same method signature produced twice; longer body kept
    MergeCollision,
    /// Opening and closing delimiters do not match
    UnbalancedDelimiters,
    /// Error-guarded block without a handler
    IncompleteErrorHandling,
    /// Error handler with an empty body
    EmptyErrorHandler,
    /// Normalization pass failed or was rejected
    RepairRejected,
    /// Supporting-context lookup failed
    ContextLookup,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TransportFailure => "transport failure",
            Self::DecodeFailure => "decode failure",
            Self::ResponseTruncated => "response truncated",
            Self::DescriptorUpdate => "descriptor update",
            Self::ServiceReported => "service reported",
            Self::MergeCollision => "merge collision",
            Self::UnbalancedDelimiters => "unbalanced delimiters",
            Self::IncompleteErrorHandling => "incomplete error handling",
            Self::EmptyErrorHandler => "empty error handler",
            Self::RepairRejected => "repair rejected",
            Self::ContextLookup => "context lookup",
        };
        f.write_str(label)
    }
}

/// Non-fatal issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    /// Fragment the issue belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<usize>,
    pub detail: String,
}

impl Issue {
    /// Issue not tied to a fragment
    #[inline]
    #[must_use]
    pub fn new(kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            fragment: None,
            detail: detail.into(),
        }
    }

    /// Issue raised while handling fragment `index`
    #[inline]
    #[must_use]
    pub fn for_fragment(kind: IssueKind, index: usize, detail: impl Into<String>) -> Self {
        Self {
            kind,
            fragment: Some(index),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fragment {
            Some(index) => write!(f, "Fragment {}: [{}] {}", index + 1, self.kind, self.detail),
            None => write!(f, "[{}] {}", self.kind, self.detail),
        }
    }
}

/// Outcome of transforming one fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentResult {
    pub fragment_index: usize,
    pub translated_text: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub uses_storage: bool,
    /// Placeholder standing in for a fragment that could not be translated
    #[serde(default)]
    pub failed: bool,
}

impl FragmentResult {
    /// Successful result with no notes
    #[must_use]
    pub fn translated(fragment_index: usize, text: impl Into<String>) -> Self {
        Self {
            fragment_index,
            translated_text: text.into(),
            notes: String::new(),
            issues: Vec::new(),
            uses_storage: false,
            failed: false,
        }
    }

    /// Placeholder comment for a failed fragment
    #[must_use]
    pub fn placeholder(fragment_index: usize, reason: &str) -> Self {
        let reason = reason.lines().next().unwrap_or_default();
        Self {
            fragment_index,
            translated_text: format!(
                "// [fragment {} could not be converted: {reason}]",
                fragment_index + 1
            ),
            notes: String::new(),
            issues: vec![reason.to_string()],
            uses_storage: false,
            failed: true,
        }
    }

    /// Set notes
    #[inline]
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Add an issue line
    #[inline]
    #[must_use]
    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }

    /// Set the storage flag
    #[inline]
    #[must_use]
    pub fn with_storage(mut self, uses_storage: bool) -> Self {
        self.uses_storage = uses_storage;
        self
    }
}
