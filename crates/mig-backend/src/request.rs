//! Requests sent to the transformation service
//!
//! A request carries everything the service needs for one call; the
//! service keeps no state between calls.

use crate::context::ContextSnippet;
use mig_artifact::{SourceLanguage, StructuralDescriptor, TargetLanguage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the service is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestKind {
    /// Translate one fragment
    Translate {
        /// 0-based fragment index
        fragment_index: usize,
        /// Total number of fragments
        fragment_count: usize,
    },
    /// Describe the target architecture of a whole document
    DescribeStructure,
    /// Extend the descriptor with a newly translated fragment
    UpdateStructure {
        /// Fragment whose translation is being absorbed
        fragment_index: usize,
    },
    /// Final descriptor pass over the merged artifact
    FinalizeStructure,
    /// Formatting and syntax normalization of the merged artifact
    Normalize,
}

impl RequestKind {
    /// Whether the reply is expected to be a JSON object
    #[must_use]
    pub fn expects_json(self) -> bool {
        !matches!(self, Self::Normalize)
    }

    /// Stable label, also used as a metrics tag
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Translate { .. } => "translate",
            Self::DescribeStructure => "describe_structure",
            Self::UpdateStructure { .. } => "update_structure",
            Self::FinalizeStructure => "finalize_structure",
            Self::Normalize => "normalize",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Translate {
                fragment_index,
                fragment_count,
            } => write!(f, "translate {}/{}", fragment_index + 1, fragment_count),
            Self::UpdateStructure { fragment_index } => {
                write!(f, "update_structure after fragment {}", fragment_index + 1)
            }
            other => f.write_str(other.label()),
        }
    }
}

/// One call to the transformation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRequest {
    /// Operation
    pub kind: RequestKind,
    /// Source fragment, document sample, translated fragment or merged text
    pub text: String,
    /// Trailing translated output of earlier fragments
    #[serde(default)]
    pub rolling_context: String,
    /// Descriptor snapshot at the time of the call
    #[serde(default)]
    pub descriptor: Option<StructuralDescriptor>,
    /// Business rules supplied by the caller
    #[serde(default)]
    pub domain_requirements: String,
    /// Supporting documents found for this request
    #[serde(default)]
    pub supporting_context: Vec<ContextSnippet>,
    /// Legacy language
    #[serde(default)]
    pub source_language: SourceLanguage,
    /// Output language
    #[serde(default)]
    pub target_language: TargetLanguage,
}

impl TransformRequest {
    /// Request of `kind` over `text`
    #[must_use]
    pub fn new(kind: RequestKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            rolling_context: String::new(),
            descriptor: None,
            domain_requirements: String::new(),
            supporting_context: Vec::new(),
            source_language: SourceLanguage::default(),
            target_language: TargetLanguage::default(),
        }
    }

    /// Set rolling context
    #[inline]
    #[must_use]
    pub fn with_rolling_context(mut self, context: impl Into<String>) -> Self {
        self.rolling_context = context.into();
        self
    }

    /// Attach a descriptor snapshot
    #[inline]
    #[must_use]
    pub fn with_descriptor(mut self, descriptor: StructuralDescriptor) -> Self {
        self.descriptor = Some(descriptor);
        self
    }

    /// Set domain requirements
    #[inline]
    #[must_use]
    pub fn with_domain_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.domain_requirements = requirements.into();
        self
    }

    /// Attach supporting documents
    #[inline]
    #[must_use]
    pub fn with_supporting_context(mut self, snippets: Vec<ContextSnippet>) -> Self {
        self.supporting_context = snippets;
        self
    }

    /// Set source and target languages
    #[inline]
    #[must_use]
    pub fn with_languages(mut self, source: SourceLanguage, target: TargetLanguage) -> Self {
        self.source_language = source;
        self.target_language = target;
        self
    }

    /// Fragment index for per-fragment requests
    #[must_use]
    pub fn fragment_index(&self) -> Option<usize> {
        match self.kind {
            RequestKind::Translate { fragment_index, .. }
            | RequestKind::UpdateStructure { fragment_index } => Some(fragment_index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_is_one_based() {
        let kind = RequestKind::Translate {
            fragment_index: 1,
            fragment_count: 3,
        };
        assert_eq!(kind.to_string(), "translate 2/3");
        assert!(kind.expects_json());
        assert!(!RequestKind::Normalize.expects_json());
    }

    #[test]
    fn builder_sets_fields() {
        let request = TransformRequest::new(RequestKind::DescribeStructure, "PROGRAM-ID. X.")
            .with_domain_requirements("keep rounding rules")
            .with_descriptor(StructuralDescriptor::empty("X"));
        assert_eq!(request.domain_requirements, "keep rounding rules");
        assert_eq!(request.fragment_index(), None);
        assert!(request.descriptor.is_some());
    }

    #[test]
    fn request_serializes_with_tagged_kind() {
        let request = TransformRequest::new(RequestKind::UpdateStructure { fragment_index: 4 }, "x");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["kind"]["kind"], "update_structure");
        assert_eq!(json["kind"]["fragment_index"], 4);
    }
}
