//! Merge strategy trait and core types
//!
//! Provides the [`MergeStrategy`] trait for turning ordered fragment
//! results into one artifact text.

use crate::artifact::MergedArtifact;
use mig_artifact::{FragmentResult, Issue, StructuralDescriptor};
use std::fmt;

/// Merge of ordered fragment results
///
/// Implementations must be deterministic: the same results and descriptor
/// always yield byte-identical text.
pub trait MergeStrategy: Send + Sync + fmt::Debug {
    /// Merge `results`, which are ordered by fragment index
    ///
    /// # Errors
    /// [`MergeError`] when there is nothing to merge
    fn merge(
        &self,
        results: &[FragmentResult],
        descriptor: &StructuralDescriptor,
    ) -> Result<MergeOutcome, MergeError>;

    /// Strategy name (for logging)
    fn name(&self) -> &'static str;
}

/// Merged text plus what the merge had to decide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Rendered artifact
    pub text: String,
    /// Structured view, when the strategy builds one
    pub artifact: Option<MergedArtifact>,
    /// Collisions and other decisions worth reporting
    pub issues: Vec<Issue>,
    /// Combined fragment notes
    pub notes: String,
    /// Whether any fragment touches persistent storage
    pub uses_storage: bool,
}

/// Merge errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// No results were supplied
    #[error("no fragment results to merge")]
    NoResults,

    /// Every supplied result is a placeholder
    #[error("none of {0} fragments was translated")]
    NothingTranslated(usize),
}

/// Reject inputs no strategy can merge
pub(crate) fn check_inputs(results: &[FragmentResult]) -> Result<(), MergeError> {
    if results.is_empty() {
        return Err(MergeError::NoResults);
    }
    if results.iter().all(|r| r.failed) {
        return Err(MergeError::NothingTranslated(results.len()));
    }
    Ok(())
}

/// Summary line followed by the notes of each fragment
#[must_use]
pub fn merge_notes(results: &[FragmentResult]) -> String {
    let mut notes = vec![format!(
        "Processed {} fragments and merged into a single codebase",
        results.len()
    )];
    notes.extend(
        results
            .iter()
            .filter(|r| !r.notes.trim().is_empty())
            .map(|r| format!("Fragment {}: {}", r.fragment_index + 1, r.notes.trim())),
    );
    notes.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_are_numbered_from_one() {
        let results = vec![
            FragmentResult::translated(0, "a").with_notes("first"),
            FragmentResult::translated(1, "b"),
            FragmentResult::translated(2, "c").with_notes("third"),
        ];
        let notes = merge_notes(&results);
        assert!(notes.starts_with("Processed 3 fragments"));
        assert!(notes.contains("Fragment 1: first"));
        assert!(notes.contains("Fragment 3: third"));
        assert!(!notes.contains("Fragment 2:"));
    }

    #[test]
    fn all_placeholders_cannot_merge() {
        let results = vec![FragmentResult::placeholder(0, "timeout")];
        assert_eq!(check_inputs(&results), Err(MergeError::NothingTranslated(1)));
        assert_eq!(check_inputs(&[]), Err(MergeError::NoResults));
    }
}
