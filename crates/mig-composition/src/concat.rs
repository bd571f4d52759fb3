//! Concatenation merge for targets without a structural model

use crate::strategy::{check_inputs, merge_notes, MergeError, MergeOutcome, MergeStrategy};
use mig_artifact::{FragmentResult, StructuralDescriptor};

/// Joins translated fragments in order under a numbered separator
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatenationMerge;

impl ConcatenationMerge {
    /// New concatenation merge
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl MergeStrategy for ConcatenationMerge {
    fn merge(
        &self,
        results: &[FragmentResult],
        _descriptor: &StructuralDescriptor,
    ) -> Result<MergeOutcome, MergeError> {
        check_inputs(results)?;
        let mut text = results
            .iter()
            .filter(|r| !r.translated_text.trim().is_empty())
            .map(|r| {
                format!(
                    "// ----- Fragment {} -----\n{}",
                    r.fragment_index + 1,
                    r.translated_text.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        text.push('\n');
        tracing::info!("concatenated {} fragments ({} chars)", results.len(), text.len());
        Ok(MergeOutcome {
            text,
            artifact: None,
            issues: Vec::new(),
            notes: merge_notes(results),
            uses_storage: results.iter().any(|r| r.uses_storage),
        })
    }

    fn name(&self) -> &'static str {
        "concatenation"
    }
}
