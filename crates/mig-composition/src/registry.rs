//! Merge strategy selection
//!
//! Provides [`MergeRegistry`] for picking the merge strategy of a target.

use crate::concat::ConcatenationMerge;
use crate::strategy::MergeStrategy;
use crate::structural::StructuralMerge;
use mig_artifact::TargetLanguage;
use std::sync::Arc;

/// Registry of merge strategies keyed by target
#[derive(Debug, Default, Clone)]
pub struct MergeRegistry {
    force_concatenation: bool,
}

impl MergeRegistry {
    /// Registry with the built-in selection rules
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Always concatenate, even for object-oriented targets
    #[inline]
    #[must_use]
    pub fn with_forced_concatenation(mut self, force: bool) -> Self {
        self.force_concatenation = force;
        self
    }

    /// Strategy name for `target`
    ///
    /// # Selection Logic
    /// - `csharp`/`java` → `structural`
    /// - anything else → `concatenation`
    #[must_use]
    pub fn select_name(&self, target: &TargetLanguage) -> &'static str {
        if target.is_object_oriented() && !self.force_concatenation {
            "structural"
        } else {
            "concatenation"
        }
    }

    /// Strategy for `target`
    #[must_use]
    pub fn select(&self, target: &TargetLanguage) -> Arc<dyn MergeStrategy> {
        match self.select_name(target) {
            "structural" => Arc::new(StructuralMerge::new(target.clone())),
            _ => Arc::new(ConcatenationMerge::new()),
        }
    }
}
