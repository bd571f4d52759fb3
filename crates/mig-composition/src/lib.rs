//! MIG Composition
//!
//! Assembles per-fragment translations into a single artifact.
//!
//! # Core Concepts
//!
//! - [`MergeStrategy`]: core trait for turning ordered results into text
//! - [`StructuralMerge`]: typed-event merge with signature deduplication
//! - [`ConcatenationMerge`]: ordered concatenation for non object-oriented targets
//! - [`MergeRegistry`]: picks the strategy for a target language
//! - [`consistency`]: delimiter and error-handler checks with mechanical fixes
//!
//! # Example
//!
//! ```rust
//! use mig_artifact::{FragmentResult, StructuralDescriptor, TargetLanguage};
//! use mig_composition::MergeRegistry;
//!
//! let results = vec![
//!     FragmentResult::translated(0, "class Ledger { void Post(int a) { } }"),
//!     FragmentResult::translated(1, "class Ledger { void Post(int b) { Save(b); } }"),
//! ];
//! let strategy = MergeRegistry::new().select(&TargetLanguage::CSharp);
//! let outcome = strategy.merge(&results, &StructuralDescriptor::default()).unwrap();
//! assert_eq!(outcome.text.matches("Post(").count(), 1);
//! assert!(outcome.text.contains("Save(b)"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod artifact;
mod concat;
pub mod consistency;
mod registry;
mod strategy;
mod structural;

// Re-exports
pub use artifact::{
    dedent, Member, MergedArtifact, TypeBody, CONSTANTS_HEADER, FIELDS_HEADER, FUNCTIONS_HEADER,
    IMPORTS_HEADER, RESIDUAL_HEADER,
};
pub use concat::ConcatenationMerge;
pub use consistency::{apply_mechanical_fixes, check_fragment, validate};
pub use registry::MergeRegistry;
pub use strategy::{merge_notes, MergeError, MergeOutcome, MergeStrategy};
pub use structural::StructuralMerge;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
