//! MIG Artifact Model
//!
//! Values passed between the stages of a modernization run.
//!
//! # Core Concepts
//!
//! - [`SourceDocument`]: immutable legacy source, line oriented
//! - [`Fragment`]: overlap-bearing slice of a document
//! - [`StructuralDescriptor`]: versioned description of the target architecture
//! - [`FragmentResult`]: decoded outcome of one fragment transformation
//! - [`Issue`]: non-fatal problem reported alongside the final artifact
//! - [`ContentHash`]: Blake3 fingerprint of fragment text
//!
//! # Example
//!
//! ```rust
//! use mig_artifact::{StructuralDescriptor, TypeDescriptor, TypeKind};
//!
//! let base = StructuralDescriptor::empty("Payroll");
//! let seen = StructuralDescriptor::empty("Payroll")
//!     .with_type(TypeDescriptor::named("Employee", TypeKind::Class));
//! let next = base.absorb(&seen);
//! assert!(next.is_superset_of(&base));
//! assert_eq!(next.version, 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod descriptor;
mod document;
mod hash;
mod language;
mod result;

pub use descriptor::{
    FieldDescriptor, MethodDescriptor, ParameterDescriptor, StructuralDescriptor, TypeDescriptor,
    TypeKind, DEFAULT_ARTIFACT_NAME,
};
pub use document::{BoundaryKind, Fragment, SourceDocument};
pub use hash::{ContentHash, HashError};
pub use language::{SourceLanguage, TargetLanguage};
pub use result::{FragmentResult, Issue, IssueKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
