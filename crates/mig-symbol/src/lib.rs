//! MIG Symbol System
//!
//! Structural view of generated object-oriented source.
//!
//! # Overview
//!
//! - **tokenize**: translated text → ordered [`StructuralEvent`] stream
//! - **MethodSignature**: `name(paramType,...)` identity used for deduplication
//! - **DelimiterBalance**: brace accounting that ignores literals and comments
//!
//! # Example
//!
//! ```rust
//! use mig_symbol::{tokenize, StructuralEvent};
//!
//! let events = tokenize("public class Ledger { public void Post(decimal amount) { } }");
//! assert!(matches!(events[0], StructuralEvent::TypeOpen { .. }));
//! assert!(matches!(events[1], StructuralEvent::Method { .. }));
//! ```

#![warn(missing_docs)]

pub mod lexer;
pub mod signature;
pub mod tokenizer;

// Re-exports
pub use lexer::{mask_non_code, DelimiterBalance};
pub use signature::MethodSignature;
pub use tokenizer::{tokenize, StructuralEvent};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for structural scanning
    pub use crate::{tokenize, DelimiterBalance, MethodSignature, StructuralEvent};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
