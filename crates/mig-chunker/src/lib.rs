//! Boundary-aware chunking of legacy source documents
//!
//! Splits a document too large for one transformation request into ordered
//! fragments, closing each at a syntactic boundary (COBOL sections,
//! paragraphs and divisions) where possible and at the size limit otherwise.
//! The tail of each fragment is carried into the next as overlap so the
//! transformation service sees some preceding context.
//!
//! # Example
//!
//! ```rust
//! use mig_chunker::{Chunker, ChunkerConfig};
//!
//! let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
//! let fragments = chunker
//!     .chunk_text("       PROCEDURE DIVISION.\n       MAIN-PARA.\n           STOP RUN.\n")
//!     .unwrap();
//! assert_eq!(fragments.len(), 1);
//! ```

#![warn(unreachable_pub)]

mod boundary;
mod chunker;
mod config;
mod error;

pub use boundary::BoundaryRules;
pub use chunker::Chunker;
pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
