//! Source documents and the fragments cut from them

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

/// Immutable legacy source document
///
/// Lines are stored without their terminators. Cloning is cheap; the line
/// buffer is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    lines: Arc<[String]>,
    len: usize,
}

impl SourceDocument {
    /// Build a document from raw text
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let len = text.len();
        Self {
            lines: lines.into(),
            len,
        }
    }

    /// Build a document from already-split lines
    #[must_use]
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        let len = lines.iter().map(|l| l.len() + 1).sum::<usize>().saturating_sub(1);
        Self {
            lines: lines.into(),
            len,
        }
    }

    /// All lines in order
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of lines
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the document has no content
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when the document has no non-whitespace content
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// Joined text of a line range
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> String {
        self.lines[range].join("\n")
    }

    /// Full text
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Program name from a COBOL `PROGRAM-ID.` paragraph, if present
    #[must_use]
    pub fn program_id(&self) -> Option<String> {
        self.lines.iter().find_map(|line| {
            let upper = line.to_ascii_uppercase();
            let at = upper.find("PROGRAM-ID.")?;
            let rest = line[at + "PROGRAM-ID.".len()..].trim();
            let name: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect();
            (!name.is_empty()).then_some(name)
        })
    }
}

/// Why a fragment was closed where it was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryKind {
    /// A syntactic boundary line ended the fragment
    Pattern,
    /// The size limit was reached with no boundary in sight
    SizeLimit,
    /// Document ended
    EndOfDocument,
}

/// Contiguous slice of a [`SourceDocument`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// 0-based position in the fragment sequence
    pub index: usize,
    /// First line (inclusive) in the document
    pub start_line: usize,
    /// Last line (exclusive) in the document
    pub end_line: usize,
    /// Number of leading lines carried over from the previous fragment
    pub overlap_lines: usize,
    /// What closed this fragment
    pub boundary: BoundaryKind,
    /// Raw text, lines joined with `\n`
    pub text: String,
    /// Fingerprint of `text`
    pub hash: ContentHash,
}

impl Fragment {
    /// Build a fragment over `range` of `document`
    #[must_use]
    pub fn new(
        document: &SourceDocument,
        index: usize,
        range: Range<usize>,
        overlap_lines: usize,
        boundary: BoundaryKind,
    ) -> Self {
        let text = document.slice(range.clone());
        let hash = ContentHash::of_text(&text);
        Self {
            index,
            start_line: range.start,
            end_line: range.end,
            overlap_lines,
            boundary,
            text,
            hash,
        }
    }

    /// Line range covered by this fragment
    #[inline]
    #[must_use]
    pub fn lines(&self) -> Range<usize> {
        self.start_line..self.end_line
    }

    /// Size as counted by the chunker: bytes plus one per line
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.text.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_counts_lines() {
        let doc = SourceDocument::from_text("A.\nB.\nC.");
        assert_eq!(doc.line_count(), 3);
        assert_eq!(doc.len(), 8);
        assert_eq!(doc.slice(1..3), "B.\nC.");
    }

    #[test]
    fn blank_document() {
        assert!(SourceDocument::from_text("").is_empty());
        assert!(SourceDocument::from_text("   \n\t\n").is_blank());
        assert!(!SourceDocument::from_text("  X\n").is_blank());
    }

    #[test]
    fn program_id_extraction() {
        let doc = SourceDocument::from_text(
            "       IDENTIFICATION DIVISION.\n       PROGRAM-ID. CUST-LEDGER.\n",
        );
        assert_eq!(doc.program_id().as_deref(), Some("CUST-LEDGER"));
        assert_eq!(SourceDocument::from_text("nothing here").program_id(), None);
    }

    #[test]
    fn fragment_hash_follows_text() {
        let doc = SourceDocument::from_lines(["A.", "B.", "C."]);
        let frag = Fragment::new(&doc, 0, 0..2, 0, BoundaryKind::Pattern);
        assert_eq!(frag.text, "A.\nB.");
        assert_eq!(frag.hash, ContentHash::of_text("A.\nB."));
        assert_eq!(frag.lines(), 0..2);
    }
}
