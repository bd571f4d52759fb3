//! Syntactic boundary detection per source language

use mig_artifact::SourceLanguage;
use once_cell::sync::Lazy;
use regex::Regex;

static COBOL_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*[A-Z0-9-]+\s+SECTION\.").expect("valid regex"));
static COBOL_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*[A-Z0-9-]+\s*\.").expect("valid regex"));
static BLANK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*$").expect("valid regex"));

const COBOL_MARKERS: &[&str] = &[" PROCEDURE DIVISION", " WORKING-STORAGE SECTION"];

/// Decides whether a line starts a new syntactic unit
#[derive(Debug, Clone, Copy)]
pub struct BoundaryRules {
    language: SourceLanguage,
}

impl BoundaryRules {
    /// Rules for `language`
    #[inline]
    #[must_use]
    pub const fn for_language(language: SourceLanguage) -> Self {
        Self { language }
    }

    /// True when `line` opens a section, paragraph or division
    #[must_use]
    pub fn is_boundary(&self, line: &str) -> bool {
        match self.language {
            SourceLanguage::Cobol => {
                if is_cobol_comment(line) {
                    return false;
                }
                if COBOL_SECTION.is_match(line) || COBOL_PARAGRAPH.is_match(line) {
                    return true;
                }
                let upper = line.to_ascii_uppercase();
                COBOL_MARKERS.iter().any(|m| upper.contains(m))
            }
            SourceLanguage::Generic => BLANK.is_match(line),
        }
    }
}

/// Fixed-format indicator `*` or `/` in column 7, or a free-format `*>` comment
fn is_cobol_comment(line: &str) -> bool {
    matches!(line.as_bytes().get(6), Some(b'*' | b'/')) || line.trim_start().starts_with("*>")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cobol() -> BoundaryRules {
        BoundaryRules::for_language(SourceLanguage::Cobol)
    }

    #[test]
    fn cobol_sections_and_paragraphs() {
        assert!(cobol().is_boundary("       WORKING-STORAGE SECTION."));
        assert!(cobol().is_boundary("       MAIN-PROCEDURE."));
        assert!(cobol().is_boundary("       1000-INIT."));
        assert!(cobol().is_boundary("       PROCEDURE DIVISION USING LS-REC."));
    }

    #[test]
    fn cobol_statements_are_not_boundaries() {
        assert!(!cobol().is_boundary("           MOVE WS-A TO WS-B."));
        assert!(!cobol().is_boundary("           DISPLAY 'HELLO'."));
        assert!(!cobol().is_boundary(""));
    }

    #[test]
    fn cobol_comments_are_ignored() {
        assert!(!cobol().is_boundary("      * MAIN-PROCEDURE."));
        assert!(!cobol().is_boundary("      *> 2000-LOOP."));
    }

    #[test]
    fn generic_uses_blank_lines() {
        let rules = BoundaryRules::for_language(SourceLanguage::Generic);
        assert!(rules.is_boundary("   "));
        assert!(!rules.is_boundary("x = 1"));
    }
}
