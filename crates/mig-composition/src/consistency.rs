//! Consistency checks on merged text
//!
//! - **Delimiter balance**: missing closing braces are appended, stray
//!   closers are only reported
//! - **Error handlers**: a `try` with neither `catch` nor `finally` is
//!   reported; an empty `catch` body gets a diagnostic log statement
//!
//! All scanning runs over [`mask_non_code`] so braces and keywords inside
//! literals and comments are ignored.

use mig_artifact::{Issue, IssueKind, TargetLanguage};
use mig_symbol::lexer::matching_brace;
use mig_symbol::{mask_non_code, DelimiterBalance};
use once_cell::sync::Lazy;
use regex::Regex;

static TRY_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\btry\b\s*(?:\([^{]*\))?\s*\{").expect("valid regex"));
static HANDLER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(catch|finally)\b").expect("valid regex"));
static CATCH_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bcatch\b\s*(?:\(([^()]*)\))?\s*(?:when\s*\([^{]*\)\s*)?\{").expect("valid regex"));

/// Issues in `text`, without changing it
#[must_use]
pub fn validate(text: &str) -> Vec<Issue> {
    let mut issues = Vec::new();
    let balance = DelimiterBalance::of(text);
    if balance.unclosed > 0 {
        issues.push(Issue::new(
            IssueKind::UnbalancedDelimiters,
            format!("{} opening braces are never closed", balance.unclosed),
        ));
    }
    if balance.unmatched_closers > 0 {
        issues.push(Issue::new(
            IssueKind::UnbalancedDelimiters,
            format!("{} closing braces have no opener", balance.unmatched_closers),
        ));
    }

    let mask = mask_non_code(text);
    let unguarded = unhandled_try_blocks(&mask);
    if unguarded > 0 {
        issues.push(Issue::new(
            IssueKind::IncompleteErrorHandling,
            format!("{unguarded} try blocks have neither catch nor finally"),
        ));
    }
    let empty = empty_catch_bodies(text, &mask).len();
    if empty > 0 {
        issues.push(Issue::new(
            IssueKind::EmptyErrorHandler,
            format!("{empty} catch blocks are empty"),
        ));
    }
    issues
}

/// Apply the fixes that are safe without understanding the code
///
/// Returns the fixed text with one issue per kind of change, followed by
/// the [`validate`] findings that remain in the fixed text.
#[must_use]
pub fn apply_mechanical_fixes(text: &str, target: &TargetLanguage) -> (String, Vec<Issue>) {
    let mut issues = Vec::new();
    let mask = mask_non_code(text);

    // Empty handlers first: the fill-in is balanced, so brace counts hold.
    let empty = empty_catch_bodies(text, &mask);
    let mut fixed = String::with_capacity(text.len());
    let mut cursor = 0;
    for handler in &empty {
        fixed.push_str(&text[cursor..handler.open + 1]);
        let indent = line_indent(text, handler.open);
        let statement = target.error_log_statement(handler.binding.as_deref());
        fixed.push_str(&format!("\n{indent}    {statement}\n{indent}}}"));
        cursor = handler.close + 1;
    }
    fixed.push_str(&text[cursor..]);
    if !empty.is_empty() {
        issues.push(Issue::new(
            IssueKind::EmptyErrorHandler,
            format!("added a logging statement to {} empty catch blocks", empty.len()),
        ));
    }

    let balance = DelimiterBalance::of(&fixed);
    if balance.unclosed > 0 {
        let trimmed = fixed.trim_end().len();
        fixed.truncate(trimmed);
        for _ in 0..balance.unclosed {
            fixed.push_str("\n}");
        }
        fixed.push('\n');
        issues.push(Issue::new(
            IssueKind::UnbalancedDelimiters,
            format!(
                "appended {} missing closing braces at the end of the artifact",
                balance.unclosed
            ),
        ));
    }
    // Whatever the fixes could not resolve is reported as found.
    issues.extend(validate(&fixed));

    (fixed, issues)
}

/// Per-fragment findings, worded for the fragment's issue list
#[must_use]
pub fn check_fragment(text: &str) -> Vec<String> {
    let mut findings = Vec::new();
    let mask = mask_non_code(text);
    let opens = mask.matches('{').count();
    let closes = mask.matches('}').count();
    if opens != closes {
        findings.push(format!("Mismatched braces: {opens} vs {closes}"));
    }
    let tries = TRY_OPEN.find_iter(&mask).count();
    let catches = CATCH_OPEN.find_iter(&mask).count();
    if tries > catches {
        findings.push(format!(
            "Incomplete exception handling: {tries} try vs {catches} catch"
        ));
    }
    findings
}

struct EmptyCatch {
    open: usize,
    close: usize,
    binding: Option<String>,
}

fn empty_catch_bodies(text: &str, mask: &str) -> Vec<EmptyCatch> {
    CATCH_OPEN
        .captures_iter(mask)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let open = whole.end() - 1;
            let close = matching_brace(mask.as_bytes(), open)?;
            if !text[open + 1..close].trim().is_empty() {
                return None;
            }
            let binding = caps.get(1).and_then(|p| catch_binding(p.as_str()));
            Some(EmptyCatch {
                open,
                close,
                binding,
            })
        })
        .collect()
}

/// `e` from `Exception e` or `IOException | SQLException e`
fn catch_binding(params: &str) -> Option<String> {
    let tokens: Vec<&str> = params
        .split(|c: char| c.is_whitespace() || c == '|')
        .filter(|t| !t.is_empty() && *t != "final")
        .collect();
    if tokens.len() < 2 {
        return None;
    }
    let name = *tokens.last()?;
    name.chars()
        .all(|c| c.is_alphanumeric() || c == '_')
        .then(|| name.to_string())
}

fn unhandled_try_blocks(mask: &str) -> usize {
    TRY_OPEN
        .find_iter(mask)
        .filter(|m| {
            let open = m.end() - 1;
            match matching_brace(mask.as_bytes(), open) {
                Some(close) => !HANDLER.is_match(&mask[close + 1..]),
                None => true,
            }
        })
        .count()
}

fn line_indent(text: &str, at: usize) -> &str {
    let line_start = text[..at].rfind('\n').map_or(0, |nl| nl + 1);
    let line = &text[line_start..at];
    &line[..line.len() - line.trim_start().len()]
}
