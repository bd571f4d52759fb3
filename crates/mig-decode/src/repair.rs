//! Salvage of replies cut off mid-payload
//!
//! When the service runs out of output budget the reply usually stops
//! inside the translated-text string. The opening part of that string is
//! still useful, so it is recovered with a tolerant scan and wrapped in a
//! synthetic payload flagged as truncated.

use crate::payload::TEXT_KEYS;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

/// Notes recorded when the reply's own notes were lost
pub const TRUNCATED_NOTES: &str = "Truncated during processing";

/// Issue line attached to every salvaged payload
pub const TRUNCATED_ISSUE: &str = "response truncated: some content may be missing";

static TEXT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:convertedCode|translatedText|translated_text|code)"\s*:\s*""#)
        .expect("valid regex")
});
static NOTES_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:conversionNotes|notes)"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid regex")
});
static STORAGE_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:databaseUsed|usesStorage|uses_storage)"\s*:\s*(true|false)"#)
        .expect("valid regex")
});

/// Rebuild a payload from a truncated reply
///
/// # Errors
/// Returns the reason salvage does not apply
pub fn salvage_truncated(raw: &str) -> Result<Value, String> {
    let opens = raw.matches('{').count();
    let closes = raw.matches('}').count();
    if opens <= closes {
        return Err(format!("not truncated ({opens} '{{' vs {closes} '}}')"));
    }

    let field = TEXT_FIELD
        .find(raw)
        .ok_or_else(|| format!("no {} field to salvage", TEXT_KEYS[0]))?;
    let (body, complete) = string_body(&raw[field.end()..]);
    let text = unescape(body, complete);
    if text.trim().is_empty() {
        return Err("translated text is empty".to_string());
    }

    let notes = NOTES_FIELD
        .captures(raw)
        .map_or_else(|| TRUNCATED_NOTES.to_string(), |c| unescape(&c[1], true));
    let uses_storage = STORAGE_FIELD
        .captures(raw)
        .is_some_and(|c| &c[1] == "true");

    tracing::debug!(
        "salvaged {} chars of translated text ({})",
        text.len(),
        if complete { "string closed" } else { "string cut off" }
    );

    Ok(json!({
        "convertedCode": text,
        "conversionNotes": notes,
        "potentialIssues": [TRUNCATED_ISSUE],
        "databaseUsed": uses_storage,
    }))
}

/// Raw string content up to the closing quote, or to the end when unterminated
fn string_body(rest: &str) -> (&str, bool) {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return (&rest[..i], true),
            _ => i += 1,
        }
    }
    (rest, false)
}

/// JSON-unescape, tolerating a dangling escape at a cut-off end
fn unescape(body: &str, complete: bool) -> String {
    let mut body = body.to_string();
    if !complete {
        // Drop a trailing partial escape such as `\` or `\u00`.
        if let Some(pos) = body.rfind('\\') {
            let tail = &body[pos..];
            let dangling = tail.len() == 1 || (tail.starts_with("\\u") && tail.len() < 6);
            let escaped_backslash = body[..pos].ends_with('\\')
                && body[..pos].chars().rev().take_while(|c| *c == '\\').count() % 2 == 1;
            if dangling && !escaped_backslash {
                body.truncate(pos);
            }
        }
    }
    serde_json::from_str::<String>(&format!("\"{body}\"")).unwrap_or_else(|_| {
        body.replace("\\n", "\n")
            .replace("\\t", "\t")
            .replace("\\\"", "\"")
            .replace("\\\\", "\\")
    })
}
