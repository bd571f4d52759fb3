//! Wire shape of a fragment reply
//!
//! The service is asked for `convertedCode`, `conversionNotes`,
//! `potentialIssues` and `databaseUsed`, but replies drift between naming
//! conventions, so every field accepts its known aliases.

use mig_artifact::FragmentResult;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepted names of the translated-text field, canonical first
pub const TEXT_KEYS: &[&str] = &["convertedCode", "translatedText", "translated_text", "code"];

/// Decoded reply to a translation request
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FragmentPayload {
    /// Translated source text
    #[serde(
        default,
        alias = "convertedCode",
        alias = "translatedText",
        alias = "code",
        deserialize_with = "translated_text"
    )]
    pub translated_text: Option<String>,

    /// Free-text notes
    #[serde(default, alias = "conversionNotes", deserialize_with = "lenient_text")]
    pub notes: String,

    /// Problems the service reported
    #[serde(default, alias = "potentialIssues", deserialize_with = "lenient_list")]
    pub issues: Vec<String>,

    /// Whether the translation talks to persistent storage
    #[serde(
        default,
        alias = "databaseUsed",
        alias = "usesStorage",
        deserialize_with = "lenient_flag"
    )]
    pub uses_storage: bool,
}

impl FragmentPayload {
    /// A payload is usable once it carries translated text
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.translated_text
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }

    /// Convert into the result for fragment `index`
    #[must_use]
    pub fn into_result(self, index: usize) -> FragmentResult {
        let mut result = FragmentResult::translated(index, self.translated_text.unwrap_or_default())
            .with_notes(self.notes)
            .with_storage(self.uses_storage);
        for issue in self.issues {
            result = result.with_issue(issue);
        }
        result
    }
}

fn translated_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(flatten_text(&value))
}

/// Text of a string, or of an object of generated files joined in order
fn flatten_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(files) => {
            let parts: Vec<String> = files
                .iter()
                .filter_map(|(key, file)| match file {
                    Value::String(s) if !s.trim().is_empty() => Some(format!("// {key}\n{s}")),
                    Value::Object(entry) => {
                        let content = entry.get("content")?.as_str()?;
                        if content.trim().is_empty() {
                            return None;
                        }
                        let path = entry.get("Path").and_then(Value::as_str).unwrap_or_default();
                        let name = entry
                            .get("FileName")
                            .and_then(Value::as_str)
                            .unwrap_or(key.as_str());
                        Some(format!("// {path}{name}\n{content}"))
                    }
                    _ => None,
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join("\n\n"))
        }
        _ => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    })
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().map(value_text).collect(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        Value::String(s) => vec![s],
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
