//! Decode strategies and their tagged outcomes
//!
//! Provides the [`DecodeStrategy`] trait. Each strategy turns a raw reply
//! into zero or more JSON candidates; the decoder tries candidates in order
//! and keeps the first one the caller accepts.

use crate::fence::fenced_blocks;
use crate::repair::salvage_truncated;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Smallest bracketed region worth trying in the last-resort scan
pub const MIN_BRACKET_CANDIDATE: usize = 20;

/// Which decode path produced (or failed to produce) a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// The whole reply parsed as JSON
    Direct,
    /// A fenced block inside the reply parsed
    Fenced,
    /// The translated text was salvaged from a cut-off reply
    TruncationRepair,
    /// A bracketed region found by scanning parsed
    BracketScan,
}

impl StrategyKind {
    /// Stable label, also used as a metrics tag
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Fenced => "fenced",
            Self::TruncationRepair => "truncation_repair",
            Self::BracketScan => "bracket_scan",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why one strategy gave up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    /// Strategy that was tried
    pub strategy: StrategyKind,
    /// Reason it produced nothing acceptable
    pub reason: String,
}

impl StrategyAttempt {
    /// Record a rejected strategy
    #[inline]
    #[must_use]
    pub fn new(strategy: StrategyKind, reason: impl Into<String>) -> Self {
        Self {
            strategy,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for StrategyAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

/// One way of locating a JSON payload inside a reply
pub trait DecodeStrategy: Send + Sync + fmt::Debug {
    /// Tag reported when this strategy wins or fails
    fn kind(&self) -> StrategyKind;

    /// Candidate payloads in the order they should be tried
    ///
    /// # Errors
    /// Returns the reason when the strategy does not apply at all
    fn candidates(&self, raw: &str) -> Result<Vec<Value>, String>;
}

/// Parse the reply as it stands
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectParse;

impl DecodeStrategy for DirectParse {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    fn candidates(&self, raw: &str) -> Result<Vec<Value>, String> {
        serde_json::from_str::<Value>(raw.trim())
            .map(|v| vec![v])
            .map_err(|e| e.to_string())
    }
}

/// Parse each fenced code block
#[derive(Debug, Clone, Copy, Default)]
pub struct FencedBlocks;

impl DecodeStrategy for FencedBlocks {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fenced
    }

    fn candidates(&self, raw: &str) -> Result<Vec<Value>, String> {
        let blocks = fenced_blocks(raw);
        if blocks.is_empty() {
            return Err("no fenced blocks".to_string());
        }
        let total = blocks.len();
        let parsed: Vec<Value> = blocks
            .into_iter()
            .filter_map(|b| serde_json::from_str(b.code.trim()).ok())
            .collect();
        if parsed.is_empty() {
            return Err(format!("none of {total} fenced blocks parsed"));
        }
        Ok(parsed)
    }
}

/// Salvage the translated text of a cut-off reply
#[derive(Debug, Clone, Copy, Default)]
pub struct TruncationRepair;

impl DecodeStrategy for TruncationRepair {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TruncationRepair
    }

    fn candidates(&self, raw: &str) -> Result<Vec<Value>, String> {
        salvage_truncated(raw).map(|v| vec![v])
    }
}

/// Try every balanced `{...}` region longer than [`MIN_BRACKET_CANDIDATE`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketScan;

impl DecodeStrategy for BracketScan {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BracketScan
    }

    fn candidates(&self, raw: &str) -> Result<Vec<Value>, String> {
        let regions = bracket_regions(raw);
        if regions.is_empty() {
            return Err(format!(
                "no bracketed region longer than {MIN_BRACKET_CANDIDATE} chars"
            ));
        }
        let total = regions.len();
        let parsed: Vec<Value> = regions
            .into_iter()
            .filter_map(|r| serde_json::from_str::<Value>(r).ok())
            .filter(Value::is_object)
            .collect();
        if parsed.is_empty() {
            return Err(format!("none of {total} bracketed regions parsed"));
        }
        Ok(parsed)
    }
}

/// Balanced `{...}` regions, outermost first by start position
///
/// Braces inside JSON strings do not count.
fn bracket_regions(raw: &str) -> Vec<&str> {
    let bytes = raw.as_bytes();
    let mut regions = Vec::new();
    for (start, _) in raw.match_indices('{') {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        for (offset, &b) in bytes[start..].iter().enumerate() {
            if in_string {
                match b {
                    _ if escaped => escaped = false,
                    b'\\' => escaped = true,
                    b'"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match b {
                b'"' => in_string = true,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let end = start + offset + 1;
                        if end - start > MIN_BRACKET_CANDIDATE {
                            regions.push(&raw[start..end]);
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
    }
    regions
}

/// The default strategy order
#[must_use]
pub fn default_strategies() -> Vec<Box<dyn DecodeStrategy>> {
    vec![
        Box::new(DirectParse),
        Box::new(FencedBlocks),
        Box::new(TruncationRepair),
        Box::new(BracketScan),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(StrategyKind::Direct.to_string(), "direct");
        assert_eq!(StrategyKind::TruncationRepair.as_str(), "truncation_repair");
        let attempt = StrategyAttempt::new(StrategyKind::Fenced, "no fenced blocks");
        assert_eq!(attempt.to_string(), "fenced: no fenced blocks");
    }

    #[test]
    fn direct_rejects_prose() {
        assert!(DirectParse.candidates("Sure! Here is the code").is_err());
        assert_eq!(DirectParse.candidates(" {\"a\":1} \n").unwrap().len(), 1);
    }

    #[test]
    fn fenced_skips_unparsable_blocks() {
        let raw = "```\nnot json\n```\n```json\n{\"a\": 1}\n```";
        let values = FencedBlocks.candidates(raw).unwrap();
        assert_eq!(values, vec![serde_json::json!({"a": 1})]);
    }

    #[test]
    fn bracket_regions_ignore_braces_in_strings() {
        let raw = r#"noise {"code": "class A { }", "notes": "n"} tail {x}"#;
        let regions = bracket_regions(raw);
        assert_eq!(regions, vec![r#"{"code": "class A { }", "notes": "n"}"#]);
    }

    #[test]
    fn bracket_scan_tries_later_candidates() {
        let raw = r#"prefix {not valid json at all here} then {"convertedCode": "x y z"}"#;
        let values = BracketScan.candidates(raw).unwrap();
        assert_eq!(values[0]["convertedCode"], "x y z");
    }

    #[test]
    fn short_regions_are_skipped() {
        assert!(BracketScan.candidates("{\"a\": 1}").is_err());
    }
}
