//! Ordered multi-strategy decoder

use crate::error::DecodeFailure;
use crate::payload::FragmentPayload;
use crate::strategy::{default_strategies, DecodeStrategy, StrategyAttempt, StrategyKind};
use mig_artifact::{FragmentResult, StructuralDescriptor};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// A decoded value tagged with the path that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    /// The decoded value
    pub value: T,
    /// Strategy that produced it
    pub strategy: StrategyKind,
    /// Strategies tried before it, with their reasons
    pub rejected: Vec<StrategyAttempt>,
}

impl<T> Decoded<T> {
    /// Whether the value was salvaged from a cut-off reply
    #[inline]
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.strategy == StrategyKind::TruncationRepair
    }

    /// Transform the value, keeping the tags
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decoded<U> {
        Decoded {
            value: f(self.value),
            strategy: self.strategy,
            rejected: self.rejected,
        }
    }
}

/// Decoder running its strategies in a fixed order
#[derive(Debug)]
pub struct ResponseDecoder {
    strategies: Vec<Box<dyn DecodeStrategy>>,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDecoder {
    /// Decoder with direct, fenced, truncation repair and bracket scan, in that order
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: default_strategies(),
        }
    }

    /// Decoder with a custom strategy order
    #[must_use]
    pub fn with_strategies(strategies: Vec<Box<dyn DecodeStrategy>>) -> Self {
        Self { strategies }
    }

    /// Strategy tags in the order they run
    #[must_use]
    pub fn order(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Decode `raw` into the first candidate that deserializes as `T` and passes `accept`
    ///
    /// # Errors
    /// [`DecodeFailure`] listing why every strategy was rejected
    pub fn decode<T, F>(&self, raw: &str, accept: F) -> Result<Decoded<T>, DecodeFailure>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let mut rejected = Vec::new();
        for strategy in &self.strategies {
            let kind = strategy.kind();
            let candidates = match strategy.candidates(raw) {
                Ok(candidates) => candidates,
                Err(reason) => {
                    rejected.push(StrategyAttempt::new(kind, reason));
                    continue;
                }
            };

            let mut last_reason = String::from("no candidates");
            for candidate in candidates {
                match serde_json::from_value::<T>(candidate) {
                    Ok(value) if accept(&value) => {
                        debug!("decoded reply via {kind} after {} rejections", rejected.len());
                        return Ok(Decoded {
                            value,
                            strategy: kind,
                            rejected,
                        });
                    }
                    Ok(_) => last_reason = "payload lacks required content".to_string(),
                    Err(e) => last_reason = format!("unexpected shape: {e}"),
                }
            }
            rejected.push(StrategyAttempt::new(kind, last_reason));
        }

        let failure = DecodeFailure::new(raw, rejected);
        warn!("{failure}");
        Err(failure)
    }

    /// Decode a translation reply for fragment `index`
    ///
    /// A salvaged reply keeps the truncation issue the repair strategy added.
    ///
    /// # Errors
    /// [`DecodeFailure`] when no strategy yields translated text
    pub fn decode_fragment(
        &self,
        raw: &str,
        index: usize,
    ) -> Result<Decoded<FragmentResult>, DecodeFailure> {
        self.decode::<FragmentPayload, _>(raw, FragmentPayload::is_usable)
            .map(|decoded| decoded.map(|payload| payload.into_result(index)))
    }

    /// Decode a structural-analysis reply
    ///
    /// # Errors
    /// [`DecodeFailure`] when no strategy yields a descriptor object
    pub fn decode_descriptor(
        &self,
        raw: &str,
    ) -> Result<Decoded<StructuralDescriptor>, DecodeFailure> {
        self.decode::<StructuralDescriptor, _>(raw, |_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::TRUNCATED_ISSUE;
    use pretty_assertions::assert_eq;

    const CLEAN: &str = r#"{"convertedCode": "public class Account { }", "conversionNotes": "ok", "potentialIssues": [], "databaseUsed": false}"#;

    #[test]
    fn default_order() {
        assert_eq!(
            ResponseDecoder::new().order(),
            vec![
                StrategyKind::Direct,
                StrategyKind::Fenced,
                StrategyKind::TruncationRepair,
                StrategyKind::BracketScan
            ]
        );
    }

    #[test]
    fn clean_reply_decodes_directly() {
        let decoded = ResponseDecoder::new().decode_fragment(CLEAN, 0).unwrap();
        assert_eq!(decoded.strategy, StrategyKind::Direct);
        assert!(decoded.rejected.is_empty());
        assert_eq!(decoded.value.translated_text, "public class Account { }");
    }

    #[test]
    fn fenced_reply_matches_direct_reply() {
        let decoder = ResponseDecoder::new();
        let direct = decoder.decode_fragment(CLEAN, 1).unwrap();
        let fenced = decoder
            .decode_fragment(&format!("Here is the result:\n```json\n{CLEAN}\n```\n"), 1)
            .unwrap();
        assert_eq!(fenced.strategy, StrategyKind::Fenced);
        assert_eq!(fenced.rejected[0].strategy, StrategyKind::Direct);
        assert_eq!(direct.value, fenced.value);
    }

    #[test]
    fn truncated_reply_is_salvaged() {
        let raw = r#"{"convertedCode": "public class Ledger {\n  void Post() { }\n}", "conversionNotes": "mapped"#;
        let decoded = ResponseDecoder::new().decode_fragment(raw, 2).unwrap();
        assert!(decoded.truncated());
        assert_eq!(
            decoded.value.translated_text,
            "public class Ledger {\n  void Post() { }\n}"
        );
        assert!(decoded.value.issues.iter().any(|i| i == TRUNCATED_ISSUE));
        assert_eq!(
            decoded.rejected.iter().map(|a| a.strategy).collect::<Vec<_>>(),
            vec![StrategyKind::Direct, StrategyKind::Fenced]
        );
    }

    #[test]
    fn embedded_object_found_by_scan() {
        let raw = r#"Result follows {"convertedCode": "class B { }"} -- end"#;
        let decoded = ResponseDecoder::new().decode_fragment(raw, 0).unwrap();
        assert_eq!(decoded.strategy, StrategyKind::BracketScan);
    }

    #[test]
    fn payload_without_text_is_rejected() {
        let failure = ResponseDecoder::new()
            .decode_fragment(r#"{"conversionNotes": "I could not convert this"}"#, 0)
            .unwrap_err();
        assert_eq!(failure.attempts.len(), 4);
        assert!(failure.attempts[0].reason.contains("required content"));
    }

    #[test]
    fn garbage_fails_with_preview() {
        let raw = "x".repeat(3_000);
        let failure = ResponseDecoder::new().decode_fragment(&raw, 0).unwrap_err();
        assert_eq!(failure.preview.len(), crate::error::PREVIEW_CHARS);
    }

    #[test]
    fn descriptor_reply_decodes() {
        let raw = "```json\n{\"projectName\": \"Payroll\", \"classes\": [{\"name\": \"Employee\"}]}\n```";
        let decoded = ResponseDecoder::new().decode_descriptor(raw).unwrap();
        assert_eq!(decoded.value.artifact_name, "Payroll");
        assert!(decoded.value.type_names().contains("Employee"));
    }
}
