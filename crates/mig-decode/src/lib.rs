//! MIG Response Decoder
//!
//! Turns the free-text replies of the transformation service into typed
//! values. Strategies run in a fixed order and the first acceptable
//! candidate wins:
//!
//! 1. **Direct**: the reply is JSON
//! 2. **Fenced**: a fenced code block holds JSON
//! 3. **Truncation repair**: the translated text is salvaged from a cut-off reply
//! 4. **Bracket scan**: any balanced `{...}` region longer than a threshold
//!
//! The result records which strategy won and why the earlier ones were
//! rejected, so callers can tell a clean reply from a repaired one.
//!
//! # Example
//!
//! ```rust
//! use mig_decode::{ResponseDecoder, StrategyKind};
//!
//! let reply = "```json\n{\"convertedCode\": \"class A { }\"}\n```";
//! let decoded = ResponseDecoder::new().decode_fragment(reply, 0).unwrap();
//! assert_eq!(decoded.strategy, StrategyKind::Fenced);
//! assert_eq!(decoded.value.translated_text, "class A { }");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod decoder;
mod error;
pub mod fence;
mod payload;
mod repair;
pub mod strategy;

pub use decoder::{Decoded, ResponseDecoder};
pub use error::{DecodeFailure, PREVIEW_CHARS};
pub use fence::{fenced_blocks, preferred_block, FencedBlock};
pub use payload::{FragmentPayload, TEXT_KEYS};
pub use repair::{salvage_truncated, TRUNCATED_ISSUE, TRUNCATED_NOTES};
pub use strategy::{
    BracketScan, DecodeStrategy, DirectParse, FencedBlocks, StrategyAttempt, StrategyKind,
    TruncationRepair,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn fenced_and_direct_agree(code in "[A-Za-z0-9 {};()\\n\"]{1,200}", notes in "[a-z ]{0,40}") {
            prop_assume!(!code.trim().is_empty());
            let payload = serde_json::json!({
                "convertedCode": code,
                "conversionNotes": notes,
                "potentialIssues": ["check"],
                "databaseUsed": true,
            })
            .to_string();
            let decoder = ResponseDecoder::new();
            let direct = decoder.decode_fragment(&payload, 4).unwrap();
            let fenced = decoder
                .decode_fragment(&format!("```json\n{payload}\n```"), 4)
                .unwrap();
            prop_assert_eq!(direct.strategy, StrategyKind::Direct);
            prop_assert_eq!(fenced.strategy, StrategyKind::Fenced);
            prop_assert_eq!(direct.value, fenced.value);
        }
    }

    #[test]
    fn truncated_reply_keeps_complete_text_field() {
        let full = r#"{"convertedCode": "public class Batch {\n  public void Run() { }\n}", "conversionNotes": "done", "potentialIssues": ["#;
        let decoded = ResponseDecoder::new().decode_fragment(full, 0).unwrap();
        assert_eq!(decoded.strategy, StrategyKind::TruncationRepair);
        assert!(decoded.value.translated_text.contains("public void Run()"));
        assert_eq!(decoded.value.notes, "done");
        assert!(decoded.value.issues.contains(&TRUNCATED_ISSUE.to_string()));
    }
}
