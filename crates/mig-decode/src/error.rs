//! Decode failure (egress of the decoder)

use crate::strategy::StrategyAttempt;

/// Characters of the raw reply kept for diagnosis
pub const PREVIEW_CHARS: usize = 1_000;

/// No strategy produced an acceptable payload
#[derive(Debug, Clone, thiserror::Error)]
#[error("reply could not be decoded after {} strategies: {}", .attempts.len(), summary(.attempts))]
pub struct DecodeFailure {
    /// First [`PREVIEW_CHARS`] characters of the reply
    pub preview: String,
    /// Why each strategy gave up, in the order tried
    pub attempts: Vec<StrategyAttempt>,
}

impl DecodeFailure {
    /// Failure for `raw` after `attempts`
    #[must_use]
    pub fn new(raw: &str, attempts: Vec<StrategyAttempt>) -> Self {
        Self {
            preview: raw.chars().take(PREVIEW_CHARS).collect(),
            attempts,
        }
    }
}

fn summary(attempts: &[StrategyAttempt]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
