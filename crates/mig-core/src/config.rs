//! Pipeline configuration
//!
//! Loadable from TOML; every section has defaults so a file only needs the
//! values it changes:
//!
//! ```toml
//! target = "java"
//! store_root = "output/conversions"
//!
//! [chunker]
//! max_fragment_size = 23500
//! overlap_size = 1000
//!
//! [retry]
//! max_attempts = 3
//! timeout_ms = 120000
//! ```

use crate::error::{PipelineError, Result};
use mig_artifact::{SourceLanguage, TargetLanguage};
use mig_chunker::ChunkerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Bounded retry applied to every service call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per call, the first included
    pub max_attempts: u32,
    /// Deadline for one attempt
    pub timeout_ms: u64,
    /// Fixed pause between attempts
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout_ms: 120_000,
            backoff_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Policy with `max_attempts` and a per-attempt `timeout`, no backoff
    #[must_use]
    pub fn new(max_attempts: u32, timeout: Duration) -> Self {
        Self {
            max_attempts,
            timeout_ms: millis(timeout),
            backoff_ms: 0,
        }
    }

    /// With backoff between attempts
    #[inline]
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff_ms = millis(backoff);
        self
    }

    /// Per-attempt deadline
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Pause between attempts
    #[inline]
    #[must_use]
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Supporting-context lookup settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// Query the lookup at all
    pub enabled: bool,
    /// Snippets attached per request
    pub limit: usize,
    /// Leading characters of a fragment used as the query
    pub query_chars: usize,
    /// Cached queries
    pub cache_capacity: u64,
    /// Cache entry lifetime
    pub cache_ttl_secs: u64,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 3,
            query_chars: 2_000,
            cache_capacity: 256,
            cache_ttl_secs: 600,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fragment sizing and boundary rules
    pub chunker: ChunkerConfig,
    /// Legacy language; detected from the document when unset
    pub source: Option<SourceLanguage>,
    /// Output language
    pub target: TargetLanguage,
    /// Service call retry and timeout
    pub retry: RetryPolicy,
    /// Supporting-context lookup
    pub context: ContextSettings,
    /// Characters of the document sent for the structural bootstrap
    pub structure_sample_chars: usize,
    /// Translated fragments carried as rolling context
    pub rolling_context_fragments: usize,
    /// Where conversions persist their state; `None` keeps everything in memory
    pub store_root: Option<PathBuf>,
    /// Run the service normalization pass on the merged text
    pub normalize: bool,
    /// Merge by concatenation even for object-oriented targets
    pub force_concatenation: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            source: None,
            target: TargetLanguage::default(),
            retry: RetryPolicy::default(),
            context: ContextSettings::default(),
            structure_sample_chars: 30_000,
            rolling_context_fragments: 2,
            store_root: Some(PathBuf::from("output/conversions")),
            normalize: true,
            force_concatenation: false,
        }
    }
}

impl PipelineConfig {
    /// Default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// [`PipelineError::Config`] on malformed TOML or invalid values
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| PipelineError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// [`PipelineError::Config`] when the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`PipelineError::Config`] naming the first bad value
    pub fn validate(&self) -> Result<()> {
        self.chunker.validate().map_err(PipelineError::config)?;
        if self.retry.max_attempts == 0 {
            return Err(PipelineError::config("retry.max_attempts must be at least 1"));
        }
        if self.retry.timeout_ms == 0 {
            return Err(PipelineError::config("retry.timeout_ms must be positive"));
        }
        Ok(())
    }

    /// With chunker settings
    #[inline]
    #[must_use]
    pub fn with_chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }

    /// With output language
    #[inline]
    #[must_use]
    pub fn with_target(mut self, target: TargetLanguage) -> Self {
        self.target = target;
        self
    }

    /// With a fixed source language
    #[inline]
    #[must_use]
    pub fn with_source(mut self, source: SourceLanguage) -> Self {
        self.source = Some(source);
        self
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// With context lookup settings
    #[inline]
    #[must_use]
    pub fn with_context(mut self, context: ContextSettings) -> Self {
        self.context = context;
        self
    }

    /// With persistence under `root`
    #[inline]
    #[must_use]
    pub fn with_store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.store_root = Some(root.into());
        self
    }

    /// Without persistence
    #[inline]
    #[must_use]
    pub fn in_memory(mut self) -> Self {
        self.store_root = None;
        self
    }

    /// Toggle the normalization pass
    #[inline]
    #[must_use]
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// With rolling context size
    #[inline]
    #[must_use]
    pub fn with_rolling_context_fragments(mut self, fragments: usize) -> Self {
        self.rolling_context_fragments = fragments;
        self
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.rolling_context_fragments, 2);
        assert_eq!(config.chunker.max_fragment_size, 23_500);
        assert_eq!(config.target, TargetLanguage::CSharp);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            target = "java"
            normalize = false

            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.target, TargetLanguage::Java);
        assert!(!config.normalize);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.timeout_ms, 120_000);
        assert_eq!(config.chunker, ChunkerConfig::default());
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let err = PipelineConfig::from_toml_str("[retry]\nmax_attempts = 0\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn builder_methods() {
        let config = PipelineConfig::new()
            .with_retry(RetryPolicy::new(2, Duration::from_millis(50)))
            .in_memory()
            .with_normalize(false);
        assert_eq!(config.retry.timeout(), Duration::from_millis(50));
        assert_eq!(config.retry.backoff(), Duration::ZERO);
        assert!(config.store_root.is_none());
    }
}
