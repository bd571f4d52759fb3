use mig_artifact::SourceLanguage;
use serde::{Deserialize, Serialize};

/// Configuration for boundary-aware chunking
///
/// Sizes are in bytes, counting one extra byte per line for the terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Hard limit for a fragment; only a single oversized line can exceed it
    pub max_fragment_size: usize,

    /// Overlap size; `overlap_size / 10` lines are carried into the next fragment
    pub overlap_size: usize,

    /// A boundary line only closes a fragment once this many non-carried bytes accumulated
    pub min_fragment_size: usize,

    /// Which boundary patterns apply
    pub language: SourceLanguage,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_fragment_size: 23_500,
            overlap_size: 1_000,
            min_fragment_size: 1_000,
            language: SourceLanguage::Cobol,
        }
    }
}

impl ChunkerConfig {
    /// Config with explicit size and overlap; the minimum equals the overlap
    #[must_use]
    pub fn new(max_fragment_size: usize, overlap_size: usize) -> Self {
        Self {
            max_fragment_size,
            overlap_size,
            min_fragment_size: overlap_size,
            ..Self::default()
        }
    }

    /// With boundary language
    #[inline]
    #[must_use]
    pub fn with_language(mut self, language: SourceLanguage) -> Self {
        self.language = language;
        self
    }

    /// With minimum fragment size before a boundary line may close it
    #[inline]
    #[must_use]
    pub fn with_min_fragment_size(mut self, min: usize) -> Self {
        self.min_fragment_size = min;
        self
    }

    /// Lines carried from one fragment into the next
    #[inline]
    #[must_use]
    pub fn overlap_lines(&self) -> usize {
        self.overlap_size / 10
    }

    /// Validate configuration
    ///
    /// # Errors
    /// Returns a description of the first inconsistent setting
    pub fn validate(&self) -> Result<(), String> {
        if self.max_fragment_size == 0 {
            return Err("max_fragment_size must be > 0".to_string());
        }
        if self.overlap_size >= self.max_fragment_size {
            return Err(format!(
                "overlap_size ({}) must be smaller than max_fragment_size ({})",
                self.overlap_size, self.max_fragment_size
            ));
        }
        if self.min_fragment_size >= self.max_fragment_size {
            return Err(format!(
                "min_fragment_size ({}) must be smaller than max_fragment_size ({})",
                self.min_fragment_size, self.max_fragment_size
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ChunkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.overlap_lines(), 100);
    }

    #[test]
    fn overlap_must_fit() {
        assert!(ChunkerConfig::new(100, 100).validate().is_err());
        assert!(ChunkerConfig::new(0, 0).validate().is_err());
    }

    #[test]
    fn new_takes_minimum_from_overlap() {
        let config = ChunkerConfig::new(5_000, 400);
        assert_eq!(config.min_fragment_size, 400);
        assert_eq!(ChunkerConfig::default().min_fragment_size, 1_000);
        assert_eq!(config.overlap_lines(), 40);
    }
}
