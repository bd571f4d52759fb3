use crate::boundary::BoundaryRules;
use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use mig_artifact::{BoundaryKind, Fragment, SourceDocument};

/// Splits a [`SourceDocument`] into ordered, overlap-bearing fragments
///
/// Every line of the document lands in at least one fragment, fragments
/// come out in document order, and each one contains at least one line
/// that was not carried over from its predecessor.
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
    rules: BoundaryRules,
}

impl Chunker {
    /// Create a chunker
    ///
    /// # Errors
    /// Returns [`ChunkerError::InvalidConfig`] for inconsistent sizes
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        let rules = BoundaryRules::for_language(config.language);
        Ok(Self { config, rules })
    }

    /// Current configuration
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split raw text
    ///
    /// # Errors
    /// Returns [`ChunkerError::EmptyContent`] for blank input
    pub fn chunk_text(&self, text: &str) -> Result<Vec<Fragment>> {
        self.chunk(&SourceDocument::from_text(text))
    }

    /// Split a document
    ///
    /// # Errors
    /// Returns [`ChunkerError::EmptyContent`] for blank input
    pub fn chunk(&self, document: &SourceDocument) -> Result<Vec<Fragment>> {
        if document.is_blank() {
            return Err(ChunkerError::EmptyContent);
        }

        let lines = document.lines();
        if document.len() <= self.config.max_fragment_size {
            tracing::debug!("document fits in one fragment ({} bytes)", document.len());
            return Ok(vec![Fragment::new(
                document,
                0,
                0..lines.len(),
                0,
                BoundaryKind::EndOfDocument,
            )]);
        }

        let max = self.config.max_fragment_size;
        let carry = self.config.overlap_lines();
        let mut fragments = Vec::new();
        let mut open = OpenFragment::default();

        for (i, line) in lines.iter().enumerate() {
            let line_size = line.len() + 1;
            if open.fresh_lines(i) > 0 {
                let closing = if open.size + line_size > max {
                    Some(BoundaryKind::SizeLimit)
                } else if open.fresh_size() > self.config.min_fragment_size
                    && self.rules.is_boundary(line)
                {
                    Some(BoundaryKind::Pattern)
                } else {
                    None
                };
                if let Some(kind) = closing {
                    let index = fragments.len();
                    fragments.push(open.close(document, index, i, kind));
                    let budget = max.saturating_sub(line_size);
                    open = OpenFragment::seeded(lines, i, carry.min(i - open.start - 1), budget);
                }
            }
            open.size += line_size;
        }
        let last = fragments.len();
        fragments.push(open.close(document, last, lines.len(), BoundaryKind::EndOfDocument));

        tracing::info!(
            "split {} lines into {} fragments (max {} bytes, {} overlap lines)",
            lines.len(),
            fragments.len(),
            max,
            carry
        );
        Ok(fragments)
    }
}

/// Fragment being accumulated: `start..` with `seed` carried lines
#[derive(Debug, Default)]
struct OpenFragment {
    start: usize,
    seed: usize,
    seed_size: usize,
    size: usize,
}

impl OpenFragment {
    /// Next fragment, seeded with up to `seed` lines before `end`
    ///
    /// Carried lines are dropped from the front until the seed fits in
    /// `budget`, leaving room for the line at `end`.
    fn seeded(lines: &[String], end: usize, seed: usize, budget: usize) -> Self {
        let mut start = end - seed;
        let mut size: usize = lines[start..end].iter().map(|l| l.len() + 1).sum();
        while start < end && size > budget {
            size -= lines[start].len() + 1;
            start += 1;
        }
        Self {
            start,
            seed: end - start,
            seed_size: size,
            size,
        }
    }

    /// Bytes added since the seed
    fn fresh_size(&self) -> usize {
        self.size - self.seed_size
    }

    /// Lines added since the seed, given the next line index
    fn fresh_lines(&self, next: usize) -> usize {
        next - self.start - self.seed
    }

    fn close(
        &self,
        document: &SourceDocument,
        index: usize,
        end: usize,
        kind: BoundaryKind,
    ) -> Fragment {
        if kind == BoundaryKind::SizeLimit {
            tracing::debug!("fragment {index} force-closed at the size limit");
        }
        Fragment::new(document, index, self.start..end, self.seed, kind)
    }
}
