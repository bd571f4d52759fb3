//! Supporting-context lookup contract

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One supporting document excerpt
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextSnippet {
    /// Where the text came from (file name, document title)
    pub source_label: String,
    /// Excerpt
    pub text: String,
}

impl ContextSnippet {
    /// New snippet
    #[must_use]
    pub fn new(source_label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_label: source_label.into(),
            text: text.into(),
        }
    }
}

/// Finds documents relevant to a query
///
/// Callers treat a failure as "no context"; implementations may still
/// report it so it can be recorded.
#[async_trait]
pub trait ContextLookup: Send + Sync {
    /// Up to `limit` snippets for `query`, most relevant first
    async fn lookup(&self, query: &str, limit: usize) -> Result<Vec<ContextSnippet>>;
}

/// Lookup that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

#[async_trait]
impl ContextLookup for NoContext {
    async fn lookup(&self, _query: &str, _limit: usize) -> Result<Vec<ContextSnippet>> {
        Ok(Vec::new())
    }
}

/// Fixed in-memory corpus, matched by shared words
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    snippets: Vec<ContextSnippet>,
}

impl StaticContext {
    /// Corpus of `snippets`
    #[must_use]
    pub fn new(snippets: Vec<ContextSnippet>) -> Self {
        Self { snippets }
    }
}

#[async_trait]
impl ContextLookup for StaticContext {
    async fn lookup(&self, query: &str, limit: usize) -> Result<Vec<ContextSnippet>> {
        let words: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|w| w.len() > 2)
            .map(str::to_ascii_lowercase)
            .collect();
        let mut scored: Vec<(usize, &ContextSnippet)> = self
            .snippets
            .iter()
            .map(|s| {
                let haystack = s.text.to_ascii_lowercase();
                (words.iter().filter(|w| haystack.contains(w.as_str())).count(), s)
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        // Stable sort keeps corpus order among equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, s)| s.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_context_is_empty() {
        assert!(NoContext.lookup("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn static_context_ranks_by_overlap() {
        let corpus = StaticContext::new(vec![
            ContextSnippet::new("a.md", "interest rates are rounded half up"),
            ContextSnippet::new("b.md", "customer accounts and interest rates"),
            ContextSnippet::new("c.md", "unrelated"),
        ]);
        let found = corpus.lookup("customer interest", 5).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].source_label, "b.md");
        let limited = corpus.lookup("customer interest", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
