//! Cached, failure-tolerant supporting-context lookup
//!
//! Wraps a [`ContextLookup`] with a moka cache keyed by the query text.
//! A failed lookup never stops a conversion: it yields no snippets plus an
//! issue, and is not cached so the next fragment asks again.

use crate::config::ContextSettings;
use mig_artifact::{ContentHash, Issue, IssueKind};
use mig_backend::{ContextLookup, ContextSnippet};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Snippets found for a fragment, and the issue if the lookup failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gathered {
    pub snippets: Vec<ContextSnippet>,
    pub issue: Option<Issue>,
}

/// Supporting-context lookup with caching and graceful degradation
#[derive(Clone)]
pub struct SupportingContext {
    lookup: Arc<dyn ContextLookup>,
    cache: Cache<(ContentHash, usize), Arc<Vec<ContextSnippet>>>,
    settings: ContextSettings,
}

impl std::fmt::Debug for SupportingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupportingContext")
            .field("settings", &self.settings)
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl SupportingContext {
    /// Wrap `lookup`
    #[must_use]
    pub fn new(lookup: Arc<dyn ContextLookup>, settings: ContextSettings) -> Self {
        let cache = Cache::builder()
            .max_capacity(settings.cache_capacity)
            .time_to_live(Duration::from_secs(settings.cache_ttl_secs))
            .build();
        Self {
            lookup,
            cache,
            settings,
        }
    }

    /// Snippets for the fragment text `source`, which is fragment `index`
    pub async fn gather(&self, source: &str, index: usize) -> Gathered {
        if !self.settings.enabled || self.settings.limit == 0 {
            return Gathered::default();
        }
        let query: String = source.chars().take(self.settings.query_chars).collect();
        if query.trim().is_empty() {
            return Gathered::default();
        }
        let key = (ContentHash::of_text(&query), self.settings.limit);
        if let Some(hit) = self.cache.get(&key).await {
            debug!("context cache hit for fragment {}", index + 1);
            return Gathered {
                snippets: hit.as_ref().clone(),
                issue: None,
            };
        }

        match self.lookup.lookup(&query, self.settings.limit).await {
            Ok(mut snippets) => {
                snippets.truncate(self.settings.limit);
                debug!("found {} context snippets for fragment {}", snippets.len(), index + 1);
                self.cache.insert(key, Arc::new(snippets.clone())).await;
                Gathered {
                    snippets,
                    issue: None,
                }
            }
            Err(e) => {
                warn!("context lookup failed for fragment {}: {e}", index + 1);
                Gathered {
                    snippets: Vec::new(),
                    issue: Some(Issue::for_fragment(
                        IssueKind::ContextLookup,
                        index,
                        format!("continuing without supporting context: {e}"),
                    )),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mig_backend::ServiceError;
    use mockall::mock;

    mock! {
        Lookup {}

        #[async_trait]
        impl ContextLookup for Lookup {
            async fn lookup(&self, query: &str, limit: usize) -> mig_backend::Result<Vec<ContextSnippet>>;
        }
    }

    fn context(lookup: MockLookup) -> SupportingContext {
        SupportingContext::new(Arc::new(lookup), ContextSettings::default())
    }

    #[tokio::test]
    async fn repeated_queries_hit_the_cache() {
        let mut lookup = MockLookup::new();
        lookup
            .expect_lookup()
            .times(1)
            .returning(|_, _| Ok(vec![ContextSnippet::new("rules.md", "round half up")]));
        let context = context(lookup);

        let first = context.gather("COMPUTE INTEREST ROUNDED.", 0).await;
        let second = context.gather("COMPUTE INTEREST ROUNDED.", 1).await;
        assert_eq!(first.snippets.len(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn failure_degrades_to_empty_with_issue() {
        let mut lookup = MockLookup::new();
        lookup
            .expect_lookup()
            .times(2)
            .returning(|_, _| Err(ServiceError::Lookup("index offline".into())));
        let context = context(lookup);

        let gathered = context.gather("MOVE A TO B.", 2).await;
        assert!(gathered.snippets.is_empty());
        let issue = gathered.issue.unwrap();
        assert_eq!(issue.kind, IssueKind::ContextLookup);
        assert_eq!(issue.fragment, Some(2));

        // failures are not cached
        assert!(context.gather("MOVE A TO B.", 3).await.issue.is_some());
    }

    #[tokio::test]
    async fn disabled_lookup_is_never_called() {
        let mut lookup = MockLookup::new();
        lookup.expect_lookup().never();
        let settings = ContextSettings {
            enabled: false,
            ..ContextSettings::default()
        };
        let context = SupportingContext::new(Arc::new(lookup), settings);
        assert_eq!(context.gather("MOVE A TO B.", 0).await, Gathered::default());
    }

    #[tokio::test]
    async fn results_are_capped_at_limit() {
        let mut lookup = MockLookup::new();
        lookup.expect_lookup().returning(|_, _| {
            Ok((0..10)
                .map(|i| ContextSnippet::new(format!("doc{i}"), "text"))
                .collect())
        });
        let settings = ContextSettings {
            limit: 2,
            ..ContextSettings::default()
        };
        let context = SupportingContext::new(Arc::new(lookup), settings);
        assert_eq!(context.gather("PERFORM X.", 0).await.snippets.len(), 2);
    }
}
