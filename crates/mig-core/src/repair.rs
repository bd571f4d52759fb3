//! Final repair of the merged artifact
//!
//! Mechanical fixes always run (missing closing braces, empty catch
//! bodies). When normalization is enabled the fixed text is then sent to
//! the service once; the reply replaces the text only if it still contains
//! every descriptor-recorded name the text contained.

use crate::config::RetryPolicy;
use crate::retry::call_with_retry;
use crate::telemetry::REPAIRS;
use mig_artifact::{Issue, IssueKind, SourceLanguage, StructuralDescriptor, TargetLanguage};
use mig_backend::{RequestKind, TransformRequest, TransformationService};
use mig_composition::apply_mechanical_fixes;
use mig_decode::preferred_block;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Names listed in a rejection issue
const LISTED_NAMES: usize = 5;

/// Repaired text plus what the repair did or refused to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repaired {
    pub text: String,
    pub issues: Vec<Issue>,
    /// Whether the service normalization was accepted
    pub normalized: bool,
}

/// Consistency repair for one target language
#[derive(Clone)]
pub struct RepairPass {
    service: Arc<dyn TransformationService>,
    retry: RetryPolicy,
    source: SourceLanguage,
    target: TargetLanguage,
    normalize: bool,
}

impl std::fmt::Debug for RepairPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairPass")
            .field("service", &self.service.name())
            .field("target", &self.target)
            .field("normalize", &self.normalize)
            .finish_non_exhaustive()
    }
}

impl RepairPass {
    /// Repair pass for `target` using `service` for normalization
    #[must_use]
    pub fn new(
        service: Arc<dyn TransformationService>,
        retry: RetryPolicy,
        target: TargetLanguage,
    ) -> Self {
        Self {
            service,
            retry,
            source: SourceLanguage::default(),
            target,
            normalize: true,
        }
    }

    /// Toggle the service normalization request
    #[inline]
    #[must_use]
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// With the legacy language forwarded to the service
    #[inline]
    #[must_use]
    pub fn with_source(mut self, source: SourceLanguage) -> Self {
        self.source = source;
        self
    }

    /// Repair `merged`, guarding the names recorded in `descriptor`
    pub async fn repair(&self, merged: &str, descriptor: &StructuralDescriptor) -> Repaired {
        let (fixed, mut issues) = apply_mechanical_fixes(merged, &self.target);
        if !self.normalize {
            return Repaired {
                text: fixed,
                issues,
                normalized: false,
            };
        }

        let request = TransformRequest::new(RequestKind::Normalize, fixed.clone())
            .with_descriptor(descriptor.clone())
            .with_languages(self.source, self.target.clone());
        let reply = match call_with_retry(self.service.as_ref(), &request, &self.retry).await {
            Ok(reply) => reply.text,
            Err(e) => {
                return self.reject(fixed, issues, format!("normalization request failed: {e}"));
            }
        };

        let candidate = preferred_block(&reply, self.target.fence_tag())
            .unwrap_or_else(|| reply.trim().to_string());
        if candidate.trim().is_empty() {
            return self.reject(fixed, issues, "normalization returned no code".to_string());
        }

        let lost = lost_names(&fixed, &candidate, &descriptor.recorded_names());
        if !lost.is_empty() {
            let listed: Vec<&str> = lost.iter().take(LISTED_NAMES).map(String::as_str).collect();
            let more = lost.len().saturating_sub(LISTED_NAMES);
            let suffix = if more > 0 {
                format!(" and {more} more")
            } else {
                String::new()
            };
            return self.reject(
                fixed,
                issues,
                format!(
                    "normalization dropped recorded names: {}{suffix}",
                    listed.join(", ")
                ),
            );
        }

        let (normalized, extra) = apply_mechanical_fixes(&candidate, &self.target);
        issues.extend(extra);
        info!(
            "normalization accepted ({} -> {} chars)",
            fixed.len(),
            normalized.len()
        );
        metrics::counter!(REPAIRS, "outcome" => "accepted").increment(1);
        Repaired {
            text: normalized,
            issues,
            normalized: true,
        }
    }

    fn reject(&self, fixed: String, mut issues: Vec<Issue>, reason: String) -> Repaired {
        warn!("keeping un-normalized artifact: {reason}");
        metrics::counter!(REPAIRS, "outcome" => "rejected").increment(1);
        issues.push(Issue::new(IssueKind::RepairRejected, reason));
        Repaired {
            text: fixed,
            issues,
            normalized: false,
        }
    }
}

/// Names from `recorded` present in `before` but gone from `after`
#[must_use]
pub fn lost_names(before: &str, after: &str, recorded: &BTreeSet<String>) -> Vec<String> {
    recorded
        .iter()
        .filter(|name| contains_identifier(before, name) && !contains_identifier(after, name))
        .cloned()
        .collect()
}

/// Whether `name` occurs in `text` as a whole identifier
fn contains_identifier(text: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let is_ident = |c: char| c.is_alphanumeric() || c == '_';
    text.match_indices(name).any(|(at, _)| {
        let before = text[..at].chars().next_back();
        let after = text[at + name.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}
