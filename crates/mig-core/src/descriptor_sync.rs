//! Keeps the structural descriptor in step with the conversion
//!
//! Three service round-trips, each producing a new descriptor version:
//!
//! - [`DescriptorSync::bootstrap`]: proposed architecture from a document sample
//! - [`DescriptorSync::merge`]: fold in what a translated fragment introduced
//! - [`DescriptorSync::finalize`]: last pass over the merged artifact
//!
//! Replies are folded in with [`StructuralDescriptor::absorb`], so a new
//! version never loses anything the previous one recorded. On failure the
//! caller keeps the previous version and records the returned error as an
//! issue.

use crate::config::RetryPolicy;
use crate::retry::call_with_retry;
use crate::telemetry::DECODE_STRATEGY;
use mig_artifact::{
    FragmentResult, Issue, IssueKind, SourceLanguage, StructuralDescriptor, TargetLanguage,
};
use mig_backend::{RequestKind, ServiceError, TransformRequest, TransformationService};
use mig_decode::{DecodeFailure, ResponseDecoder};
use std::sync::Arc;
use tracing::{debug, info};

/// Why a descriptor version could not be produced
#[derive(Debug, Clone, thiserror::Error)]
pub enum DescriptorSyncError {
    /// Service failed after retries
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Reply held no descriptor
    #[error(transparent)]
    Decode(#[from] DecodeFailure),
}

impl DescriptorSyncError {
    /// Issue recording that `stage` kept the previous descriptor
    #[must_use]
    pub fn into_issue(self, stage: &str, fragment: Option<usize>) -> Issue {
        let detail = format!("{stage} failed, previous descriptor kept: {self}");
        match fragment {
            Some(index) => Issue::for_fragment(IssueKind::DescriptorUpdate, index, detail),
            None => Issue::new(IssueKind::DescriptorUpdate, detail),
        }
    }
}

/// Descriptor round-trips for one conversion
#[derive(Clone)]
pub struct DescriptorSync {
    service: Arc<dyn TransformationService>,
    decoder: Arc<ResponseDecoder>,
    retry: RetryPolicy,
    sample_chars: usize,
    source: SourceLanguage,
    target: TargetLanguage,
    domain_requirements: String,
}

impl std::fmt::Debug for DescriptorSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorSync")
            .field("service", &self.service.name())
            .field("retry", &self.retry)
            .field("sample_chars", &self.sample_chars)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl DescriptorSync {
    /// Sync over `service`, decoding with `decoder`
    #[must_use]
    pub fn new(
        service: Arc<dyn TransformationService>,
        decoder: Arc<ResponseDecoder>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            service,
            decoder,
            retry,
            sample_chars: 30_000,
            source: SourceLanguage::default(),
            target: TargetLanguage::default(),
            domain_requirements: String::new(),
        }
    }

    /// With bootstrap sample size
    #[inline]
    #[must_use]
    pub fn with_sample_chars(mut self, sample_chars: usize) -> Self {
        self.sample_chars = sample_chars;
        self
    }

    /// With languages forwarded to the service
    #[inline]
    #[must_use]
    pub fn with_languages(mut self, source: SourceLanguage, target: TargetLanguage) -> Self {
        self.source = source;
        self.target = target;
        self
    }

    /// With business rules forwarded to the bootstrap request
    #[inline]
    #[must_use]
    pub fn with_domain_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.domain_requirements = requirements.into();
        self
    }

    /// Initial descriptor proposed from a sample of `document`
    ///
    /// # Errors
    /// [`DescriptorSyncError`] when the service fails or the reply holds no descriptor
    pub async fn bootstrap(
        &self,
        document: &str,
        artifact_name: &str,
    ) -> Result<StructuralDescriptor, DescriptorSyncError> {
        let sample = structure_sample(document, self.sample_chars);
        debug!(
            "bootstrapping descriptor from {} of {} chars",
            sample.len(),
            document.len()
        );
        let request = self
            .request(RequestKind::DescribeStructure, sample)
            .with_domain_requirements(self.domain_requirements.clone());
        let proposed = self.round_trip(&request).await?;
        let descriptor = StructuralDescriptor::empty(artifact_name).absorb(&proposed);
        info!(
            "descriptor bootstrapped: {} types, {} namespaces",
            descriptor.types.len(),
            descriptor.namespaces.len()
        );
        Ok(descriptor)
    }

    /// Next version including what `result` introduced
    ///
    /// # Errors
    /// [`DescriptorSyncError`] when the service fails or the reply holds no descriptor
    pub async fn merge(
        &self,
        current: &StructuralDescriptor,
        result: &FragmentResult,
    ) -> Result<StructuralDescriptor, DescriptorSyncError> {
        let request = self
            .request(
                RequestKind::UpdateStructure {
                    fragment_index: result.fragment_index,
                },
                result.translated_text.clone(),
            )
            .with_descriptor(current.clone());
        let mut proposed = self.round_trip(&request).await?;
        proposed.uses_storage |= result.uses_storage;
        Ok(self.advance(current, &proposed))
    }

    /// Final version describing `merged_text`
    ///
    /// # Errors
    /// [`DescriptorSyncError`] when the service fails or the reply holds no descriptor
    pub async fn finalize(
        &self,
        current: &StructuralDescriptor,
        merged_text: &str,
    ) -> Result<StructuralDescriptor, DescriptorSyncError> {
        let request = self
            .request(RequestKind::FinalizeStructure, merged_text)
            .with_descriptor(current.clone());
        let proposed = self.round_trip(&request).await?;
        Ok(self.advance(current, &proposed))
    }

    fn advance(
        &self,
        current: &StructuralDescriptor,
        proposed: &StructuralDescriptor,
    ) -> StructuralDescriptor {
        let next = current.absorb(proposed);
        debug_assert!(next.is_superset_of(current));
        debug!(
            "descriptor v{} -> v{} ({} types)",
            current.version,
            next.version,
            next.types.len()
        );
        next
    }

    fn request(&self, kind: RequestKind, text: impl Into<String>) -> TransformRequest {
        TransformRequest::new(kind, text).with_languages(self.source, self.target.clone())
    }

    async fn round_trip(
        &self,
        request: &TransformRequest,
    ) -> Result<StructuralDescriptor, DescriptorSyncError> {
        let reply = call_with_retry(self.service.as_ref(), request, &self.retry).await?;
        let decoded = self.decoder.decode_descriptor(&reply.text)?;
        metrics::counter!(DECODE_STRATEGY, "strategy" => decoded.strategy.as_str()).increment(1);
        Ok(decoded.value)
    }
}

/// At most `max_chars` characters of `text`: head, middle and tail windows
/// when it is longer
#[must_use]
pub fn structure_sample(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }
    let window = max_chars / 3;
    let middle_start = (total - window) / 2;
    let slice = |start: usize| -> String { text.chars().skip(start).take(window).collect() };
    [slice(0), slice(middle_start), slice(total - window)].join("\n...\n")
}
