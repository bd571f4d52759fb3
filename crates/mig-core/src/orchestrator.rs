//! Conversion orchestrator
//!
//! Runs one conversion end to end:
//!
//! 1. Chunk the document into overlapping fragments
//! 2. Bootstrap the structural descriptor (multi-fragment documents only)
//! 3. Translate fragments strictly in order, each with the current
//!    descriptor, the last translated fragments and supporting context
//! 4. Fold each translation into the descriptor
//! 5. Merge, repair and finalize the descriptor
//!
//! Fragment records and every descriptor version are persisted as soon as
//! they exist, so a conversion restarted with the same identifier skips
//! fragments it already translated. A failed fragment becomes a placeholder
//! plus an issue; only a blank document or a run with no translated
//! fragment fails outright.

use crate::config::PipelineConfig;
use crate::context::SupportingContext;
use crate::descriptor_sync::DescriptorSync;
use crate::error::{PipelineError, Result};
use crate::repair::RepairPass;
use crate::retry::call_with_retry;
use crate::store::{ConversionStore, FragmentRecord};
use crate::telemetry::{
    CONVERSIONS, DECODE_STRATEGY, FRAGMENTS_FAILED, FRAGMENTS_RESUMED, FRAGMENTS_TRANSLATED,
};
use crate::types::{ConversionId, ConversionOutcome, ConversionRequest};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mig_artifact::{
    Fragment, FragmentResult, Issue, IssueKind, SourceDocument, SourceLanguage,
    StructuralDescriptor, TargetLanguage, DEFAULT_ARTIFACT_NAME,
};
use mig_backend::{
    ContextLookup, NoContext, RequestKind, TransformRequest, TransformationService,
};
use mig_chunker::Chunker;
use mig_composition::{check_fragment, MergeRegistry};
use mig_decode::{ResponseDecoder, TRUNCATED_ISSUE};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Fragment-to-artifact conversion pipeline
///
/// Independent conversions may run concurrently on one pipeline; the only
/// shared state is the registry of cancellation handles.
pub struct ConversionPipeline {
    config: PipelineConfig,
    service: Arc<dyn TransformationService>,
    context: SupportingContext,
    decoder: Arc<ResponseDecoder>,
    registry: MergeRegistry,
    active: DashMap<ConversionId, CancellationToken>,
}

impl std::fmt::Debug for ConversionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionPipeline")
            .field("config", &self.config)
            .field("service", &self.service.name())
            .field("active", &self.active.len())
            .finish_non_exhaustive()
    }
}

/// Everything a single run needs that does not change between fragments
struct RunContext<'a> {
    request: &'a ConversionRequest,
    source: SourceLanguage,
    target: TargetLanguage,
    fragment_count: usize,
}

impl ConversionPipeline {
    /// Pipeline over `service` with no supporting-context source
    ///
    /// # Errors
    /// [`PipelineError::Config`] when `config` is invalid
    pub fn new(config: PipelineConfig, service: Arc<dyn TransformationService>) -> Result<Self> {
        config.validate()?;
        let context = SupportingContext::new(Arc::new(NoContext), config.context.clone());
        let registry = MergeRegistry::new().with_forced_concatenation(config.force_concatenation);
        Ok(Self {
            config,
            service,
            context,
            decoder: Arc::new(ResponseDecoder::new()),
            registry,
            active: DashMap::new(),
        })
    }

    /// With a supporting-context source
    #[must_use]
    pub fn with_context_lookup(mut self, lookup: Arc<dyn ContextLookup>) -> Self {
        self.context = SupportingContext::new(lookup, self.config.context.clone());
        self
    }

    /// With a custom reply decoder
    #[must_use]
    pub fn with_decoder(mut self, decoder: ResponseDecoder) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Convert `document` under a fresh identifier
    ///
    /// # Errors
    /// [`PipelineError::EmptyDocument`] for a blank document,
    /// [`PipelineError::NoFragmentTranslated`] when every fragment failed
    pub async fn convert(
        &self,
        document: &str,
        domain_requirements: &str,
    ) -> Result<ConversionOutcome> {
        self.convert_request(ConversionRequest::new(document, domain_requirements))
            .await
    }

    /// Convert (or resume) `request`
    ///
    /// # Errors
    /// See [`ConversionPipeline::convert`]; additionally
    /// [`PipelineError::Cancelled`] when [`ConversionPipeline::cancel`] was
    /// called and [`PipelineError::AlreadyRunning`] when the identifier is in use
    pub async fn convert_request(&self, request: ConversionRequest) -> Result<ConversionOutcome> {
        let token = CancellationToken::new();
        match self.active.entry(request.id) {
            Entry::Occupied(_) => return Err(PipelineError::AlreadyRunning(request.id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
            }
        }
        let _registration = Registration {
            active: &self.active,
            id: request.id,
        };

        let outcome = self.run(&request, &token).await;
        let label = match &outcome {
            Ok(done) if done.is_complete() => "complete",
            Ok(_) => "partial",
            Err(PipelineError::Cancelled { .. }) => "cancelled",
            Err(_) => "failed",
        };
        metrics::counter!(CONVERSIONS, "outcome" => label).increment(1);
        outcome
    }

    /// Convert independent requests concurrently
    pub async fn convert_all(
        &self,
        requests: Vec<ConversionRequest>,
    ) -> Vec<Result<ConversionOutcome>> {
        futures::future::join_all(requests.into_iter().map(|r| self.convert_request(r))).await
    }

    /// Ask conversion `id` to stop before its next fragment
    ///
    /// Returns `false` when no such conversion is running.
    pub fn cancel(&self, id: ConversionId) -> bool {
        match self.active.get(&id) {
            Some(token) => {
                info!("cancellation requested for conversion {id}");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Identifiers of conversions in progress, oldest first
    #[must_use]
    pub fn active_conversions(&self) -> Vec<ConversionId> {
        let mut ids: Vec<ConversionId> = self.active.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    async fn run(
        &self,
        request: &ConversionRequest,
        token: &CancellationToken,
    ) -> Result<ConversionOutcome> {
        let document = SourceDocument::from_text(&request.document);
        if document.is_blank() {
            return Err(PipelineError::EmptyDocument);
        }
        let source = request
            .source
            .or(self.config.source)
            .unwrap_or_else(|| SourceLanguage::detect(&request.document));
        let target = request
            .target
            .clone()
            .unwrap_or_else(|| self.config.target.clone());
        let fragments =
            Chunker::new(self.config.chunker.clone().with_language(source))?.chunk(&document)?;
        let run = RunContext {
            request,
            source,
            target,
            fragment_count: fragments.len(),
        };
        info!(
            "conversion {}: {} lines in {} fragments, target {}",
            request.id,
            document.line_count(),
            run.fragment_count,
            run.target
        );

        let store = match &self.config.store_root {
            Some(root) => Some(ConversionStore::open(root, request.id).await?),
            None => None,
        };
        let sync = DescriptorSync::new(
            self.service.clone(),
            self.decoder.clone(),
            self.config.retry.clone(),
        )
        .with_sample_chars(self.config.structure_sample_chars)
        .with_languages(source, run.target.clone())
        .with_domain_requirements(request.domain_requirements.clone());

        let mut issues = Vec::new();
        let mut descriptor = self
            .initial_descriptor(&run, &document, &sync, store.as_ref(), &mut issues)
            .await?;

        let mut persisted = match &store {
            Some(store) => store.load_fragments().await?,
            None => BTreeMap::new(),
        };
        let mut converted: Vec<FragmentResult> = Vec::with_capacity(run.fragment_count);
        let mut resumed = 0;

        for fragment in &fragments {
            if token.is_cancelled() {
                info!(
                    "conversion {} cancelled before fragment {}",
                    request.id,
                    fragment.index + 1
                );
                return Err(PipelineError::Cancelled {
                    completed: converted.len(),
                });
            }

            if let Some(record) = persisted
                .remove(&fragment.index)
                .filter(|r| r.matches(fragment))
            {
                debug!("fragment {} restored from store", fragment.index + 1);
                metrics::counter!(FRAGMENTS_RESUMED).increment(1);
                resumed += 1;
                let result = record.into_result();
                issues.extend(fragment_issues(&result));
                converted.push(result);
                continue;
            }

            let result = self
                .translate_fragment(&run, fragment, &converted, &descriptor, &mut issues)
                .await;
            if result.failed {
                converted.push(result);
                continue;
            }
            issues.extend(fragment_issues(&result));
            if let Some(store) = &store {
                store
                    .save_fragment(&FragmentRecord::new(fragment, &result))
                    .await?;
            }
            match sync.merge(&descriptor, &result).await {
                Ok(next) => {
                    descriptor = next;
                    save_descriptor(store.as_ref(), &descriptor).await?;
                }
                Err(e) => {
                    warn!("descriptor update after fragment {} failed: {e}", fragment.index + 1);
                    issues.push(e.into_issue("descriptor update", Some(fragment.index)));
                }
            }
            converted.push(result);
        }

        let failed_fragments: Vec<usize> = converted
            .iter()
            .filter(|r| r.failed)
            .map(|r| r.fragment_index)
            .collect();
        if failed_fragments.len() == converted.len() {
            error!(
                "conversion {}: none of {} fragments was translated",
                request.id, run.fragment_count
            );
            return Err(PipelineError::NoFragmentTranslated {
                fragments: run.fragment_count,
                issues,
            });
        }

        let strategy = self.registry.select(&run.target);
        let merged = strategy.merge(&converted, &descriptor)?;
        info!(
            "merged {} fragments with {} strategy ({} chars)",
            converted.len(),
            strategy.name(),
            merged.text.len()
        );
        issues.extend(merged.issues);

        let repaired = RepairPass::new(
            self.service.clone(),
            self.config.retry.clone(),
            run.target.clone(),
        )
        .with_normalize(self.config.normalize)
        .with_source(source)
        .repair(&merged.text, &descriptor)
        .await;
        issues.extend(repaired.issues);

        match sync.finalize(&descriptor, &repaired.text).await {
            Ok(next) => {
                descriptor = next;
                save_descriptor(store.as_ref(), &descriptor).await?;
            }
            Err(e) => {
                warn!("final descriptor pass failed: {e}");
                issues.push(e.into_issue("final structure pass", None));
            }
        }

        if let Some(store) = &store {
            store
                .save_merged(&repaired.text, &issues, &merged.notes)
                .await?;
        }
        info!(
            "conversion {} finished: {} failed fragments, {} issues",
            request.id,
            failed_fragments.len(),
            issues.len()
        );

        Ok(ConversionOutcome {
            id: request.id,
            merged_text: repaired.text,
            uses_storage: merged.uses_storage || descriptor.uses_storage,
            descriptor,
            issues,
            notes: merged.notes,
            fragment_count: run.fragment_count,
            failed_fragments,
            resumed_fragments: resumed,
        })
    }

    /// Persisted descriptor, else a bootstrapped one, else an empty one
    async fn initial_descriptor(
        &self,
        run: &RunContext<'_>,
        document: &SourceDocument,
        sync: &DescriptorSync,
        store: Option<&ConversionStore>,
        issues: &mut Vec<Issue>,
    ) -> Result<StructuralDescriptor> {
        if let Some(store) = store {
            if let Some(persisted) = store.load_descriptor().await? {
                info!("resuming with descriptor v{}", persisted.version);
                return Ok(persisted);
            }
        }

        let artifact_name = document
            .program_id()
            .unwrap_or_else(|| DEFAULT_ARTIFACT_NAME.to_string());
        let descriptor = if run.fragment_count > 1 {
            match sync.bootstrap(&run.request.document, &artifact_name).await {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    warn!("structure bootstrap failed: {e}");
                    issues.push(e.into_issue("structure bootstrap", None));
                    StructuralDescriptor::empty(artifact_name)
                }
            }
        } else {
            StructuralDescriptor::empty(artifact_name)
        };
        save_descriptor(store, &descriptor).await?;
        Ok(descriptor)
    }

    /// Translate one fragment; failures yield a placeholder and an issue
    async fn translate_fragment(
        &self,
        run: &RunContext<'_>,
        fragment: &Fragment,
        converted: &[FragmentResult],
        descriptor: &StructuralDescriptor,
        issues: &mut Vec<Issue>,
    ) -> FragmentResult {
        let index = fragment.index;
        let gathered = self.context.gather(&fragment.text, index).await;
        issues.extend(gathered.issue);

        let request = TransformRequest::new(
            RequestKind::Translate {
                fragment_index: index,
                fragment_count: run.fragment_count,
            },
            fragment.text.clone(),
        )
        .with_rolling_context(rolling_context(
            converted,
            self.config.rolling_context_fragments,
        ))
        .with_descriptor(descriptor.clone())
        .with_domain_requirements(run.request.domain_requirements.clone())
        .with_supporting_context(gathered.snippets)
        .with_languages(run.source, run.target.clone());
        debug!(
            "translating fragment {}/{} ({} bytes, lines {:?})",
            index + 1,
            run.fragment_count,
            fragment.size(),
            fragment.lines()
        );

        let reply = match call_with_retry(self.service.as_ref(), &request, &self.config.retry).await
        {
            Ok(reply) => reply,
            Err(e) => {
                error!("fragment {} failed: {e}", index + 1);
                metrics::counter!(FRAGMENTS_FAILED).increment(1);
                issues.push(Issue::for_fragment(
                    IssueKind::TransportFailure,
                    index,
                    format!("translation failed after retries: {e}"),
                ));
                return FragmentResult::placeholder(index, &e.to_string());
            }
        };

        match self.decoder.decode_fragment(&reply.text, index) {
            Ok(decoded) => {
                metrics::counter!(DECODE_STRATEGY, "strategy" => decoded.strategy.as_str())
                    .increment(1);
                metrics::counter!(FRAGMENTS_TRANSLATED).increment(1);
                let mut result = decoded.value;
                result.issues.extend(check_fragment(&result.translated_text));
                debug!(
                    "fragment {} translated via {} in {} attempts",
                    index + 1,
                    decoded.strategy,
                    reply.attempts
                );
                result
            }
            Err(failure) => {
                error!("fragment {} reply undecodable: {failure}", index + 1);
                metrics::counter!(FRAGMENTS_FAILED).increment(1);
                issues.push(Issue::for_fragment(
                    IssueKind::DecodeFailure,
                    index,
                    failure.to_string(),
                ));
                FragmentResult::placeholder(index, "reply could not be decoded")
            }
        }
    }
}

/// Removes a conversion from the active registry when its run ends
struct Registration<'a> {
    active: &'a DashMap<ConversionId, CancellationToken>,
    id: ConversionId,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.active.remove(&self.id);
    }
}

async fn save_descriptor(
    store: Option<&ConversionStore>,
    descriptor: &StructuralDescriptor,
) -> Result<()> {
    if let Some(store) = store {
        store.save_descriptor(descriptor).await?;
    }
    Ok(())
}

/// Translated text of the last `fragments` successful results
#[must_use]
pub fn rolling_context(converted: &[FragmentResult], fragments: usize) -> String {
    let mut recent: Vec<&str> = converted
        .iter()
        .rev()
        .filter(|r| !r.failed)
        .take(fragments)
        .map(|r| r.translated_text.as_str())
        .collect();
    recent.reverse();
    recent.join("\n\n")
}

/// Issues carried by a translated fragment's own issue list
fn fragment_issues(result: &FragmentResult) -> Vec<Issue> {
    result
        .issues
        .iter()
        .map(|text| {
            let kind = if text == TRUNCATED_ISSUE {
                IssueKind::ResponseTruncated
            } else if text.starts_with("Mismatched braces") {
                IssueKind::UnbalancedDelimiters
            } else if text.starts_with("Incomplete exception handling") {
                IssueKind::IncompleteErrorHandling
            } else {
                IssueKind::ServiceReported
            };
            Issue::for_fragment(kind, result.fragment_index, text.clone())
        })
        .collect()
}
