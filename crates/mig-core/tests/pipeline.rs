//! End-to-end conversions against a scripted transformation service

use mig_artifact::{IssueKind, SourceDocument, TargetLanguage};
use mig_backend::{RequestKind, ServiceError};
use mig_chunker::{Chunker, ChunkerConfig};
use mig_core::{
    ConversionId, ConversionPipeline, ConversionRequest, ConversionStore, PipelineConfig,
    PipelineError, RetryPolicy,
};
use mig_test_utils::{
    cobol_program, init_test_tracing, paragraphs, pascal_case, translation_reply, Reply,
    ScriptedService,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn chunker_config() -> ChunkerConfig {
    ChunkerConfig::new(2_000, 100)
}

fn config(root: &Path) -> PipelineConfig {
    PipelineConfig::new()
        .with_chunker(chunker_config())
        .with_retry(RetryPolicy::new(2, Duration::from_millis(300)))
        .with_store_root(root)
}

fn ledger() -> String {
    cobol_program("LEDGER", 14)
}

/// Paragraph names of each fragment the pipeline will see
fn fragment_paragraphs(document: &str) -> Vec<Vec<String>> {
    Chunker::new(chunker_config())
        .unwrap()
        .chunk(&SourceDocument::from_text(document))
        .unwrap()
        .iter()
        .map(|f| paragraphs(&f.text))
        .collect()
}

fn is_translate(request: &mig_backend::TransformRequest, index: usize) -> bool {
    matches!(request.kind, RequestKind::Translate { fragment_index, .. } if fragment_index == index)
}

#[tokio::test]
async fn timeout_on_middle_fragment_keeps_neighbours() -> anyhow::Result<()> {
    init_test_tracing();
    let dir = tempfile::tempdir()?;
    let document = ledger();
    let expected = fragment_paragraphs(&document);
    assert!(expected.len() >= 3, "fixture must span at least 3 fragments");

    let service = Arc::new(ScriptedService::converter_with(|request| {
        is_translate(request, 1).then(Reply::hang)
    }));
    let pipeline = ConversionPipeline::new(config(dir.path()), service.clone())?;
    let outcome = pipeline.convert(&document, "").await?;

    assert_eq!(outcome.fragment_count, expected.len());
    assert_eq!(outcome.failed_fragments, vec![1]);
    let first = pascal_case(&expected[0][0]);
    let last = pascal_case(expected.last().and_then(|p| p.last()).unwrap());
    assert!(outcome.merged_text.contains(&format!("public void {first}()")));
    assert!(outcome.merged_text.contains(&format!("public void {last}()")));
    assert!(outcome
        .merged_text
        .contains("fragment 2 could not be converted"));

    let timeouts: Vec<_> = outcome
        .issues
        .iter()
        .filter(|i| i.kind == IssueKind::TransportFailure)
        .collect();
    assert_eq!(timeouts.len(), 1);
    assert_eq!(timeouts[0].fragment, Some(1));
    assert!(timeouts[0].detail.contains("timed out"));

    // two attempts for the hanging fragment, one for each of the others
    let attempts = service.translated_fragments();
    assert_eq!(attempts.iter().filter(|&&i| i == 1).count(), 2);
    assert_eq!(attempts.len(), expected.len() + 1);
    Ok(())
}

#[tokio::test]
async fn every_fragment_sees_the_current_descriptor_and_rolling_context() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let service = Arc::new(ScriptedService::converter());
    let pipeline = ConversionPipeline::new(config(dir.path()), service.clone())?;
    let outcome = pipeline.convert(&ledger(), "totals are rounded half up").await?;

    let translations: Vec<_> = service
        .requests()
        .into_iter()
        .filter(|r| matches!(r.kind, RequestKind::Translate { .. }))
        .collect();
    assert!(translations[0].rolling_context.is_empty());
    assert!(translations[1].rolling_context.contains("public class Ledger"));
    assert!(translations
        .iter()
        .all(|r| r.domain_requirements == "totals are rounded half up"));
    // descriptor versions only grow from one fragment to the next
    let versions: Vec<u64> = translations
        .iter()
        .map(|r| r.descriptor.as_ref().map_or(0, |d| d.version))
        .collect();
    assert!(versions.windows(2).all(|w| w[0] < w[1]));

    assert!(outcome.is_complete());
    let ledger = outcome.descriptor.find_type("Ledger").unwrap();
    assert!(ledger.methods.iter().any(|m| m.name == "Para0000"));
    assert_eq!(service.count("describe_structure"), 1);
    assert_eq!(service.count("finalize_structure"), 1);
    assert_eq!(service.count("normalize"), 1);
    Ok(())
}

#[tokio::test]
async fn descriptor_failure_keeps_previous_version() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let service = Arc::new(ScriptedService::converter_with(|request| {
        matches!(request.kind, RequestKind::UpdateStructure { fragment_index: 1 })
            .then(|| Reply::text("I could not produce a structure this time."))
    }));
    let pipeline = ConversionPipeline::new(config(dir.path()), service.clone())?;
    let outcome = pipeline.convert(&ledger(), "").await?;

    let update_issues: Vec<_> = outcome
        .issues
        .iter()
        .filter(|i| i.kind == IssueKind::DescriptorUpdate)
        .collect();
    assert_eq!(update_issues.len(), 1);
    assert_eq!(update_issues[0].fragment, Some(1));

    // fragment 3 was translated against the version produced after fragment 1
    let translations: Vec<_> = service
        .requests()
        .into_iter()
        .filter(|r| matches!(r.kind, RequestKind::Translate { .. }))
        .collect();
    let v1 = translations[1].descriptor.as_ref().unwrap();
    let v2 = translations[2].descriptor.as_ref().unwrap();
    assert_eq!(v1, v2);
    assert!(outcome.is_complete());
    Ok(())
}

#[tokio::test]
async fn truncated_reply_is_salvaged_with_an_issue() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let service = Arc::new(ScriptedService::converter_with(|request| {
        is_translate(request, 0).then(|| {
            let full = translation_reply(
                "public class Ledger\n{\n    public void Para0000()\n    {\n        Console.WriteLine(\"x\");\n    }\n}\n",
            );
            let cut: String = full.chars().take(full.find("Console").unwrap_or(full.len())).collect();
            Reply::text(cut)
        })
    }));
    let pipeline = ConversionPipeline::new(config(dir.path()), service)?;
    let outcome = pipeline.convert(&ledger(), "").await?;

    assert!(!outcome.failed_fragments.contains(&0));
    assert!(outcome
        .issues
        .iter()
        .any(|i| i.kind == IssueKind::ResponseTruncated && i.fragment == Some(0)));
    Ok(())
}

#[tokio::test]
async fn all_fragments_failing_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let service = Arc::new(ScriptedService::converter_with(|request| {
        matches!(request.kind, RequestKind::Translate { .. })
            .then(|| Reply::error(ServiceError::status(400, "content filtered")))
    }));
    let pipeline = ConversionPipeline::new(config(dir.path()), service.clone()).unwrap();
    let err = pipeline.convert(&ledger(), "").await.unwrap_err();

    match err {
        PipelineError::NoFragmentTranslated { fragments, issues } => {
            assert_eq!(fragments, fragment_paragraphs(&ledger()).len());
            assert_eq!(issues.len(), fragments);
            assert!(issues.iter().all(|i| i.kind == IssueKind::TransportFailure));
        }
        other => panic!("unexpected error: {other}"),
    }
    // non-retryable status: one attempt per fragment, nothing merged or normalized
    assert_eq!(service.count("translate"), fragment_paragraphs(&ledger()).len());
    assert_eq!(service.count("normalize"), 0);
}

#[tokio::test]
async fn blank_document_is_rejected() {
    let service = Arc::new(ScriptedService::converter());
    let pipeline =
        ConversionPipeline::new(PipelineConfig::new().in_memory(), service.clone()).unwrap();
    let err = pipeline.convert("  \n\t\n", "").await.unwrap_err();
    assert!(matches!(err, PipelineError::EmptyDocument));
    assert!(service.requests().is_empty());
}

#[tokio::test]
async fn cancelled_conversion_resumes_without_retranslating() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let document = ledger();
    let fragments = fragment_paragraphs(&document).len();
    let slow = Arc::new(ScriptedService::converter_with(|request| {
        matches!(request.kind, RequestKind::Translate { .. })
            .then(|| Reply::after(Duration::from_millis(150), Reply::text(mig_test_utils::convert(request))))
    }));
    let pipeline = Arc::new(ConversionPipeline::new(config(dir.path()), slow.clone())?);
    let id = ConversionId::new();
    let request = ConversionRequest::new(document.clone(), "").with_id(id);

    let running = tokio::spawn({
        let pipeline = pipeline.clone();
        let request = request.clone();
        async move { pipeline.convert_request(request).await }
    });
    while pipeline.active_conversions().is_empty() {
        tokio::task::yield_now().await;
    }
    assert_eq!(pipeline.active_conversions(), vec![id]);
    let duplicate = pipeline.convert_request(request.clone()).await;
    assert!(matches!(duplicate, Err(PipelineError::AlreadyRunning(_))));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(pipeline.cancel(id));
    let completed = match running.await? {
        Err(PipelineError::Cancelled { completed }) => completed,
        other => panic!("expected cancellation, got {other:?}"),
    };
    assert!(completed >= 1 && completed < fragments);
    // the fragment in flight when cancel was called still finished
    assert_eq!(slow.translated_fragments().len(), completed);
    assert!(pipeline.active_conversions().is_empty());
    assert!(!pipeline.cancel(id));

    let fresh = Arc::new(ScriptedService::converter());
    let resumed = ConversionPipeline::new(config(dir.path()), fresh.clone())?
        .convert_request(request)
        .await?;
    assert_eq!(resumed.resumed_fragments, completed);
    assert_eq!(
        fresh.translated_fragments(),
        (completed..fragments).collect::<Vec<_>>()
    );
    assert_eq!(fresh.count("describe_structure"), 0);
    assert!(resumed.is_complete());

    let store = ConversionStore::open(dir.path(), id).await?;
    assert_eq!(store.load_fragments().await?.len(), fragments);
    let merged = store.load_merged().await?.unwrap();
    assert_eq!(merged.text, resumed.merged_text);
    Ok(())
}

#[tokio::test]
async fn non_object_oriented_target_is_concatenated() -> anyhow::Result<()> {
    let service = Arc::new(ScriptedService::converter());
    let pipeline = ConversionPipeline::new(
        PipelineConfig::new()
            .in_memory()
            .with_chunker(chunker_config())
            .with_target(TargetLanguage::Other("python".into()))
            .with_normalize(false),
        service,
    )?;
    let outcome = pipeline.convert(&ledger(), "").await?;
    assert!(outcome.merged_text.starts_with("// ----- Fragment 1 -----"));
    assert!(outcome.merged_text.contains("// ----- Fragment 3 -----"));
    Ok(())
}

#[tokio::test]
async fn independent_conversions_run_together() -> anyhow::Result<()> {
    let service = Arc::new(ScriptedService::converter());
    let pipeline = ConversionPipeline::new(PipelineConfig::new().in_memory(), service)?;
    let results = pipeline
        .convert_all(vec![
            ConversionRequest::new(cobol_program("ALPHA", 2), ""),
            ConversionRequest::new("", ""),
            ConversionRequest::new(cobol_program("BETA", 2), ""),
        ])
        .await;
    assert!(results[0].as_ref().is_ok_and(|o| o.merged_text.contains("class Alpha")));
    assert!(matches!(results[1], Err(PipelineError::EmptyDocument)));
    assert!(results[2].as_ref().is_ok_and(|o| o.merged_text.contains("class Beta")));
    Ok(())
}
