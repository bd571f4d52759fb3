//! MIG Core - conversion orchestrator
//!
//! Drives a legacy document through the whole modernization pipeline:
//! - Splits it into overlapping fragments
//! - Keeps a versioned structural descriptor in step with the translation
//! - Translates fragments in order through a [`TransformationService`]
//! - Merges, repairs and persists the result, resuming interrupted runs
//!
//! # Example
//!
//! ```rust,ignore
//! use mig_core::{ConversionPipeline, PipelineConfig};
//! use mig_backend::{ChatCompletionsService, ChatServiceConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = ChatCompletionsService::from_config(ChatServiceConfig::new(
//!     "https://example.openai.azure.com/openai/deployments/gpt/chat/completions",
//! ))?;
//! let pipeline = ConversionPipeline::new(PipelineConfig::new(), Arc::new(service))?;
//!
//! let source = std::fs::read_to_string("PAYROLL.cbl")?;
//! let outcome = pipeline.convert(&source, "Amounts are rounded half up").await?;
//! println!("{} issues", outcome.issues.len());
//! # Ok(())
//! # }
//! ```
//!
//! [`TransformationService`]: mig_backend::TransformationService

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod context;
pub mod descriptor_sync;
pub mod error;
pub mod orchestrator;
pub mod repair;
pub mod retry;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-exports for convenience
pub use config::{ContextSettings, PipelineConfig, RetryPolicy};
pub use context::{Gathered, SupportingContext};
pub use descriptor_sync::{structure_sample, DescriptorSync, DescriptorSyncError};
pub use error::{PipelineError, Result, StoreError};
pub use orchestrator::{rolling_context, ConversionPipeline};
pub use repair::{RepairPass, Repaired};
pub use retry::{call_with_retry, ServiceReply};
pub use store::{ConversionStore, FragmentRecord, MergedRecord};
pub use telemetry::init_tracing;
pub use types::{ConversionId, ConversionOutcome, ConversionRequest};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running conversions
    pub use crate::{
        ConversionId, ConversionOutcome, ConversionPipeline, ConversionRequest, PipelineConfig,
        PipelineError, RetryPolicy,
    };
    pub use mig_artifact::{Issue, IssueKind, StructuralDescriptor, TargetLanguage};
    pub use mig_backend::{ContextLookup, TransformationService};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use mig_test_utils::{cobol_program, ScriptedService};
    use std::sync::Arc;

    #[tokio::test]
    async fn single_fragment_skips_bootstrap() {
        let service = Arc::new(ScriptedService::converter());
        let pipeline =
            ConversionPipeline::new(PipelineConfig::new().in_memory(), service.clone()).unwrap();

        let outcome = pipeline
            .convert(&cobol_program("HELLO", 2), "")
            .await
            .unwrap();

        assert_eq!(outcome.fragment_count, 1);
        assert!(outcome.is_complete());
        assert!(outcome.merged_text.contains("class Hello"));
        let kinds: Vec<&str> = service.requests().iter().map(|r| r.kind.label()).collect();
        assert!(!kinds.contains(&"describe_structure"));
        assert!(kinds.contains(&"normalize"));
        assert!(pipeline.active_conversions().is_empty());
    }
}
