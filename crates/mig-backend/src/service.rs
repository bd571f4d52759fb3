//! Transformation service contract

use crate::error::Result;
use crate::request::TransformRequest;
use async_trait::async_trait;
use std::sync::Arc;

/// External capability turning source text (plus context) into a reply
///
/// Implementations are stateless per call and never retry; retry and
/// timeout policy belong to the caller.
#[async_trait]
pub trait TransformationService: Send + Sync {
    /// Raw reply text for `request`
    async fn transform(&self, request: &TransformRequest) -> Result<String>;

    /// Service name (for logging)
    fn name(&self) -> &str {
        "transformation-service"
    }
}

#[async_trait]
impl<T: TransformationService + ?Sized> TransformationService for Arc<T> {
    async fn transform(&self, request: &TransformRequest) -> Result<String> {
        (**self).transform(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
