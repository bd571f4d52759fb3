//! Bounded retry with a per-attempt deadline
//!
//! The service adapter never retries on its own; every call the pipeline
//! makes goes through [`call_with_retry`], which repeats the same request
//! while the failure is retryable and attempts remain.

use crate::config::RetryPolicy;
use crate::telemetry::SERVICE_RETRIES;
use mig_backend::{ServiceError, TransformRequest, TransformationService};
use tracing::{debug, warn};

/// Reply text plus how many attempts it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReply {
    pub text: String,
    pub attempts: u32,
}

/// Call `service` with `request` under `policy`
///
/// # Errors
/// The last [`ServiceError`] once attempts are exhausted, or the first
/// non-retryable one
pub async fn call_with_retry<S>(
    service: &S,
    request: &TransformRequest,
    policy: &RetryPolicy,
) -> Result<ServiceReply, ServiceError>
where
    S: TransformationService + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = match tokio::time::timeout(policy.timeout(), service.transform(request)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(ServiceError::Timeout(policy.timeout())),
        };

        match outcome {
            Ok(text) => {
                debug!("{} succeeded on attempt {attempt}", request.kind);
                return Ok(ServiceReply {
                    text,
                    attempts: attempt,
                });
            }
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                warn!(
                    "{} attempt {attempt}/{max_attempts} failed: {err}; retrying",
                    request.kind
                );
                metrics::counter!(SERVICE_RETRIES, "kind" => request.kind.label()).increment(1);
                if !policy.backoff().is_zero() {
                    tokio::time::sleep(policy.backoff()).await;
                }
            }
            Err(err) => {
                warn!("{} gave up after {attempt} attempts: {err}", request.kind);
                return Err(err);
            }
        }
    }
}
