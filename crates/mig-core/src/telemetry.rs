//! Logging setup and metric names
//!
//! The pipeline only emits `tracing` events and `metrics` counters; an
//! embedding application decides where they go. [`init_tracing`] is a
//! convenience for binaries and tests that just want log lines on stderr.

use tracing_subscriber::EnvFilter;

/// Fragments translated by the service
pub const FRAGMENTS_TRANSLATED: &str = "mig_fragments_translated_total";
/// Fragments replaced by a placeholder
pub const FRAGMENTS_FAILED: &str = "mig_fragments_failed_total";
/// Fragments taken from persisted state
pub const FRAGMENTS_RESUMED: &str = "mig_fragments_resumed_total";
/// Decoded replies, labelled by winning strategy
pub const DECODE_STRATEGY: &str = "mig_decode_strategy_total";
/// Service attempts repeated after a retryable failure
pub const SERVICE_RETRIES: &str = "mig_service_retries_total";
/// Normalization passes, labelled accepted or rejected
pub const REPAIRS: &str = "mig_repairs_total";
/// Conversions that ended, labelled by outcome
pub const CONVERSIONS: &str = "mig_conversions_total";

/// Install a formatting subscriber filtered by `RUST_LOG`
///
/// Falls back to `default_directive` (e.g. `"mig_core=info"`) when
/// `RUST_LOG` is unset. Returns `false` if a global subscriber was already
/// installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Like [`init_tracing`], emitting one JSON object per event
pub fn init_json_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
