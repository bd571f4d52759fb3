//! MIG Backend
//!
//! Contracts for the two external collaborators of a conversion, and an
//! HTTP adapter for the first:
//!
//! - [`TransformationService`]: request in, raw reply text out; no retries
//! - [`ContextLookup`]: supporting documents for a query
//! - [`ChatCompletionsService`]: OpenAI-compatible chat-completions client

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod chat;
mod context;
mod error;
mod request;
mod service;

pub use chat::{AuthScheme, ChatCompletionsService, ChatServiceConfig};
pub use context::{ContextLookup, ContextSnippet, NoContext, StaticContext};
pub use error::{Result, ServiceError};
pub use request::{RequestKind, TransformRequest};
pub use service::TransformationService;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
