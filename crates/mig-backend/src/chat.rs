//! Chat-completions adapter
//!
//! Implements [`TransformationService`] against an OpenAI-compatible
//! `chat/completions` endpoint (Azure deployments included). One request
//! per call, no retries.

use crate::error::{Result, ServiceError};
use crate::request::{RequestKind, TransformRequest};
use crate::service::TransformationService;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// How the API key is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `api-key: <key>` (Azure)
    #[default]
    ApiKeyHeader,
    /// `Authorization: Bearer <key>`
    Bearer,
}

/// Adapter configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatServiceConfig {
    /// Full `chat/completions` URL
    pub endpoint: String,
    /// API key, if the endpoint needs one
    pub api_key: Option<String>,
    /// Header used for the key
    pub auth: AuthScheme,
    /// Model or deployment name sent in the body
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion budget per call
    pub max_tokens: u32,
    /// Connection timeout
    pub connect_timeout_ms: u64,
    /// Whole-request timeout
    pub request_timeout_ms: u64,
}

impl Default for ChatServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: None,
            auth: AuthScheme::default(),
            model: None,
            temperature: 0.1,
            max_tokens: 4_000,
            connect_timeout_ms: 5_000,
            request_timeout_ms: 120_000,
        }
    }
}

impl fmt::Debug for ChatServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("has_api_key", &self.api_key.is_some())
            .field("auth", &self.auth)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl ChatServiceConfig {
    /// Config for `endpoint` with default settings
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the API key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>, auth: AuthScheme) -> Self {
        self.api_key = Some(key.into());
        self.auth = auth;
        self
    }

    /// Set the model or deployment name
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the completion budget
    #[inline]
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the request timeout
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// [`TransformationService`] over HTTP chat completions
pub struct ChatCompletionsService {
    client: Client,
    config: ChatServiceConfig,
}

impl fmt::Debug for ChatCompletionsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionsService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsService {
    /// Build the adapter
    ///
    /// # Errors
    /// [`ServiceError::InvalidConfig`] when the endpoint is missing or the
    /// HTTP client cannot be built
    pub fn from_config(config: ChatServiceConfig) -> Result<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(ServiceError::invalid_config("missing endpoint"));
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ServiceError::invalid_config(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &ChatServiceConfig {
        &self.config
    }

    /// JSON body for `request`
    #[must_use]
    pub fn request_body(&self, request: &TransformRequest) -> Value {
        let mut body = json!({
            "messages": messages(request),
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });
        if let Some(model) = &self.config.model {
            body["model"] = json!(model);
        }
        if request.kind.expects_json() {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl TransformationService for ChatCompletionsService {
    async fn transform(&self, request: &TransformRequest) -> Result<String> {
        let mut http = self
            .client
            .post(&self.config.endpoint)
            .json(&self.request_body(request));
        if let Some(key) = &self.config.api_key {
            http = match self.config.auth {
                AuthScheme::ApiKeyHeader => http.header("api-key", key),
                AuthScheme::Bearer => http.bearer_auth(key),
            };
        }

        debug!("sending {} ({} chars)", request.kind, request.text.len());
        let response = http.send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout(Duration::from_millis(self.config.request_timeout_ms))
            } else {
                ServiceError::transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::status(status.as_u16(), &body));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::transport(format!("unreadable completion: {e}")))?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            return Err(ServiceError::EmptyReply);
        }
        debug!("{} replied with {} chars", request.kind, content.len());
        Ok(content)
    }

    fn name(&self) -> &str {
        "chat-completions"
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// System and user messages for `request`
fn messages(request: &TransformRequest) -> Value {
    let source = format!("{:?}", request.source_language).to_uppercase();
    let target = request.target_language.to_string();
    let system = match request.kind {
        RequestKind::Normalize => format!(
            "You are an expert {target} developer. Fix syntax and formatting only; \
             do not add business logic. Return only the corrected code."
        ),
        _ => format!(
            "You are an expert code converter specializing in {source} to {target} migration."
        ),
    };

    let mut sections = vec![instruction(request.kind, &target)];
    if !request.domain_requirements.trim().is_empty() {
        sections.push(format!("Business requirements:\n{}", request.domain_requirements));
    }
    if let Some(descriptor) = &request.descriptor {
        if let Ok(json) = descriptor.to_json_pretty() {
            sections.push(format!("Target structure:\n{json}"));
        }
    }
    if !request.rolling_context.trim().is_empty() {
        sections.push(format!(
            "Previously converted code (for continuity):\n{}",
            request.rolling_context
        ));
    }
    for snippet in &request.supporting_context {
        sections.push(format!("Reference ({}):\n{}", snippet.source_label, snippet.text));
    }
    let fence = match request.kind {
        RequestKind::Translate { .. } | RequestKind::DescribeStructure => "",
        _ => request.target_language.fence_tag(),
    };
    sections.push(format!("```{fence}\n{}\n```", request.text));

    json!([
        { "role": "system", "content": system },
        { "role": "user", "content": sections.join("\n\n") },
    ])
}

fn instruction(kind: RequestKind, target: &str) -> String {
    match kind {
        RequestKind::Translate {
            fragment_index,
            fragment_count,
        } => format!(
            "Convert part {} of {} of the following source to {target}. Respond with JSON: \
             {{\"convertedCode\": string, \"conversionNotes\": string, \
             \"potentialIssues\": [string], \"databaseUsed\": bool}}.",
            fragment_index + 1,
            fragment_count
        ),
        RequestKind::DescribeStructure => format!(
            "Design the {target} target structure for the following source. Respond with JSON: \
             {{\"project_name\", \"namespaces\", \"classes\": [{{\"name\", \"type\", \
             \"access_modifier\", \"inherits\", \"implements\", \"methods\", \"fields\"}}], \
             \"database_access\", \"patterns\", \"exception_strategy\"}}."
        ),
        RequestKind::UpdateStructure { .. } => format!(
            "Update the target structure with the classes and members of this {target} code. \
             Keep every existing entry. Respond with the full structure as JSON."
        ),
        RequestKind::FinalizeStructure => format!(
            "Produce the final target structure for this merged {target} code. \
             Keep every existing entry. Respond with the full structure as JSON."
        ),
        RequestKind::Normalize => {
            "Normalize formatting and fix syntax errors in the following code.".to_string()
        }
    }
}
