//! OpenAI Provider - Implementation of AIProvider for OpenAI-compatible APIs.
//!
//! Works against any `/chat/completions` endpoint (OpenAI, OpenRouter, local
//! gateways). The provider only classifies failures; retries and backoff are
//! the completion gateway's job.
//!
//! # Configuration
//!
//! ```ignore
//! let config = OpenAIConfig::new(api_key)
//!     .with_model("gpt-4o-mini")
//!     .with_base_url("https://api.openai.com/v1");
//!
//! let provider = OpenAIProvider::new(config)?;
//! ```
//!
//! # Error classification
//!
//! | Signal | Kind |
//! |---|---|
//! | 401 | `Unauthorized` |
//! | 402 | `PaymentRequired` |
//! | 429 | `TooManyRequests` |
//! | 400 mentioning the context length | `MaxContentLengthReached` |
//! | TLS certificate failure | `InvalidCertificate` |
//! | no content and no tool call | `EmptyContent` |
//! | undecodable body, timeout | `MalformedCompletion` |
//! | anything else | `Unhandled` |
//!
//! Some gateways answer `200 OK` with an `{"error": {"code": ...}}` body;
//! the embedded code is classified the same way as a status.

use async_trait::async_trait;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use std::time::Duration;

use crate::ports::{
    AIError, AIProvider, CompletionErrorKind, CompletionRequest, CompletionResponse, ProviderInfo,
    TokenUsage,
};

/// Configuration for the OpenAI provider.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API key for authentication.
    api_key: Secret<String>,
    /// Model used when a request does not name one.
    pub model: String,
    /// Base URL for the API (default: https://api.openai.com/v1).
    pub base_url: String,
    /// HTTP request timeout.
    pub timeout: Duration,
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(api_key.into()),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout: Duration::from_secs(90),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// OpenAI-compatible API provider implementation.
pub struct OpenAIProvider {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIProvider {
    /// Creates a new provider.
    ///
    /// # Errors
    ///
    /// `Unhandled` if the HTTP client cannot be built.
    pub fn new(config: OpenAIConfig) -> Result<Self, AIError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AIError::Unhandled(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn to_openai_request(&self, request: &CompletionRequest) -> OpenAIRequest {
        let model = if request.model.trim().is_empty() {
            self.config.model.clone()
        } else {
            request.model.clone()
        };

        OpenAIRequest {
            model,
            messages: request
                .messages
                .iter()
                .map(|msg| OpenAIMessage {
                    role: msg.role.as_str().to_string(),
                    content: msg.content.clone(),
                })
                .collect(),
            temperature: request.temperature,
            top_p: request.top_p,
        }
    }

    async fn send_request(&self, request: &CompletionRequest) -> Result<Response, AIError> {
        self.client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("Content-Type", "application/json")
            .json(&self.to_openai_request(request))
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))
    }

    async fn parse_response(&self, response: Response) -> Result<CompletionResponse, AIError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AIError::malformed(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &body));
        }

        parse_completion_body(&body)
    }
}

#[async_trait]
impl AIProvider for OpenAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let response = self.send_request(&request).await?;
        self.parse_response(response).await
    }

    fn provider_info(&self) -> ProviderInfo {
        ProviderInfo::new("openai", &self.config.model)
    }
}

fn classify_transport_error(error: &reqwest::Error) -> AIError {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        chain.push_str(": ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }

    if chain.to_lowercase().contains("certificate") {
        AIError::InvalidCertificate(chain)
    } else if error.is_timeout() {
        AIError::malformed(format!("Request timed out: {}", chain))
    } else {
        AIError::Unhandled(chain)
    }
}

/// Maps an HTTP status (or an embedded error code) to a completion error.
fn classify_status(status: u16, body: &str) -> AIError {
    let kind = match status {
        401 => CompletionErrorKind::Unauthorized,
        402 => CompletionErrorKind::PaymentRequired,
        429 => CompletionErrorKind::TooManyRequests,
        400 | 413 if mentions_context_length(body) => CompletionErrorKind::MaxContentLengthReached,
        _ => CompletionErrorKind::Unhandled,
    };
    AIError::new(kind, format!("status {}: {}", status, body))
}

fn mentions_context_length(body: &str) -> bool {
    let body = body.to_lowercase();
    body.contains("maximum context length")
        || body.contains("context_length_exceeded")
        || body.contains("context length")
}

fn parse_completion_body(body: &str) -> Result<CompletionResponse, AIError> {
    let parsed: OpenAIResponse = serde_json::from_str(body)
        .map_err(|e| AIError::malformed(format!("Failed to parse response: {}", e)))?;

    if let Some(error) = parsed.error {
        let code = match &error.code {
            Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|c| u16::try_from(c).ok()),
            Some(serde_json::Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        return Err(classify_status(code.unwrap_or(0), &error.message));
    }

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AIError::malformed("No choices in response"))?;

    let usage = parsed
        .usage
        .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();
    let model = parsed.model.unwrap_or_default();

    if let Some(call) = choice.message.tool_calls.into_iter().flatten().next() {
        let mut response = CompletionResponse::structured(
            serde_json::json!({
                "function": call.function.name,
                "arguments": call.function.arguments,
            }),
            model,
        );
        response.usage = usage;
        return Ok(response);
    }

    match choice.message.content {
        Some(content) if !content.trim().is_empty() => {
            let mut response = CompletionResponse::text(content, model);
            response.usage = usage;
            Ok(response)
        }
        _ => Err(AIError::EmptyContent),
    }
}

// ----- OpenAI API Types -----

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
    error: Option<OpenAIErrorBody>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCall {
    function: OpenAIFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    /// JSON-encoded argument object.
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorBody {
    #[serde(default)]
    message: String,
    code: Option<serde_json::Value>,
}
