//! AI Provider Port - Interface for completion backend integrations.
//!
//! This port abstracts the single generative call the conversation engine
//! makes, so handlers can run against OpenAI-compatible services or a
//! scripted mock without coupling to either.
//!
//! # Design
//!
//! - One non-streaming completion per call; retries live in the
//!   application's completion gateway, never in an adapter
//! - Success carries either raw text or an already structured value
//! - Failures are classified into a closed taxonomy ([`CompletionErrorKind`])
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//!
//! struct EchoProvider;
//!
//! #[async_trait]
//! impl AIProvider for EchoProvider {
//!     async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
//!         let last = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
//!         Ok(CompletionResponse::text(last, "echo"))
//!     }
//!
//!     fn provider_info(&self) -> ProviderInfo {
//!         ProviderInfo::new("echo", "echo")
//!     }
//! }
//! ```

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use crate::domain::conversation::{Message, MessageRole};

/// Port for completion backend interactions.
#[async_trait]
pub trait AIProvider: Send + Sync {
    /// Generate a single completion.
    ///
    /// Implementations classify failures but never retry.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError>;

    /// Get provider information (name, default model).
    fn provider_info(&self) -> ProviderInfo;
}

/// Request for a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Ordered, role-tagged messages.
    pub messages: Vec<Message>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling mass.
    pub top_p: f32,
}

impl CompletionRequest {
    /// Creates a request with neutral sampling parameters.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 1.0,
            top_p: 1.0,
        }
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets top_p.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }
}

/// Payload of a successful completion.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionContent {
    /// Free text that may embed a `<function=...>` block.
    Text(String),
    /// A value the backend already structured, e.g. from `tool_calls`.
    Structured(serde_json::Value),
}

impl CompletionContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) => None,
        }
    }

    /// Whether there is nothing usable in the payload.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Structured(value) => value.is_null(),
        }
    }
}

/// Response from a completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// Generated content.
    pub content: CompletionContent,
    /// Model that generated the response.
    pub model: String,
    /// Token usage, when reported.
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Creates a text response with zero usage.
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: CompletionContent::Text(content.into()),
            model: model.into(),
            usage: TokenUsage::default(),
        }
    }

    /// Creates a structured response with zero usage.
    pub fn structured(value: serde_json::Value, model: impl Into<String>) -> Self {
        Self {
            content: CompletionContent::Structured(value),
            model: model.into(),
            usage: TokenUsage::default(),
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion).
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Provider information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name (e.g., "openai", "mock").
    pub name: String,
    /// Default model identifier.
    pub model: String,
}

impl ProviderInfo {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

/// Closed classification of completion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionErrorKind {
    TooManyRequests,
    Unauthorized,
    PaymentRequired,
    InvalidCertificate,
    MaxContentLengthReached,
    EmptyContent,
    MalformedCompletion,
    Unhandled,
}

impl CompletionErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooManyRequests => "too_many_requests",
            Self::Unauthorized => "unauthorized",
            Self::PaymentRequired => "payment_required",
            Self::InvalidCertificate => "invalid_certificate",
            Self::MaxContentLengthReached => "max_content_length_reached",
            Self::EmptyContent => "empty_content",
            Self::MalformedCompletion => "malformed_completion",
            Self::Unhandled => "unhandled",
        }
    }
}

impl fmt::Display for CompletionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion backend errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AIError {
    /// Rate limited by the backend.
    #[error("too many requests: {0}")]
    TooManyRequests(String),

    /// Credentials rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The account cannot pay for the request.
    #[error("payment required: {0}")]
    PaymentRequired(String),

    /// TLS verification failed.
    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    /// The prompt exceeds the model's context window.
    #[error("max content length reached: {0}")]
    MaxContentLengthReached(String),

    /// The backend answered with nothing.
    #[error("completion was empty")]
    EmptyContent,

    /// The backend answered with something that is not a completion.
    #[error("malformed completion: {0}")]
    MalformedCompletion(String),

    /// Any other failure.
    #[error("unhandled completion error: {0}")]
    Unhandled(String),
}

impl AIError {
    /// Creates an error of `kind` carrying `detail`.
    pub fn new(kind: CompletionErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match kind {
            CompletionErrorKind::TooManyRequests => Self::TooManyRequests(detail),
            CompletionErrorKind::Unauthorized => Self::Unauthorized(detail),
            CompletionErrorKind::PaymentRequired => Self::PaymentRequired(detail),
            CompletionErrorKind::InvalidCertificate => Self::InvalidCertificate(detail),
            CompletionErrorKind::MaxContentLengthReached => Self::MaxContentLengthReached(detail),
            CompletionErrorKind::EmptyContent => Self::EmptyContent,
            CompletionErrorKind::MalformedCompletion => Self::MalformedCompletion(detail),
            CompletionErrorKind::Unhandled => Self::Unhandled(detail),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedCompletion(detail.into())
    }

    pub fn kind(&self) -> CompletionErrorKind {
        match self {
            Self::TooManyRequests(_) => CompletionErrorKind::TooManyRequests,
            Self::Unauthorized(_) => CompletionErrorKind::Unauthorized,
            Self::PaymentRequired(_) => CompletionErrorKind::PaymentRequired,
            Self::InvalidCertificate(_) => CompletionErrorKind::InvalidCertificate,
            Self::MaxContentLengthReached(_) => CompletionErrorKind::MaxContentLengthReached,
            Self::EmptyContent => CompletionErrorKind::EmptyContent,
            Self::MalformedCompletion(_) => CompletionErrorKind::MalformedCompletion,
            Self::Unhandled(_) => CompletionErrorKind::Unhandled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_request_builder_works() {
        let request = CompletionRequest::new("gpt-4o-mini", vec![Message::user("Hello")])
            .with_temperature(0.2)
            .with_top_p(0.9);

        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages[0].role, MessageRole::User);
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.top_p, 0.9);
    }

    #[test]
    fn token_usage_calculates_total() {
        let usage = TokenUsage::new(100, 50);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn empty_content_detection() {
        assert!(CompletionContent::Text("  \n".into()).is_empty());
        assert!(CompletionContent::Structured(serde_json::Value::Null).is_empty());
        assert!(!CompletionContent::Text("hi".into()).is_empty());
    }

    #[test]
    fn every_kind_round_trips_through_new() {
        let kinds = [
            CompletionErrorKind::TooManyRequests,
            CompletionErrorKind::Unauthorized,
            CompletionErrorKind::PaymentRequired,
            CompletionErrorKind::InvalidCertificate,
            CompletionErrorKind::MaxContentLengthReached,
            CompletionErrorKind::EmptyContent,
            CompletionErrorKind::MalformedCompletion,
            CompletionErrorKind::Unhandled,
        ];
        for kind in kinds {
            assert_eq!(AIError::new(kind, "detail").kind(), kind);
        }
    }

    #[test]
    fn ai_error_displays_correctly() {
        let err = AIError::malformed("max retries reached");
        assert_eq!(err.to_string(), "malformed completion: max retries reached");
        assert_eq!(CompletionErrorKind::EmptyContent.to_string(), "empty_content");
    }
}
