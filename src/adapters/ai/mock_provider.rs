//! Mock AI Provider for testing.
//!
//! Provides a scripted implementation of the AIProvider port, allowing
//! handlers and the completion gateway to run without calling a real
//! backend.
//!
//! # Features
//!
//! - Scripted responses, consumed in order
//! - Tool-call payloads built from JSON arguments
//! - Error injection for every completion error kind
//! - Simulated delays for timeout testing
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_error(CompletionErrorKind::TooManyRequests)
//!     .with_tool_call("generate_speech", json!({ "name": "P2", "speech": "Hello" }));
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::conversation::tools::ParsedCall;
use crate::ports::{
    AIError, AIProvider, CompletionErrorKind, CompletionRequest, CompletionResponse,
    ProviderInfo, TokenUsage,
};

/// Text returned once the script runs out.
pub const MOCK_DEFAULT_RESPONSE: &str = "Mock response";

/// Scripted completion backend.
#[derive(Debug, Clone)]
pub struct MockAIProvider {
    /// Scripted responses (consumed in order).
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Provider info to return.
    info: ProviderInfo,
    /// Simulated latency per request.
    delay: Duration,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A scripted mock response.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    /// Free text completion.
    Text(String),
    /// Already structured completion.
    Structured(serde_json::Value),
    /// A classified failure.
    Error(AIError),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for MockAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAIProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            info: ProviderInfo::new("mock", "mock-model-1"),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues a scripted response.
    pub fn with(self, response: MockResponse) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Queues a text completion.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.with(MockResponse::Text(content.into()))
    }

    /// Queues a text completion holding one `<function=NAME>{JSON}</function>`
    /// block.
    pub fn with_tool_call(self, function: &str, arguments: serde_json::Value) -> Self {
        let arguments = match arguments {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        self.with_response(ParsedCall::new(function, arguments).to_wire())
    }

    /// Queues a structured completion.
    pub fn with_structured(self, value: serde_json::Value) -> Self {
        self.with(MockResponse::Structured(value))
    }

    /// Queues a failure of `kind`.
    pub fn with_error(self, kind: CompletionErrorKind) -> Self {
        self.with(MockResponse::Error(AIError::new(kind, "mock failure")))
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of calls made to this provider.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Returns all recorded calls.
    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        lock(&self.calls).clone()
    }

    /// Number of scripted responses not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.responses).len()
    }

    fn next_response(&self) -> MockResponse {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| MockResponse::Text(MOCK_DEFAULT_RESPONSE.to_string()))
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        let model = request.model.clone();
        lock(&self.calls).push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let mut response = match self.next_response() {
            MockResponse::Text(content) => CompletionResponse::text(content, model),
            MockResponse::Structured(value) => CompletionResponse::structured(value, model),
            MockResponse::Error(err) => return Err(err),
        };
        response.usage = TokenUsage::new(10, 20);
        Ok(response)
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}
