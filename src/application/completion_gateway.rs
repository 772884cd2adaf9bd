//! Completion Gateway - One backend call with classified retries.
//!
//! Adapters only classify failures; this gateway decides which of them
//! are worth another attempt and how long to wait first.
//!
//! | Kind | Policy |
//! |------|--------|
//! | `TooManyRequests`, `Unauthorized` | retry after 10s |
//! | `EmptyContent`, `MalformedCompletion` | retry after 5s |
//! | `Unhandled` | retry immediately |
//! | `PaymentRequired`, `InvalidCertificate`, `MaxContentLengthReached` | fatal |
//!
//! Every retry counts against one global bound. An `EmptyContent` answer
//! also dumps the outbound messages to the diagnostics sink.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::domain::conversation::SessionContext;
use crate::ports::{
    AIError, AIProvider, CompletionErrorKind, CompletionRequest, CompletionResponse,
    DiagnosticsSink,
};

/// Attempts made before giving up, unless configured otherwise.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Detail carried by the error returned once the retry bound is hit.
pub const MAX_RETRIES_REACHED: &str = "max retries reached";

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after waiting this long.
    Retry(Duration),
    /// Give up and surface the error.
    Fatal,
}

/// Per-kind retry table plus the global attempt bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    /// A policy allowing `max_retries` attempts in total (at least one).
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn for_kind(kind: CompletionErrorKind) -> RetryDecision {
        match kind {
            CompletionErrorKind::TooManyRequests | CompletionErrorKind::Unauthorized => {
                RetryDecision::Retry(Duration::from_secs(10))
            }
            CompletionErrorKind::EmptyContent | CompletionErrorKind::MalformedCompletion => {
                RetryDecision::Retry(Duration::from_secs(5))
            }
            CompletionErrorKind::Unhandled => RetryDecision::Retry(Duration::ZERO),
            CompletionErrorKind::PaymentRequired
            | CompletionErrorKind::InvalidCertificate
            | CompletionErrorKind::MaxContentLengthReached => RetryDecision::Fatal,
        }
    }
}

/// Waits between attempts.
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioBackoff;

#[async_trait]
impl Backoff for TokioBackoff {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested sleeps without waiting.
#[derive(Debug, Default)]
pub struct RecordingBackoff {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingBackoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Backoff for RecordingBackoff {
    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}

/// Wraps an [`AIProvider`] with the retry policy above.
pub struct CompletionGateway {
    provider: Arc<dyn AIProvider>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    backoff: Arc<dyn Backoff>,
    policy: RetryPolicy,
    timeout: Option<Duration>,
}

impl CompletionGateway {
    pub fn new(provider: Arc<dyn AIProvider>, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            provider,
            diagnostics,
            backoff: Arc::new(TokioBackoff),
            policy: RetryPolicy::default(),
            timeout: None,
        }
    }

    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Aborts a single attempt that takes longer than `timeout`. The
    /// attempt then counts as a `MalformedCompletion`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Runs `request`, retrying per [`RetryPolicy::for_kind`].
    ///
    /// # Errors
    ///
    /// The first fatal error, or `MalformedCompletion("max retries reached")`
    /// once the attempt bound is exhausted.
    pub async fn generate(
        &self,
        session: &SessionContext,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, AIError> {
        let max_retries = self.policy.max_retries();
        let session_id = session.session_id();

        for attempt in 1..=max_retries {
            let err = match self.attempt(&request).await {
                Ok(response) => {
                    debug!(
                        %session_id,
                        model = %response.model,
                        attempt,
                        prompt_tokens = response.usage.prompt_tokens,
                        completion_tokens = response.usage.completion_tokens,
                        "Completion succeeded"
                    );
                    return Ok(response);
                }
                Err(err) => err,
            };

            if err.kind() == CompletionErrorKind::EmptyContent {
                self.dump_messages(session, &request).await;
            }

            let backoff = match RetryPolicy::for_kind(err.kind()) {
                RetryDecision::Fatal => {
                    error!(
                        %session_id,
                        kind = ?err.kind(),
                        attempt,
                        error = %err,
                        "Fatal completion error"
                    );
                    return Err(err);
                }
                RetryDecision::Retry(backoff) => backoff,
            };

            if attempt == max_retries {
                warn!(%session_id, kind = ?err.kind(), attempt, "Completion failed on final attempt");
                break;
            }

            warn!(
                %session_id,
                kind = ?err.kind(),
                attempt,
                backoff_secs = backoff.as_secs(),
                error = %err,
                "Completion failed, retrying"
            );
            if !backoff.is_zero() {
                self.backoff.sleep(backoff).await;
            }
        }

        error!(%session_id, max_retries, "Giving up on completion");
        Err(AIError::malformed(MAX_RETRIES_REACHED))
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<CompletionResponse, AIError> {
        let call = self.provider.complete(request.clone());
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                AIError::malformed(format!("completion timed out after {}s", limit.as_secs()))
            })??,
            None => call.await?,
        };

        if response.content.is_empty() {
            return Err(AIError::EmptyContent);
        }
        Ok(response)
    }

    async fn dump_messages(&self, session: &SessionContext, request: &CompletionRequest) {
        if let Err(err) = self
            .diagnostics
            .record_outbound_messages(session.playthrough(), &request.messages)
            .await
        {
            warn!(session_id = %session.session_id(), error = %err, "Failed to record outbound messages");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::domain::foundation::{ParticipantId, PlaythroughName};
    use crate::ports::{CompletionContent, DiagnosticsError, Message};

    #[derive(Default)]
    struct RecordingSink {
        dumps: Mutex<Vec<Vec<Message>>>,
        fail: bool,
    }

    #[async_trait]
    impl DiagnosticsSink for RecordingSink {
        async fn record_outbound_messages(
            &self,
            _playthrough: &PlaythroughName,
            messages: &[Message],
        ) -> Result<(), DiagnosticsError> {
            self.dumps.lock().unwrap().push(messages.to_vec());
            if self.fail {
                return Err(DiagnosticsError::IoError("disk full".into()));
            }
            Ok(())
        }
    }

    fn session() -> SessionContext {
        SessionContext::new(
            PlaythroughName::new("campaign").unwrap(),
            ParticipantId::new("1").unwrap(),
        )
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("test-model", vec![Message::user("Hello")])
    }

    fn gateway(
        provider: MockAIProvider,
    ) -> (CompletionGateway, Arc<RecordingBackoff>, Arc<RecordingSink>) {
        let backoff = Arc::new(RecordingBackoff::new());
        let sink = Arc::new(RecordingSink::default());
        let gateway = CompletionGateway::new(Arc::new(provider), sink.clone())
            .with_backoff(backoff.clone());
        (gateway, backoff, sink)
    }

    #[test]
    fn policy_table_matches_kinds() {
        use CompletionErrorKind::*;
        assert_eq!(
            RetryPolicy::for_kind(TooManyRequests),
            RetryDecision::Retry(Duration::from_secs(10))
        );
        assert_eq!(
            RetryPolicy::for_kind(Unauthorized),
            RetryDecision::Retry(Duration::from_secs(10))
        );
        assert_eq!(
            RetryPolicy::for_kind(EmptyContent),
            RetryDecision::Retry(Duration::from_secs(5))
        );
        assert_eq!(
            RetryPolicy::for_kind(MalformedCompletion),
            RetryDecision::Retry(Duration::from_secs(5))
        );
        assert_eq!(
            RetryPolicy::for_kind(Unhandled),
            RetryDecision::Retry(Duration::ZERO)
        );
        for fatal in [PaymentRequired, InvalidCertificate, MaxContentLengthReached] {
            assert_eq!(RetryPolicy::for_kind(fatal), RetryDecision::Fatal);
        }
    }

    #[tokio::test]
    async fn succeeds_after_two_rate_limits_with_two_sleeps() {
        let provider = MockAIProvider::new()
            .with_error(CompletionErrorKind::TooManyRequests)
            .with_error(CompletionErrorKind::TooManyRequests)
            .with_response("Hello");
        let (gateway, backoff, _) = gateway(provider.clone());

        let response = gateway.generate(&session(), request()).await.unwrap();

        assert_eq!(response.content, CompletionContent::Text("Hello".into()));
        assert_eq!(provider.call_count(), 3);
        assert_eq!(
            backoff.sleeps(),
            vec![Duration::from_secs(10), Duration::from_secs(10)]
        );
    }

    #[tokio::test]
    async fn fatal_errors_propagate_immediately() {
        let provider = MockAIProvider::new()
            .with_error(CompletionErrorKind::PaymentRequired)
            .with_response("never reached");
        let (gateway, backoff, _) = gateway(provider.clone());

        let err = gateway.generate(&session(), request()).await.unwrap_err();

        assert_eq!(err.kind(), CompletionErrorKind::PaymentRequired);
        assert_eq!(provider.call_count(), 1);
        assert!(backoff.sleeps().is_empty());
    }

    #[tokio::test]
    async fn context_overflow_is_fatal() {
        let provider =
            MockAIProvider::new().with_error(CompletionErrorKind::MaxContentLengthReached);
        let (gateway, _, _) = gateway(provider.clone());

        let err = gateway.generate(&session(), request()).await.unwrap_err();
        assert_eq!(err.kind(), CompletionErrorKind::MaxContentLengthReached);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_max_retries_reached() {
        let mut provider = MockAIProvider::new();
        for _ in 0..4 {
            provider = provider.with_error(CompletionErrorKind::MalformedCompletion);
        }
        let (gateway, backoff, _) = gateway(provider.clone());
        let gateway = gateway.with_policy(RetryPolicy::new(3));

        let err = gateway.generate(&session(), request()).await.unwrap_err();

        assert_eq!(err, AIError::malformed(MAX_RETRIES_REACHED));
        assert_eq!(provider.call_count(), 3);
        assert_eq!(backoff.sleeps().len(), 2);
    }

    #[tokio::test]
    async fn unhandled_errors_retry_without_sleeping() {
        let provider = MockAIProvider::new()
            .with_error(CompletionErrorKind::Unhandled)
            .with_response("ok");
        let (gateway, backoff, _) = gateway(provider.clone());

        gateway.generate(&session(), request()).await.unwrap();

        assert_eq!(provider.call_count(), 2);
        assert!(backoff.sleeps().is_empty());
    }

    #[tokio::test]
    async fn blank_text_counts_as_empty_content_and_is_dumped() {
        let provider = MockAIProvider::new().with_response("   ").with_response("ok");
        let (gateway, backoff, sink) = gateway(provider);

        gateway.generate(&session(), request()).await.unwrap();

        assert_eq!(backoff.sleeps(), vec![Duration::from_secs(5)]);
        let dumps = sink.dumps.lock().unwrap();
        assert_eq!(dumps.len(), 1);
        assert_eq!(dumps[0][0].content, "Hello");
    }

    #[tokio::test]
    async fn diagnostics_failure_is_swallowed() {
        let provider = MockAIProvider::new()
            .with_error(CompletionErrorKind::EmptyContent)
            .with_response("ok");
        let backoff = Arc::new(RecordingBackoff::new());
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let gateway =
            CompletionGateway::new(Arc::new(provider), sink.clone()).with_backoff(backoff);

        assert!(gateway.generate(&session(), request()).await.is_ok());
        assert_eq!(sink.dumps.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stuck_call_times_out_as_malformed() {
        let provider = MockAIProvider::new()
            .with_response("late")
            .with_delay(Duration::from_millis(200));
        let (gateway, _, _) = gateway(provider.clone());
        let gateway = gateway
            .with_timeout(Duration::from_millis(10))
            .with_policy(RetryPolicy::new(1));

        let err = gateway.generate(&session(), request()).await.unwrap_err();

        assert_eq!(err, AIError::malformed(MAX_RETRIES_REACHED));
        assert_eq!(provider.call_count(), 1);
    }
}
