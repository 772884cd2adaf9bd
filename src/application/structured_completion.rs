//! Typed completions with a bounded structural retry.

use std::sync::Arc;

use tracing::warn;

use super::completion_gateway::CompletionGateway;
use super::errors::DialogueError;
use crate::domain::conversation::tools::{
    call_from_structured, parse_tool_call, ToolParseError, ToolProjection,
};
use crate::domain::conversation::SessionContext;
use crate::ports::{CompletionContent, CompletionRequest};

/// Projects completion content onto `T`, accepting both raw text and
/// already structured values.
pub fn project_content<T: ToolProjection>(
    content: &CompletionContent,
) -> Result<T, ToolParseError> {
    let call = match content {
        CompletionContent::Text(text) => parse_tool_call(text)?,
        CompletionContent::Structured(value) => {
            call_from_structured(value.clone(), T::FUNCTION)?
        }
    };
    T::from_call(&call)
}

/// Repeats a completion until its output projects onto the expected call.
pub struct StructuredCompletion {
    gateway: Arc<CompletionGateway>,
    max_attempts: u32,
}

impl StructuredCompletion {
    pub fn new(gateway: Arc<CompletionGateway>, max_attempts: u32) -> Self {
        Self {
            gateway,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn gateway(&self) -> &Arc<CompletionGateway> {
        &self.gateway
    }

    /// Runs `request` until a valid `T` comes back.
    ///
    /// Gateway errors propagate at once. Retryable parse failures consume
    /// the attempt budget; a wrong function or a missing field does not.
    pub async fn produce<T: ToolProjection>(
        &self,
        session: &SessionContext,
        request: CompletionRequest,
    ) -> Result<T, DialogueError> {
        for attempt in 1..=self.max_attempts {
            let response = self.gateway.generate(session, request.clone()).await?;
            match project_content::<T>(&response.content) {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => {
                    warn!(function = T::FUNCTION, kind = ?err.kind(), error = %err, "Completion call failed validation");
                    return Err(err.into());
                }
                Err(err) => warn!(
                    function = T::FUNCTION,
                    attempt,
                    kind = ?err.kind(),
                    error = %err,
                    "Completion did not contain a valid call"
                ),
            }
        }

        Err(DialogueError::UnableToProduceValidOutput {
            function: T::FUNCTION,
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::storage::NullDiagnosticsSink;
    use crate::application::completion_gateway::RecordingBackoff;
    use crate::domain::conversation::tools::DialogueSummary;
    use crate::domain::foundation::{ParticipantId, PlaythroughName};
    use crate::ports::{CompletionErrorKind, Message};
    use serde_json::json;

    fn session() -> SessionContext {
        SessionContext::new(
            PlaythroughName::new("campaign").unwrap(),
            ParticipantId::new("1").unwrap(),
        )
    }

    fn structured(provider: &MockAIProvider) -> StructuredCompletion {
        let gateway = CompletionGateway::new(
            Arc::new(provider.clone()),
            Arc::new(NullDiagnosticsSink),
        )
        .with_backoff(Arc::new(RecordingBackoff::new()));
        StructuredCompletion::new(Arc::new(gateway), 3)
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("test-model", vec![Message::user("Summarize")])
    }

    #[tokio::test]
    async fn retries_unparseable_output() {
        let provider = MockAIProvider::new()
            .with_response("I think the summary is nice.")
            .with_tool_call("summarize_dialogue", json!({ "summary": "They met." }));

        let summary: DialogueSummary =
            structured(&provider).produce(&session(), request()).await.unwrap();

        assert_eq!(summary.summary, "They met.");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let provider = MockAIProvider::new()
            .with_response("no call")
            .with_response("still no call")
            .with_response("{\"summary\": broken")
            .with_response("never used");

        let err = structured(&provider)
            .produce::<DialogueSummary>(&session(), request())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DialogueError::UnableToProduceValidOutput {
                function: "summarize_dialogue",
                attempts: 3
            }
        ));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn missing_field_fails_without_retry() {
        let provider = MockAIProvider::new()
            .with_response("<function=summarize_dialogue>{}</function>")
            .with_tool_call("summarize_dialogue", json!({ "summary": "unused" }));

        let err = structured(&provider)
            .produce::<DialogueSummary>(&session(), request())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DialogueError::Parse(ToolParseError::MissingField { ref field, .. }) if field == "summary"
        ));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn wrong_function_fails_without_retry() {
        let provider = MockAIProvider::new()
            .with_tool_call("generate_speech", json!({ "name": "A", "speech": "Hi" }))
            .with_tool_call("summarize_dialogue", json!({ "summary": "unused" }));

        let err = structured(&provider)
            .produce::<DialogueSummary>(&session(), request())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DialogueError::Parse(ToolParseError::UnexpectedFunction { .. })
        ));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn accepts_structured_values() {
        let provider = MockAIProvider::new().with_structured(json!({ "summary": "Brief." }));

        let summary: DialogueSummary =
            structured(&provider).produce(&session(), request()).await.unwrap();

        assert_eq!(summary.summary, "Brief.");
    }

    #[tokio::test]
    async fn gateway_errors_are_not_retried_here() {
        let provider = MockAIProvider::new()
            .with_error(CompletionErrorKind::InvalidCertificate)
            .with_tool_call("summarize_dialogue", json!({ "summary": "x" }));

        let err = structured(&provider)
            .produce::<DialogueSummary>(&session(), request())
            .await
            .unwrap_err();

        assert!(matches!(err, DialogueError::Completion(ref e)
            if e.kind() == CompletionErrorKind::InvalidCertificate));
        assert_eq!(provider.call_count(), 1);
    }
}
