//! Summarizes a finished dialogue into every participant's memories.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::errors::DialogueError;
use crate::application::settings::DialogueSettings;
use crate::application::structured_completion::StructuredCompletion;
use crate::domain::conversation::tools::DialogueSummary;
use crate::domain::conversation::{summary_context, ParticipantRegistry, SessionContext, Transcript};
use crate::ports::{CompletionRequest, MemoryStore};

pub struct DialogueSummarizer {
    completion: Arc<StructuredCompletion>,
    memories: Arc<dyn MemoryStore>,
    settings: DialogueSettings,
}

impl DialogueSummarizer {
    pub fn new(
        completion: Arc<StructuredCompletion>,
        memories: Arc<dyn MemoryStore>,
        settings: DialogueSettings,
    ) -> Self {
        Self {
            completion,
            memories,
            settings,
        }
    }

    /// Summarizes `transcript` and appends the summary to the memories of
    /// every participant.
    ///
    /// Returns `Ok(None)` without calling the backend when the transcript
    /// is too short to be worth remembering.
    pub async fn summarize_and_store(
        &self,
        session: &SessionContext,
        registry: &ParticipantRegistry,
        transcript: &Transcript,
    ) -> Result<Option<String>, DialogueError> {
        if !transcript.is_sufficient() {
            info!(
                lines = transcript.len(),
                "Transcript too short, skipping summarization"
            );
            return Ok(None);
        }

        let context = summary_context(registry, transcript)?;
        let request = CompletionRequest::new(self.settings.model.clone(), context.into_messages())
            .with_temperature(self.settings.summary_temperature)
            .with_top_p(self.settings.top_p);
        let summary = self
            .completion
            .produce::<DialogueSummary>(session, request)
            .await?
            .summary;

        let mut first_failure = None;
        for participant in registry.iter() {
            if let Err(err) = self
                .memories
                .append_memory(session.playthrough(), participant.id(), &summary)
                .await
            {
                warn!(participant_id = %participant.id(), error = %err, "Failed to store memory");
                first_failure.get_or_insert(err);
            }
        }
        if let Some(err) = first_failure {
            return Err(err.into());
        }

        info!(participants = registry.len(), "Dialogue summary stored");
        Ok(Some(summary))
    }
}
