//! Generates one character's speech.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::errors::DialogueError;
use crate::application::settings::DialogueSettings;
use crate::application::structured_completion::StructuredCompletion;
use crate::domain::conversation::tools::SpeechTurn;
use crate::domain::conversation::{
    speech_turn_context, Participant, ParticipantRegistry, SessionContext, SpeechDirective,
    SpeechPrompt, Transcript,
};
use crate::ports::CompletionRequest;

/// What a speech turn is generated from, besides the roster and transcript.
#[derive(Debug, Clone, Copy)]
pub struct SpeechInput<'a> {
    pub speaker: &'a Participant,
    pub memories: &'a str,
    pub place: Option<&'a str>,
    pub purpose: Option<&'a str>,
    /// The human's line for this turn is already in the transcript.
    pub human_spoke: bool,
}

pub struct SpeechTurnHandler {
    completion: Arc<StructuredCompletion>,
    settings: DialogueSettings,
}

impl SpeechTurnHandler {
    pub fn new(completion: Arc<StructuredCompletion>, settings: DialogueSettings) -> Self {
        Self {
            completion,
            settings,
        }
    }

    /// Produces the speaker's turn.
    ///
    /// Output that never parses degrades to [`SpeechTurn::fallback`]; backend
    /// errors still propagate.
    pub async fn produce(
        &self,
        session: &SessionContext,
        registry: &ParticipantRegistry,
        transcript: &Transcript,
        input: SpeechInput<'_>,
    ) -> Result<SpeechTurn, DialogueError> {
        let context = speech_turn_context(&SpeechPrompt {
            speaker: input.speaker,
            registry,
            transcript,
            memories: input.memories,
            place: input.place,
            purpose: input.purpose,
            directive: SpeechDirective::for_input(input.human_spoke),
            excerpt_chars: self.settings.transcript_excerpt_chars,
        })?;
        let request = CompletionRequest::new(self.settings.model.clone(), context.into_messages())
            .with_temperature(self.settings.temperature)
            .with_top_p(self.settings.top_p);

        match self.completion.produce::<SpeechTurn>(session, request).await {
            Ok(turn) => {
                debug!(participant_id = %input.speaker.id(), "Speech produced");
                Ok(turn)
            }
            Err(DialogueError::UnableToProduceValidOutput { attempts, .. }) => {
                warn!(
                    participant_id = %input.speaker.id(),
                    attempts,
                    "No valid speech produced, using fallback"
                );
                Ok(SpeechTurn::fallback(input.speaker.name()))
            }
            Err(err) => Err(err),
        }
    }
}
