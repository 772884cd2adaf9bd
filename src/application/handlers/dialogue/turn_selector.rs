//! TurnSelector - Decides who speaks next.
//!
//! A two-person conversation that includes the human needs no backend
//! call: the other member always answers. Larger rosters ask a
//! [`SpeakerChooser`] and validate its pick against the roster.
//!
//! Only structurally unusable chooser output is retried (up to
//! [`MAX_CHOICE_ATTEMPTS`]). A pick that names the human, an unknown
//! member or an unvoiced member is a contract violation and fails with
//! `InvalidNextSpeaker` at once.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::application::completion_gateway::CompletionGateway;
use crate::application::errors::DialogueError;
use crate::application::settings::DialogueSettings;
use crate::application::structured_completion::project_content;
use crate::domain::conversation::tools::{SpeakerChoiceCall, ToolProjection};
use crate::domain::conversation::{
    speaker_choice_context, ConversationError, Participant, ParticipantRegistry, SessionContext,
    Transcript, TurnState,
};
use crate::domain::foundation::{ParticipantId, StateMachine};
use crate::ports::CompletionRequest;

/// Chooser picks tried before the selection gives up.
pub const MAX_CHOICE_ATTEMPTS: u32 = 3;

/// The speaker fixed for one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerChoice {
    pub id: ParticipantId,
    pub name: String,
    pub reason: String,
    pub voice_profile: Option<String>,
}

impl SpeakerChoice {
    fn from_participant(participant: &Participant, reason: impl Into<String>) -> Self {
        Self {
            id: participant.id().clone(),
            name: participant.name().to_string(),
            reason: reason.into(),
            voice_profile: participant.voice_profile().map(str::to_string),
        }
    }
}

/// Source of candidate speakers for rosters larger than two.
///
/// Implementations report unusable output as [`DialogueError::Parse`];
/// every other error is propagated by the selector unchanged.
#[async_trait]
pub trait SpeakerChooser: Send + Sync {
    async fn choose(
        &self,
        session: &SessionContext,
        registry: &ParticipantRegistry,
        transcript: &Transcript,
    ) -> Result<SpeakerChoiceCall, DialogueError>;
}

/// Asks the completion backend for a `choose_speech_turn` call.
pub struct CompletionSpeakerChooser {
    gateway: Arc<CompletionGateway>,
    settings: DialogueSettings,
}

impl CompletionSpeakerChooser {
    pub fn new(gateway: Arc<CompletionGateway>, settings: DialogueSettings) -> Self {
        Self { gateway, settings }
    }
}

#[async_trait]
impl SpeakerChooser for CompletionSpeakerChooser {
    async fn choose(
        &self,
        session: &SessionContext,
        registry: &ParticipantRegistry,
        transcript: &Transcript,
    ) -> Result<SpeakerChoiceCall, DialogueError> {
        let context = speaker_choice_context(
            registry,
            session.human_id(),
            transcript,
            self.settings.transcript_excerpt_chars,
        )?;
        let request = CompletionRequest::new(
            self.settings.speaker_choice_model.clone(),
            context.into_messages(),
        )
        .with_temperature(self.settings.temperature)
        .with_top_p(self.settings.top_p);

        let response = self.gateway.generate(session, request).await?;
        Ok(project_content::<SpeakerChoiceCall>(&response.content)?)
    }
}

/// Runs the `AwaitingChoice -> Validated -> Chosen` selection.
pub struct TurnSelector {
    chooser: Arc<dyn SpeakerChooser>,
    max_attempts: u32,
}

impl TurnSelector {
    pub fn new(chooser: Arc<dyn SpeakerChooser>) -> Self {
        Self {
            chooser,
            max_attempts: MAX_CHOICE_ATTEMPTS,
        }
    }

    /// Picks the next speaker. Never returns the human.
    pub async fn select(
        &self,
        session: &SessionContext,
        registry: &ParticipantRegistry,
        transcript: &Transcript,
    ) -> Result<SpeakerChoice, DialogueError> {
        let human = session.human_id();
        if !registry.enough_participants() {
            return Err(ConversationError::NotEnoughParticipants {
                count: registry.len(),
            }
            .into());
        }

        if let Some(other) = registry.other_participant(human) {
            debug!(participant_id = %other.id(), "Only one other participant, no choice needed");
            return Ok(SpeakerChoice::from_participant(
                other,
                "Only one other participant is present",
            ));
        }

        let mut state = TurnState::AwaitingChoice;
        for attempt in 1..=self.max_attempts {
            match self.chooser.choose(session, registry, transcript).await {
                Ok(candidate) => {
                    let participant = validate_candidate(&candidate, registry, human)?;
                    state = advance(state, TurnState::Validated)?;

                    if participant.voice_profile().is_none() {
                        return Err(ConversationError::invalid_next_speaker(format!(
                            "participant {} has no voice profile",
                            participant.id()
                        ))
                        .into());
                    }
                    advance(state, TurnState::Chosen)?;

                    debug!(
                        participant_id = %participant.id(),
                        attempt,
                        reason = %candidate.reason,
                        "Next speaker chosen"
                    );
                    return Ok(SpeakerChoice::from_participant(participant, candidate.reason));
                }
                Err(DialogueError::Parse(err)) if err.is_retryable() => {
                    warn!(attempt, kind = ?err.kind(), error = %err, "Speaker choice rejected");
                    state = advance(state, TurnState::Rejected)?;
                    state = advance(state, TurnState::AwaitingChoice)?;
                }
                Err(err) => return Err(err),
            }
        }

        Err(DialogueError::UnableToProduceValidOutput {
            function: SpeakerChoiceCall::FUNCTION,
            attempts: self.max_attempts,
        })
    }
}

fn advance(state: TurnState, next: TurnState) -> Result<TurnState, ConversationError> {
    state
        .transition_to(next)
        .map_err(|e| ConversationError::InvalidState(e.to_string()))
}

fn validate_candidate<'a>(
    candidate: &SpeakerChoiceCall,
    registry: &'a ParticipantRegistry,
    human: &ParticipantId,
) -> Result<&'a Participant, ConversationError> {
    let id = ParticipantId::new(candidate.identifier.as_str()).map_err(|_| {
        ConversationError::invalid_next_speaker(format!(
            "'{}' is not a participant identifier",
            candidate.identifier
        ))
    })?;

    if &id == human {
        return Err(ConversationError::invalid_next_speaker(format!(
            "participant {} is the human",
            id
        )));
    }

    registry.get(&id).ok_or_else(|| {
        ConversationError::invalid_next_speaker(format!("participant {} is not present", id))
    })
}
