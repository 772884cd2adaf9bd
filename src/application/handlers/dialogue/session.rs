//! ConversationSession - Runs one conversation turn by turn.
//!
//! A turn is: intake of the human's line, speaker selection, prompt
//! assembly, completion, parsing, transcript update and a write-through
//! snapshot. Turns are strictly sequential; the session owns its roster
//! and transcript and shares nothing mutable with other sessions.
//!
//! Observers receive [`TurnEvent`]s over a `tokio::sync::mpsc` channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::narration::{NarrationHandler, Scene};
use super::speech_turn::{SpeechInput, SpeechTurnHandler};
use super::summarize_dialogue::DialogueSummarizer;
use super::turn_selector::{CompletionSpeakerChooser, SpeakerChoice, SpeakerChooser, TurnSelector};
use crate::application::completion_gateway::CompletionGateway;
use crate::application::errors::DialogueError;
use crate::application::settings::DialogueSettings;
use crate::application::structured_completion::StructuredCompletion;
use crate::domain::conversation::tools::SpeechTurn;
use crate::domain::conversation::{
    ConversationError, Participant, ParticipantRegistry, SessionContext, SessionSnapshot,
    Transcript,
};
use crate::domain::foundation::ParticipantId;
use crate::ports::{CharacterProfile, CharacterStore, MemoryStore, PlaceStore, SessionStore};

/// Ports a conversation session runs against.
#[derive(Clone)]
pub struct DialogueServices {
    pub gateway: Arc<CompletionGateway>,
    pub sessions: Arc<dyn SessionStore>,
    pub characters: Arc<dyn CharacterStore>,
    pub memories: Arc<dyn MemoryStore>,
    pub places: Arc<dyn PlaceStore>,
}

/// Notification sent to the session observer.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    HumanSpoke {
        participant_id: ParticipantId,
        name: String,
        text: String,
    },
    CharacterSpoke {
        participant_id: ParticipantId,
        name: String,
        narration: String,
        speech: String,
        voice_profile: Option<String>,
    },
    Narration {
        text: String,
    },
    ParticipantJoined {
        participant_id: ParticipantId,
        name: String,
    },
    ParticipantLeft {
        participant_id: ParticipantId,
        name: String,
    },
    Ended {
        summary: Option<String>,
    },
}

/// A character turn that made it into the transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct SpokenTurn {
    pub speaker: SpeakerChoice,
    pub turn: SpeechTurn,
    /// Line as appended to the transcript.
    pub line: String,
}

/// Result of [`ConversationSession::take_turn`].
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Spoke(SpokenTurn),
    Ended { summary: Option<String> },
}

/// One running conversation.
pub struct ConversationSession {
    context: SessionContext,
    registry: ParticipantRegistry,
    transcript: Transcript,
    purpose: Option<String>,
    services: DialogueServices,
    settings: DialogueSettings,
    selector: TurnSelector,
    speech: SpeechTurnHandler,
    summarizer: DialogueSummarizer,
    narration: NarrationHandler,
    observer: Option<mpsc::Sender<TurnEvent>>,
    ended: bool,
}

impl ConversationSession {
    /// Resumes the playthrough's ongoing conversation if there is one,
    /// otherwise starts a fresh one with `roster`.
    pub async fn open(
        context: SessionContext,
        services: DialogueServices,
        settings: DialogueSettings,
        roster: &[ParticipantId],
        purpose: Option<String>,
    ) -> Result<Self, DialogueError> {
        if let Some(snapshot) = services.sessions.load(context.playthrough()).await? {
            match Self::from_snapshot(&context, &snapshot) {
                Ok((registry, purpose, transcript)) => {
                    info!(
                        session_id = %context.session_id(),
                        playthrough = %context.playthrough(),
                        "Resuming ongoing conversation"
                    );
                    return Ok(Self::assemble(
                        context, services, settings, registry, purpose, transcript,
                    ));
                }
                Err(err) => warn!(
                    playthrough = %context.playthrough(),
                    error = %err,
                    "Ongoing conversation cannot be resumed, starting a new one"
                ),
            }
        }
        Self::start(context, services, settings, roster, purpose).await
    }

    /// Starts a fresh conversation, loading every roster member from the
    /// character store. The human must be part of `roster`.
    pub async fn start(
        context: SessionContext,
        services: DialogueServices,
        settings: DialogueSettings,
        roster: &[ParticipantId],
        purpose: Option<String>,
    ) -> Result<Self, DialogueError> {
        if !roster.contains(context.human_id()) {
            return Err(ConversationError::invalid_participant(format!(
                "human participant {} is not in the roster",
                context.human_id()
            ))
            .into());
        }

        let mut registry = ParticipantRegistry::new();
        for id in roster {
            let profile = services
                .characters
                .load_character(context.playthrough(), id)
                .await?;
            registry.insert(participant_from_profile(id, profile)?);
        }
        if !registry.enough_participants() {
            return Err(ConversationError::NotEnoughParticipants {
                count: registry.len(),
            }
            .into());
        }

        info!(
            session_id = %context.session_id(),
            playthrough = %context.playthrough(),
            participants = registry.len(),
            "Starting conversation"
        );
        let session = Self::assemble(
            context,
            services,
            settings,
            registry,
            purpose,
            Transcript::new(),
        );
        session.persist().await?;
        Ok(session)
    }

    /// Resumes the playthrough's ongoing conversation, or `None` when no
    /// usable snapshot exists.
    pub async fn resume(
        context: SessionContext,
        services: DialogueServices,
        settings: DialogueSettings,
    ) -> Result<Option<Self>, DialogueError> {
        let Some(snapshot) = services.sessions.load(context.playthrough()).await? else {
            return Ok(None);
        };
        match Self::from_snapshot(&context, &snapshot) {
            Ok((registry, purpose, transcript)) => Ok(Some(Self::assemble(
                context, services, settings, registry, purpose, transcript,
            ))),
            Err(err) => {
                warn!(
                    playthrough = %context.playthrough(),
                    error = %err,
                    "Snapshot cannot be resumed, treating it as absent"
                );
                Ok(None)
            }
        }
    }

    fn from_snapshot(
        context: &SessionContext,
        snapshot: &SessionSnapshot,
    ) -> Result<(ParticipantRegistry, Option<String>, Transcript), ConversationError> {
        let (registry, purpose, transcript) = snapshot.hydrate()?;
        if !registry.contains(context.human_id()) {
            return Err(ConversationError::invalid_participant(format!(
                "human participant {} is not part of the ongoing conversation",
                context.human_id()
            )));
        }
        if !registry.enough_participants() {
            return Err(ConversationError::NotEnoughParticipants {
                count: registry.len(),
            });
        }
        debug!(lines = transcript.len(), "Snapshot hydrated");
        Ok((registry, purpose, transcript))
    }

    fn assemble(
        context: SessionContext,
        services: DialogueServices,
        settings: DialogueSettings,
        registry: ParticipantRegistry,
        purpose: Option<String>,
        transcript: Transcript,
    ) -> Self {
        let completion = Arc::new(StructuredCompletion::new(
            services.gateway.clone(),
            settings.max_structured_attempts,
        ));
        let chooser = Arc::new(CompletionSpeakerChooser::new(
            services.gateway.clone(),
            settings.clone(),
        ));

        Self {
            selector: TurnSelector::new(chooser),
            speech: SpeechTurnHandler::new(completion.clone(), settings.clone()),
            summarizer: DialogueSummarizer::new(
                completion.clone(),
                services.memories.clone(),
                settings.clone(),
            ),
            narration: NarrationHandler::new(completion, settings.clone()),
            context,
            registry,
            transcript,
            purpose,
            services,
            settings,
            observer: None,
            ended: false,
        }
    }

    /// Sends every produced turn to `observer`.
    pub fn with_observer(mut self, observer: mpsc::Sender<TurnEvent>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Replaces the completion-backed speaker chooser.
    pub fn with_chooser(mut self, chooser: Arc<dyn SpeakerChooser>) -> Self {
        self.selector = TurnSelector::new(chooser);
        self
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn purpose(&self) -> Option<&str> {
        self.purpose.as_deref()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Runs one turn.
    ///
    /// `human_input` is the human's line, if any. The termination keyword
    /// ends the conversation instead of producing a turn. The human's line
    /// and the reply are committed together, so a failed turn leaves the
    /// transcript untouched and can be retried with the same input.
    pub async fn take_turn(
        &mut self,
        human_input: Option<&str>,
    ) -> Result<TurnOutcome, DialogueError> {
        self.ensure_active()?;

        let input = human_input.map(str::trim).filter(|text| !text.is_empty());
        let mut working = self.transcript.clone();
        let mut human_line = None;
        if let Some(text) = input {
            if self.settings.is_termination(text) {
                let summary = self.end().await?;
                return Ok(TurnOutcome::Ended { summary });
            }
            let name = self.human_name()?;
            working.append_turn(&name, text);
            human_line = Some(TurnEvent::HumanSpoke {
                participant_id: self.context.human_id().clone(),
                name,
                text: text.to_string(),
            });
        }

        let choice = self
            .selector
            .select(&self.context, &self.registry, &working)
            .await?;
        let memories = self.memories_of(&choice.id).await;
        let place = self.place_description().await;

        let speaker = self
            .registry
            .get(&choice.id)
            .ok_or_else(|| ConversationError::UnknownParticipant(choice.id.clone()))?;
        let speaker_name = speaker.name().to_string();
        let turn = self
            .speech
            .produce(
                &self.context,
                &self.registry,
                &working,
                SpeechInput {
                    speaker,
                    memories: &memories,
                    place: place.as_deref(),
                    purpose: self.purpose.as_deref(),
                    human_spoke: input.is_some(),
                },
            )
            .await?;

        let text = turn.transcript_text(&speaker_name);
        working.append_turn(&speaker_name, &text);
        let line = format!("{}: {}", speaker_name, text);
        self.transcript = working;

        if let Some(event) = human_line {
            self.notify(event).await;
        }
        self.notify(TurnEvent::CharacterSpoke {
            participant_id: choice.id.clone(),
            name: speaker_name.clone(),
            narration: turn.narration_for(&speaker_name),
            speech: turn.speech.clone(),
            voice_profile: choice.voice_profile.clone(),
        })
        .await;
        self.persist().await?;

        debug!(
            session_id = %self.context.session_id(),
            participant_id = %choice.id,
            lines = self.transcript.len(),
            "Turn resolved"
        );
        Ok(TurnOutcome::Spoke(SpokenTurn {
            speaker: choice,
            turn,
            line,
        }))
    }

    /// Appends an ambient description of the surroundings.
    pub async fn narrate_ambient(&mut self) -> Result<String, DialogueError> {
        self.ensure_active()?;
        let place = self.place_description().await;
        let text = self
            .narration
            .ambient(&self.context, self.scene(place.as_deref()))
            .await?;
        self.append_narration(text).await
    }

    /// Appends a narrative beat that moves the scene forward.
    pub async fn advance_narrative(&mut self) -> Result<String, DialogueError> {
        self.ensure_active()?;
        let place = self.place_description().await;
        let text = self
            .narration
            .beat(&self.context, self.scene(place.as_deref()))
            .await?;
        self.append_narration(text).await
    }

    /// Brings a character from the character store into the conversation.
    pub async fn add_participant(&mut self, id: &ParticipantId) -> Result<(), DialogueError> {
        self.ensure_active()?;
        if self.registry.contains(id) {
            return Err(ConversationError::invalid_participant(format!(
                "participant {} is already present",
                id
            ))
            .into());
        }

        let profile = self
            .services
            .characters
            .load_character(self.context.playthrough(), id)
            .await?;
        let participant = participant_from_profile(id, profile)?;
        let name = participant.name().to_string();
        self.registry.insert(participant);

        info!(session_id = %self.context.session_id(), participant_id = %id, "Participant joined");
        self.notify(TurnEvent::ParticipantJoined {
            participant_id: id.clone(),
            name,
        })
        .await;
        self.persist().await
    }

    /// Removes a character from the conversation. The human cannot leave
    /// this way; they end the conversation instead.
    pub async fn remove_participant(&mut self, id: &ParticipantId) -> Result<(), DialogueError> {
        self.ensure_active()?;
        if id == self.context.human_id() {
            return Err(ConversationError::invalid_participant(
                "the human participant cannot be removed",
            )
            .into());
        }

        let removed = self.registry.remove(id)?;
        info!(session_id = %self.context.session_id(), participant_id = %id, "Participant left");
        self.notify(TurnEvent::ParticipantLeft {
            participant_id: id.clone(),
            name: removed.name().to_string(),
        })
        .await;
        self.persist().await
    }

    /// Ends the conversation: stores a summary when the transcript is long
    /// enough, then deletes the snapshot.
    pub async fn end(&mut self) -> Result<Option<String>, DialogueError> {
        self.ensure_active()?;

        let summary = match self
            .summarizer
            .summarize_and_store(&self.context, &self.registry, &self.transcript)
            .await
        {
            Ok(summary) => summary,
            Err(err) => {
                warn!(error = %err, "Dialogue summary could not be stored");
                None
            }
        };

        self.ended = true;
        self.services
            .sessions
            .delete(self.context.playthrough())
            .await?;
        info!(
            session_id = %self.context.session_id(),
            playthrough = %self.context.playthrough(),
            lines = self.transcript.len(),
            "Conversation ended"
        );
        self.notify(TurnEvent::Ended {
            summary: summary.clone(),
        })
        .await;
        Ok(summary)
    }

    fn ensure_active(&self) -> Result<(), DialogueError> {
        if self.ended {
            return Err(DialogueError::SessionEnded);
        }
        Ok(())
    }

    fn human_name(&self) -> Result<String, ConversationError> {
        let human = self.context.human_id();
        self.registry
            .get(human)
            .map(|p| p.name().to_string())
            .ok_or_else(|| ConversationError::UnknownParticipant(human.clone()))
    }

    async fn append_narration(&mut self, text: String) -> Result<String, DialogueError> {
        self.transcript.append_line(text.clone());
        self.notify(TurnEvent::Narration { text: text.clone() })
            .await;
        self.persist().await?;
        Ok(text)
    }

    fn scene<'a>(&'a self, place: Option<&'a str>) -> Scene<'a> {
        Scene {
            registry: &self.registry,
            transcript: &self.transcript,
            place,
            purpose: self.purpose.as_deref(),
        }
    }

    async fn memories_of(&self, id: &ParticipantId) -> String {
        match self
            .services
            .characters
            .load_memories(self.context.playthrough(), id)
            .await
        {
            Ok(memories) => memories,
            Err(err) => {
                warn!(participant_id = %id, error = %err, "Memories unavailable");
                String::new()
            }
        }
    }

    async fn place_description(&self) -> Option<String> {
        let place = self.context.place()?;
        match self
            .services
            .places
            .describe_place(self.context.playthrough(), place)
            .await
        {
            Ok(description) => Some(description),
            Err(err) => {
                warn!(place, error = %err, "Place description unavailable");
                None
            }
        }
    }

    async fn persist(&self) -> Result<(), DialogueError> {
        let snapshot =
            SessionSnapshot::capture(&self.registry, self.purpose.as_deref(), &self.transcript);
        self.services
            .sessions
            .save(self.context.playthrough(), &snapshot)
            .await?;
        Ok(())
    }

    async fn notify(&mut self, event: TurnEvent) {
        let closed = match &self.observer {
            Some(observer) => observer.send(event).await.is_err(),
            None => false,
        };
        if closed {
            warn!("Turn observer closed, no further turns will be reported");
            self.observer = None;
        }
    }
}

fn participant_from_profile(
    id: &ParticipantId,
    profile: CharacterProfile,
) -> Result<Participant, ConversationError> {
    Participant::new(
        id.clone(),
        profile.name,
        profile.description,
        profile.personality,
        profile.equipment,
        profile.voice_profile,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::storage::{
        InMemoryCharacterStore, InMemorySessionStore, NullDiagnosticsSink,
    };
    use crate::application::completion_gateway::RecordingBackoff;
    use crate::domain::foundation::{ErrorCode, PlaythroughName};
    use crate::ports::CompletionErrorKind;
    use serde_json::json;

    struct Fixture {
        provider: MockAIProvider,
        sessions: InMemorySessionStore,
        characters: InMemoryCharacterStore,
    }

    impl Fixture {
        async fn new(provider: MockAIProvider) -> Self {
            let characters = InMemoryCharacterStore::new();
            for (id, name, description) in [
                ("1", "P1", "A wandering bard"),
                ("2", "P2", "The innkeeper"),
                ("3", "P3", "A quiet mercenary"),
            ] {
                characters
                    .add_character(
                        ParticipantId::new(id).unwrap(),
                        CharacterProfile {
                            name: name.to_string(),
                            description: description.to_string(),
                            personality: "Steady".to_string(),
                            equipment: "A cloak".to_string(),
                            voice_profile: (id != "1").then(|| "alloy".to_string()),
                        },
                    )
                    .await;
            }
            Self {
                provider,
                sessions: InMemorySessionStore::new(),
                characters,
            }
        }

        fn services(&self) -> DialogueServices {
            let gateway = CompletionGateway::new(
                Arc::new(self.provider.clone()),
                Arc::new(NullDiagnosticsSink),
            )
            .with_backoff(Arc::new(RecordingBackoff::new()));
            DialogueServices {
                gateway: Arc::new(gateway),
                sessions: Arc::new(self.sessions.clone()),
                characters: Arc::new(self.characters.clone()),
                memories: Arc::new(self.characters.clone()),
                places: Arc::new(self.characters.clone()),
            }
        }
    }

    fn playthrough() -> PlaythroughName {
        PlaythroughName::new("campaign").unwrap()
    }

    fn context() -> SessionContext {
        SessionContext::new(playthrough(), id("1"))
    }

    fn id(value: &str) -> ParticipantId {
        ParticipantId::new(value).unwrap()
    }

    #[tokio::test]
    async fn start_persists_an_empty_snapshot() {
        let fixture = Fixture::new(MockAIProvider::new()).await;

        let session = ConversationSession::start(
            context(),
            fixture.services(),
            DialogueSettings::default(),
            &[id("1"), id("2")],
            Some("Find a room".to_string()),
        )
        .await
        .unwrap();

        assert_eq!(session.registry().len(), 2);
        let snapshot = fixture.sessions.peek(&playthrough()).await.unwrap();
        assert_eq!(snapshot.purpose(), Some("Find a room"));
        assert!(snapshot.transcript().is_empty());
    }

    #[tokio::test]
    async fn start_requires_the_human_in_the_roster() {
        let fixture = Fixture::new(MockAIProvider::new()).await;

        let err = ConversationSession::start(
            context(),
            fixture.services(),
            DialogueSettings::default(),
            &[id("2"), id("3")],
            None,
        )
        .await
        .err()
        .unwrap();

        assert_eq!(err.code(), ErrorCode::InvalidParticipant);
    }

    async fn store_snapshot(fixture: &Fixture, value: serde_json::Value) {
        let snapshot = SessionSnapshot::from_value(value).unwrap();
        fixture.sessions.save(&playthrough(), &snapshot).await.unwrap();
    }

    #[tokio::test]
    async fn unusable_snapshot_starts_a_fresh_conversation() {
        let fixture = Fixture::new(MockAIProvider::new()).await;
        store_snapshot(
            &fixture,
            json!({
                "participants": {
                    "1": { "name": "P1", "description": "P1", "personality": "x", "equipment": "y" },
                    "2": { "name": "P2", "description": "The innkeeper", "personality": "x", "equipment": "y" }
                },
                "purpose": null,
                "transcript": ["P1: stale line"]
            }),
        )
        .await;

        let session = ConversationSession::open(
            context(),
            fixture.services(),
            DialogueSettings::default(),
            &[id("1"), id("3")],
            None,
        )
        .await
        .unwrap();

        assert_eq!(session.registry().ids(), vec![id("1"), id("3")]);
        assert!(session.transcript().is_empty());
        let snapshot = fixture.sessions.peek(&playthrough()).await.unwrap();
        assert!(snapshot.transcript().is_empty());
    }

    #[tokio::test]
    async fn snapshot_without_the_human_is_not_resumed() {
        let fixture = Fixture::new(MockAIProvider::new()).await;
        store_snapshot(
            &fixture,
            json!({
                "participants": {
                    "2": { "name": "P2", "description": "The innkeeper", "personality": "x", "equipment": "y" },
                    "3": { "name": "P3", "description": "A quiet mercenary", "personality": "x", "equipment": "y" }
                },
                "purpose": null,
                "transcript": []
            }),
        )
        .await;

        let resumed =
            ConversationSession::resume(context(), fixture.services(), DialogueSettings::default())
                .await
                .unwrap();
        assert!(resumed.is_none());

        let session = ConversationSession::open(
            context(),
            fixture.services(),
            DialogueSettings::default(),
            &[id("1"), id("2")],
            None,
        )
        .await
        .unwrap();
        assert_eq!(session.registry().ids(), vec![id("1"), id("2")]);
    }

    #[tokio::test]
    async fn failed_turn_leaves_transcript_untouched() {
        let provider = MockAIProvider::new()
            .with_error(CompletionErrorKind::PaymentRequired)
            .with_tool_call(
                "generate_speech",
                json!({ "name": "P2", "speech": "Welcome!", "narration_text": "P2 smiles" }),
            );
        let fixture = Fixture::new(provider).await;
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = ConversationSession::start(
            context(),
            fixture.services(),
            DialogueSettings::default(),
            &[id("1"), id("2")],
            None,
        )
        .await
        .unwrap()
        .with_observer(tx);

        let err = session.take_turn(Some("Hello there")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::CompletionFailed);
        assert!(session.transcript().is_empty());
        assert!(rx.try_recv().is_err());

        session.take_turn(Some("Hello there")).await.unwrap();

        assert_eq!(
            session.transcript().lines(),
            &["P1: Hello there".to_string(), "P2: *P2 smiles* Welcome!".to_string()]
        );
        let snapshot = fixture.sessions.peek(&playthrough()).await.unwrap();
        assert_eq!(snapshot.transcript().len(), 2);
    }

    #[tokio::test]
    async fn two_person_turn_needs_one_completion() {
        let provider = MockAIProvider::new().with_tool_call(
            "generate_speech",
            json!({ "name": "P2", "speech": "Welcome!", "narration_text": "P2 smiles" }),
        );
        let fixture = Fixture::new(provider).await;
        let (tx, mut rx) = mpsc::channel(8);
        let mut session = ConversationSession::start(
            context(),
            fixture.services(),
            DialogueSettings::default(),
            &[id("1"), id("2")],
            None,
        )
        .await
        .unwrap()
        .with_observer(tx);

        let outcome = session.take_turn(Some("Hello there")).await.unwrap();

        let TurnOutcome::Spoke(spoken) = outcome else {
            panic!("expected a spoken turn");
        };
        assert_eq!(spoken.line, "P2: *P2 smiles* Welcome!");
        assert_eq!(
            session.transcript().lines(),
            &["P1: Hello there".to_string(), "P2: *P2 smiles* Welcome!".to_string()]
        );
        assert_eq!(fixture.provider.call_count(), 1);

        assert!(matches!(rx.recv().await, Some(TurnEvent::HumanSpoke { .. })));
        assert!(matches!(
            rx.recv().await,
            Some(TurnEvent::CharacterSpoke { ref speech, .. }) if speech == "Welcome!"
        ));
    }

    #[tokio::test]
    async fn silent_human_still_gets_a_turn() {
        let provider = MockAIProvider::new().with_tool_call(
            "generate_speech",
            json!({ "name": "P2", "speech": "Quiet night." }),
        );
        let fixture = Fixture::new(provider).await;
        let mut session = ConversationSession::start(
            context(),
            fixture.services(),
            DialogueSettings::default(),
            &[id("1"), id("2")],
            None,
        )
        .await
        .unwrap();

        session.take_turn(None).await.unwrap();

        assert_eq!(
            session.transcript().lines(),
            &["P2: *P2 takes a moment to speak.* Quiet night.".to_string()]
        );
        let calls = fixture.provider.get_calls();
        assert_eq!(
            calls[0].messages.last().unwrap().content,
            "Produce P2's speech."
        );
    }

    #[tokio::test]
    async fn short_goodbye_skips_summary_and_deletes_snapshot() {
        let fixture = Fixture::new(MockAIProvider::new()).await;
        let mut session = ConversationSession::start(
            context(),
            fixture.services(),
            DialogueSettings::default(),
            &[id("1"), id("2")],
            None,
        )
        .await
        .unwrap();

        let outcome = session.take_turn(Some("GoodBye")).await.unwrap();

        assert_eq!(outcome, TurnOutcome::Ended { summary: None });
        assert!(session.is_ended());
        assert!(fixture.sessions.peek(&playthrough()).await.is_none());
        assert_eq!(fixture.provider.call_count(), 0);
        assert!(matches!(
            session.take_turn(Some("Hello?")).await,
            Err(DialogueError::SessionEnded)
        ));
    }

    #[tokio::test]
    async fn human_cannot_be_removed() {
        let fixture = Fixture::new(MockAIProvider::new()).await;
        let mut session = ConversationSession::start(
            context(),
            fixture.services(),
            DialogueSettings::default(),
            &[id("1"), id("2"), id("3")],
            None,
        )
        .await
        .unwrap();

        let err = session.remove_participant(&id("1")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParticipant);

        session.remove_participant(&id("3")).await.unwrap();
        assert_eq!(session.registry().ids(), vec![id("1"), id("2")]);
        let snapshot = fixture.sessions.peek(&playthrough()).await.unwrap();
        assert_eq!(snapshot.participant_ids(), vec![&id("1"), &id("2")]);
    }

    #[tokio::test]
    async fn participants_can_join_mid_conversation() {
        let fixture = Fixture::new(MockAIProvider::new()).await;
        let mut session = ConversationSession::start(
            context(),
            fixture.services(),
            DialogueSettings::default(),
            &[id("1"), id("2")],
            None,
        )
        .await
        .unwrap();

        session.add_participant(&id("3")).await.unwrap();
        assert_eq!(session.registry().len(), 3);

        let err = session.add_participant(&id("3")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParticipant);
    }

    #[tokio::test]
    async fn narration_is_appended_as_a_bare_line() {
        let provider = MockAIProvider::new().with_tool_call(
            "generate_ambient_narration",
            json!({ "ambient_narration": "Rain drums on the roof." }),
        );
        let fixture = Fixture::new(provider).await;
        fixture
            .characters
            .add_place("inn", "A warm inn at the crossroads")
            .await;
        let mut session = ConversationSession::start(
            context().with_place("inn"),
            fixture.services(),
            DialogueSettings::default(),
            &[id("1"), id("2")],
            None,
        )
        .await
        .unwrap();

        let text = session.narrate_ambient().await.unwrap();

        assert_eq!(text, "Rain drums on the roof.");
        assert_eq!(
            session.transcript().lines(),
            &["Rain drums on the roof.".to_string()]
        );
        let calls = fixture.provider.get_calls();
        assert!(calls[0].messages[0]
            .content
            .contains("A warm inn at the crossroads"));
        let snapshot = fixture.sessions.peek(&playthrough()).await.unwrap();
        assert_eq!(snapshot.transcript(), session.transcript().lines());
    }

    #[tokio::test]
    async fn closed_observer_does_not_fail_turns() {
        let provider = MockAIProvider::new().with_tool_call(
            "generate_speech",
            json!({ "name": "P2", "speech": "Hm." }),
        );
        let fixture = Fixture::new(provider).await;
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut session = ConversationSession::start(
            context(),
            fixture.services(),
            DialogueSettings::default(),
            &[id("1"), id("2")],
            None,
        )
        .await
        .unwrap()
        .with_observer(tx);

        assert!(session.take_turn(Some("Hi")).await.is_ok());
    }
}
