//! Narration that no participant speaks: ambient description and
//! narrative beats.

use std::sync::Arc;

use crate::application::errors::DialogueError;
use crate::application::settings::DialogueSettings;
use crate::application::structured_completion::StructuredCompletion;
use crate::domain::conversation::tools::{AmbientNarration, NarrativeBeat};
use crate::domain::conversation::{
    narration_context, NarrationKind, ParticipantRegistry, SessionContext, Transcript,
};
use crate::ports::CompletionRequest;

/// Scene state a narration is written against.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub registry: &'a ParticipantRegistry,
    pub transcript: &'a Transcript,
    pub place: Option<&'a str>,
    pub purpose: Option<&'a str>,
}

pub struct NarrationHandler {
    completion: Arc<StructuredCompletion>,
    settings: DialogueSettings,
}

impl NarrationHandler {
    pub fn new(completion: Arc<StructuredCompletion>, settings: DialogueSettings) -> Self {
        Self {
            completion,
            settings,
        }
    }

    /// Describes the surroundings as they are now.
    pub async fn ambient(
        &self,
        session: &SessionContext,
        scene: Scene<'_>,
    ) -> Result<String, DialogueError> {
        let request = self.request(NarrationKind::Ambient, scene)?;
        let narration: AmbientNarration = self.completion.produce(session, request).await?;
        Ok(narration.ambient_narration)
    }

    /// Moves the scene forward without dialogue.
    pub async fn beat(
        &self,
        session: &SessionContext,
        scene: Scene<'_>,
    ) -> Result<String, DialogueError> {
        let request = self.request(NarrationKind::NarrativeBeat, scene)?;
        let beat: NarrativeBeat = self.completion.produce(session, request).await?;
        Ok(beat.narrative_beat)
    }

    fn request(
        &self,
        kind: NarrationKind,
        scene: Scene<'_>,
    ) -> Result<CompletionRequest, DialogueError> {
        let context = narration_context(
            kind,
            scene.registry,
            scene.transcript,
            scene.place,
            scene.purpose,
            self.settings.transcript_excerpt_chars,
        )?;
        Ok(
            CompletionRequest::new(self.settings.model.clone(), context.into_messages())
                .with_temperature(self.settings.temperature)
                .with_top_p(self.settings.top_p),
        )
    }
}
