//! Identity of a running conversation, threaded through every call.

use crate::domain::foundation::{ParticipantId, PlaythroughName, SessionId};

/// Who and where a conversation session belongs to.
///
/// Stores, handlers and prompts receive this value explicitly instead of
/// reading ambient globals, so independent sessions never share state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    session_id: SessionId,
    playthrough: PlaythroughName,
    human_id: ParticipantId,
    place: Option<String>,
}

impl SessionContext {
    pub fn new(playthrough: PlaythroughName, human_id: ParticipantId) -> Self {
        Self {
            session_id: SessionId::new(),
            playthrough,
            human_id,
            place: None,
        }
    }

    /// Sets the identifier of the place where the conversation happens.
    pub fn with_place(mut self, place: impl Into<String>) -> Self {
        self.place = Some(place.into());
        self
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn playthrough(&self) -> &PlaythroughName {
        &self.playthrough
    }

    pub fn human_id(&self) -> &ParticipantId {
        &self.human_id
    }

    pub fn place(&self) -> Option<&str> {
        self.place.as_deref()
    }
}
