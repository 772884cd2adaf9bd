//! Conversation domain errors.

use thiserror::Error;

use crate::domain::foundation::{ErrorCode, ParticipantId, ValidationError};

/// Errors raised by roster, transcript and turn-selection rules.
///
/// These signal contract violations rather than transient noise, so
/// callers never retry them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("Invalid participant: {reason}")]
    InvalidParticipant { reason: String },

    #[error("Participant '{0}' is not part of the conversation")]
    UnknownParticipant(ParticipantId),

    #[error("A conversation needs at least two participants, found {count}")]
    NotEnoughParticipants { count: usize },

    #[error("Invalid next speaker: {reason}")]
    InvalidNextSpeaker { reason: String },

    #[error("Message content cannot be empty")]
    EmptyMessage,

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl ConversationError {
    /// Creates an invalid participant error.
    pub fn invalid_participant(reason: impl Into<String>) -> Self {
        Self::InvalidParticipant {
            reason: reason.into(),
        }
    }

    /// Creates an invalid next speaker error.
    pub fn invalid_next_speaker(reason: impl Into<String>) -> Self {
        Self::InvalidNextSpeaker {
            reason: reason.into(),
        }
    }

    /// Returns the machine-checkable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidParticipant { .. } => ErrorCode::InvalidParticipant,
            Self::UnknownParticipant(_) => ErrorCode::UnknownParticipant,
            Self::NotEnoughParticipants { .. } => ErrorCode::NotEnoughParticipants,
            Self::InvalidNextSpeaker { .. } => ErrorCode::InvalidNextSpeaker,
            Self::EmptyMessage => ErrorCode::EmptyMessage,
            Self::InvalidState(_) => ErrorCode::InvalidStateTransition,
        }
    }
}

impl From<ValidationError> for ConversationError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidParticipant {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_next_speaker_carries_reason_and_code() {
        let err = ConversationError::invalid_next_speaker("the human cannot be chosen");
        assert!(err.to_string().contains("the human cannot be chosen"));
        assert_eq!(err.code(), ErrorCode::InvalidNextSpeaker);
    }

    #[test]
    fn validation_errors_become_invalid_participant() {
        let err: ConversationError = ValidationError::empty_field("name").into();
        assert_eq!(err.code(), ErrorCode::InvalidParticipant);
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn not_enough_participants_reports_count() {
        let err = ConversationError::NotEnoughParticipants { count: 1 };
        assert_eq!(
            err.to_string(),
            "A conversation needs at least two participants, found 1"
        );
    }
}
