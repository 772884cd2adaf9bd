//! Error types for the domain layer.

use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Machine-checkable codes attached to externally visible failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,
    InvalidParticipant,
    EmptyMessage,

    // Roster errors
    UnknownParticipant,
    NotEnoughParticipants,
    InvalidNextSpeaker,

    // State errors
    InvalidStateTransition,

    // Completion errors
    CompletionFailed,
    InvalidStructuredOutput,

    // Infrastructure errors
    StorageError,
    CollaboratorError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::InvalidParticipant => "INVALID_PARTICIPANT",
            ErrorCode::EmptyMessage => "EMPTY_MESSAGE",
            ErrorCode::UnknownParticipant => "UNKNOWN_PARTICIPANT",
            ErrorCode::NotEnoughParticipants => "NOT_ENOUGH_PARTICIPANTS",
            ErrorCode::InvalidNextSpeaker => "INVALID_NEXT_SPEAKER",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::CompletionFailed => "COMPLETION_FAILED",
            ErrorCode::InvalidStructuredOutput => "INVALID_STRUCTURED_OUTPUT",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::CollaboratorError => "COLLABORATOR_ERROR",
        };
        write!(f, "{}", s)
    }
}
