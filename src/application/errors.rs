//! Errors surfaced by the dialogue handlers.

use thiserror::Error;

use crate::domain::conversation::tools::ToolParseError;
use crate::domain::conversation::ConversationError;
use crate::domain::foundation::ErrorCode;
use crate::ports::{AIError, CollaboratorError, SessionStoreError};

/// Union of everything that can go wrong while running a conversation.
#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("Completion failed: {0}")]
    Completion(#[from] AIError),

    #[error(transparent)]
    Conversation(#[from] ConversationError),

    /// A single structural failure. Callers with a retry budget consume it;
    /// it only escapes a handler when no budget applies.
    #[error("Invalid structured output: {0}")]
    Parse(#[from] ToolParseError),

    #[error("Unable to produce valid structured output for '{function}' after {attempts} attempts")]
    UnableToProduceValidOutput {
        function: &'static str,
        attempts: u32,
    },

    #[error("Session store error: {0}")]
    Store(#[from] SessionStoreError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("The conversation has already ended")]
    SessionEnded,
}

impl DialogueError {
    /// Returns the machine-checkable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Completion(_) => ErrorCode::CompletionFailed,
            Self::Conversation(err) => err.code(),
            Self::Parse(_) | Self::UnableToProduceValidOutput { .. } => {
                ErrorCode::InvalidStructuredOutput
            }
            Self::Store(_) => ErrorCode::StorageError,
            Self::Collaborator(_) => ErrorCode::CollaboratorError,
            Self::SessionEnded => ErrorCode::InvalidStateTransition,
        }
    }
}
