//! Conversation domain module.
//!
//! Holds the roster, the append-only transcript, per-turn prompt assembly,
//! the snapshot that marks a conversation as ongoing, and the structured
//! call format completions are parsed from.

mod context;
mod errors;
mod participant;
mod prompts;
mod session_context;
mod snapshot;
mod transcript;
mod turn_state;
pub mod tools;

pub use context::{Message, MessageRole, PromptContextBuilder};
pub use errors::ConversationError;
pub use participant::{Participant, ParticipantRegistry};
pub use prompts::{
    narration_context, speaker_choice_context, speech_turn_context, summary_context,
    NarrationKind, SpeechDirective, SpeechPrompt,
};
pub use session_context::SessionContext;
pub use snapshot::{ParticipantRecord, SessionSnapshot, SnapshotError};
pub use transcript::{Transcript, SUFFICIENT_TRANSCRIPT_LINES};
pub use turn_state::TurnState;
