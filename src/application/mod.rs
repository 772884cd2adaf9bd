//! Application layer - Handlers and the completion pipeline.
//!
//! This layer orchestrates domain operations and coordinates between ports:
//!
//! - [`CompletionGateway`] - One backend call with classified retries
//! - [`StructuredCompletion`] - Typed completions with structural retries
//! - [`handlers`] - Turn selection, speech, summaries, narration, sessions

pub mod completion_gateway;
mod errors;
pub mod handlers;
mod settings;
pub mod structured_completion;

pub use completion_gateway::{
    Backoff, CompletionGateway, RecordingBackoff, RetryDecision, RetryPolicy, TokioBackoff,
};
pub use errors::DialogueError;
pub use handlers::{
    CompletionSpeakerChooser, ConversationSession, DialogueServices, DialogueSummarizer,
    NarrationHandler, SpeakerChoice, SpeakerChooser, SpeechTurnHandler, SpokenTurn, TurnEvent,
    TurnOutcome, TurnSelector,
};
pub use settings::DialogueSettings;
pub use structured_completion::{project_content, StructuredCompletion};
