//! Application handlers.
//!
//! Handlers that orchestrate domain operations against the ports.

pub mod dialogue;

pub use dialogue::{
    // Session
    ConversationSession,
    DialogueServices,
    SpokenTurn,
    TurnEvent,
    TurnOutcome,
    // Turn stages
    CompletionSpeakerChooser,
    DialogueSummarizer,
    NarrationHandler,
    SpeakerChoice,
    SpeakerChooser,
    SpeechTurnHandler,
    TurnSelector,
};
