//! Dialogue handlers.
//!
//! Speaker selection, speech generation, summarization and narration, plus
//! the [`ConversationSession`] that strings them into turns.

mod narration;
mod session;
mod speech_turn;
mod summarize_dialogue;
mod turn_selector;

pub use narration::{NarrationHandler, Scene};
pub use session::{ConversationSession, DialogueServices, SpokenTurn, TurnEvent, TurnOutcome};
pub use speech_turn::{SpeechInput, SpeechTurnHandler};
pub use summarize_dialogue::DialogueSummarizer;
pub use turn_selector::{
    CompletionSpeakerChooser, SpeakerChoice, SpeakerChooser, TurnSelector, MAX_CHOICE_ATTEMPTS,
};
