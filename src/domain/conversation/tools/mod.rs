//! Structured-output tools for the conversation engine.
//!
//! Completions carry their payload as an embedded call block,
//! `<function=NAME>{JSON}</function>`, inside otherwise free text.
//!
//! ## Key Types
//!
//! - [`ResponseSanitizer`] - Ordered textual repairs applied before parsing
//! - [`parse_tool_call`] - Extracts a [`ParsedCall`] from raw text
//! - [`call_from_structured`] - Accepts a value the backend already structured
//! - [`ToolProjection`] - Typed view of a call for each call kind
//! - [`ToolDefinition`] - Schema rendered into the system preamble

mod parser;
mod projections;
mod sanitizer;
mod tool_call;
mod tool_definition;

pub use parser::{call_from_structured, parse_tool_call, ParseFailureKind, ToolParseError};
pub use projections::{
    AmbientNarration, CharacterSheet, DialogueSummary, NarrativeBeat, SpeakerChoiceCall,
    SpeechTurn, ToolProjection, FALLBACK_NARRATION, FALLBACK_SPEECH,
};
pub use sanitizer::{ResponseSanitizer, CLOSING_TAG};
pub use tool_call::ParsedCall;
pub use tool_definition::{
    ambient_narration_definition, character_definition, narrative_beat_definition,
    speaker_choice_definition, speech_definition, summary_definition, tool_instructions,
    ToolDefinition,
};
