//! Typed views over a [`ParsedCall`], one per call kind.
//!
//! Optional fields default to an empty string rather than a null so that
//! rendering never emits placeholders such as `"None: speech"`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::parser::ToolParseError;
use super::tool_call::ParsedCall;

/// Projection of a generic call onto the fields of one call kind.
pub trait ToolProjection: Sized {
    /// Function name this projection expects.
    const FUNCTION: &'static str;

    fn from_call(call: &ParsedCall) -> Result<Self, ToolParseError>;
}

fn expect_function(call: &ParsedCall, expected: &str) -> Result<(), ToolParseError> {
    if call.function() != expected {
        return Err(ToolParseError::UnexpectedFunction {
            expected: expected.to_string(),
            actual: call.function().to_string(),
        });
    }
    Ok(())
}

fn text_field(call: &ParsedCall, field: &str) -> Option<String> {
    match call.arguments().get(field)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::trim))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Null | Value::Object(_) => None,
    }
}

fn required(call: &ParsedCall, field: &str) -> Result<String, ToolParseError> {
    text_field(call, field)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ToolParseError::MissingField {
            function: call.function().to_string(),
            field: field.to_string(),
        })
}

fn optional(call: &ParsedCall, field: &str) -> String {
    text_field(call, field).unwrap_or_default()
}

/// The chooser's pick for the next speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerChoiceCall {
    pub identifier: String,
    pub name: String,
    pub reason: String,
}

impl ToolProjection for SpeakerChoiceCall {
    const FUNCTION: &'static str = "choose_speech_turn";

    fn from_call(call: &ParsedCall) -> Result<Self, ToolParseError> {
        expect_function(call, Self::FUNCTION)?;
        Ok(Self {
            identifier: required(call, "identifier")?,
            name: optional(call, "name"),
            reason: optional(call, "reason"),
        })
    }
}

/// Narration shown when a character's turn could not be generated.
pub const FALLBACK_NARRATION: &str = "Looks confused.";
/// Speech used when a character's turn could not be generated.
pub const FALLBACK_SPEECH: &str = "I don't know what to say.";

/// One character's generated turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechTurn {
    pub name: String,
    pub narration_text: String,
    pub speech: String,
    pub thoughts: String,
    pub desired_action: String,
}

impl SpeechTurn {
    /// Turn used after the backend repeatedly failed to produce one.
    pub fn fallback(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            narration_text: FALLBACK_NARRATION.to_string(),
            speech: FALLBACK_SPEECH.to_string(),
            thoughts: String::new(),
            desired_action: String::new(),
        }
    }

    /// Narration, or a neutral stand-in when the backend gave none.
    pub fn narration_for(&self, speaker: &str) -> String {
        let narration = self.narration_text.trim();
        if narration.is_empty() || narration.eq_ignore_ascii_case("none") {
            format!("{} takes a moment to speak.", speaker)
        } else {
            narration.to_string()
        }
    }

    /// Text that follows `"{speaker}: "` in the transcript.
    pub fn transcript_text(&self, speaker: &str) -> String {
        format!("*{}* {}", self.narration_for(speaker), self.speech)
    }
}

impl ToolProjection for SpeechTurn {
    const FUNCTION: &'static str = "generate_speech";

    fn from_call(call: &ParsedCall) -> Result<Self, ToolParseError> {
        expect_function(call, Self::FUNCTION)?;
        Ok(Self {
            name: required(call, "name")?,
            narration_text: optional(call, "narration_text"),
            speech: required(call, "speech")?,
            thoughts: optional(call, "thoughts"),
            desired_action: optional(call, "desired_action"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueSummary {
    pub summary: String,
}

impl ToolProjection for DialogueSummary {
    const FUNCTION: &'static str = "summarize_dialogue";

    fn from_call(call: &ParsedCall) -> Result<Self, ToolParseError> {
        expect_function(call, Self::FUNCTION)?;
        Ok(Self {
            summary: required(call, "summary")?,
        })
    }
}

/// A few sentences that move the scene forward without dialogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeBeat {
    pub narrative_beat: String,
}

impl ToolProjection for NarrativeBeat {
    const FUNCTION: &'static str = "generate_narrative_beat";

    fn from_call(call: &ParsedCall) -> Result<Self, ToolParseError> {
        expect_function(call, Self::FUNCTION)?;
        Ok(Self {
            narrative_beat: required(call, "narrative_beat")?,
        })
    }
}

/// Atmospheric description of the surroundings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbientNarration {
    pub ambient_narration: String,
}

impl ToolProjection for AmbientNarration {
    const FUNCTION: &'static str = "generate_ambient_narration";

    fn from_call(call: &ParsedCall) -> Result<Self, ToolParseError> {
        expect_function(call, Self::FUNCTION)?;
        Ok(Self {
            ambient_narration: required(call, "ambient_narration")?,
        })
    }
}

/// Generated character data, as handed to the character store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub name: String,
    pub description: String,
    pub personality: String,
    pub profile: String,
    pub likes: String,
    pub dislikes: String,
    pub secrets: String,
    pub equipment: String,
    pub voice_profile: String,
}

impl ToolProjection for CharacterSheet {
    const FUNCTION: &'static str = "generate_character";

    fn from_call(call: &ParsedCall) -> Result<Self, ToolParseError> {
        expect_function(call, Self::FUNCTION)?;
        Ok(Self {
            name: required(call, "name")?,
            description: required(call, "description")?,
            personality: optional(call, "personality"),
            profile: optional(call, "profile"),
            likes: optional(call, "likes"),
            dislikes: optional(call, "dislikes"),
            secrets: optional(call, "secrets"),
            equipment: optional(call, "equipment"),
            voice_profile: optional(call, "voice_profile"),
        })
    }
}
