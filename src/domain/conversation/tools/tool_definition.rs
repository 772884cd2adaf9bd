//! Tool definition - schema and metadata for a call the backend may emit.
//!
//! Each call kind the conversation engine understands has a definition here.
//! Definitions are rendered into the system preamble so the backend knows the
//! exact argument shape expected inside `<function=NAME>{JSON}</function>`.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::projections::{
    AmbientNarration, CharacterSheet, DialogueSummary, NarrativeBeat, SpeakerChoiceCall,
    SpeechTurn, ToolProjection,
};

/// Definition of a call the completion backend can produce.
///
/// # Examples
///
/// ```ignore
/// use colloquy::domain::conversation::tools::ToolDefinition;
///
/// let definition = ToolDefinition::new(
///     "summarize_dialogue",
///     "Summarize the dialogue so far",
///     serde_json::json!({
///         "type": "object",
///         "required": ["summary"],
///         "properties": { "summary": { "type": "string" } }
///     }),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the call (e.g., "generate_speech")
    name: String,

    /// Human-readable description shown to the backend
    description: String,

    /// JSON Schema for the arguments
    parameters_schema: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters_schema: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters_schema,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters_schema(&self) -> &serde_json::Value {
        &self.parameters_schema
    }

    /// Names of the arguments the schema marks as required.
    pub fn required_fields(&self) -> Vec<&str> {
        self.parameters_schema["required"]
            .as_array()
            .map(|fields| fields.iter().filter_map(|f| f.as_str()).collect())
            .unwrap_or_default()
    }

    /// Converts to OpenAI tool format.
    ///
    /// Used when the backend enforces a schema and replies with `tool_calls`.
    pub fn to_openai_format(&self) -> serde_json::Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters_schema
            }
        })
    }
}

/// Text appended to a system preamble describing how to emit `definition`.
pub fn tool_instructions(definition: &ToolDefinition) -> String {
    format!(
        "You have access to the following function:\n\n\
         Use the function '{name}' to '{description}':\n\
         {schema}\n\n\
         If you choose to call a function, ONLY reply in the following format with no prefix or suffix:\n\n\
         <function={name}>{{\"example_name\": \"example_value\"}}</function>\n\n\
         Reminder:\n\
         - Function calls MUST follow the specified format, start with <function= and end with </function>\n\
         - Required parameters MUST be specified\n\
         - Only call one function at a time\n\
         - Put the entire function call reply on one line",
        name = definition.name(),
        description = definition.description(),
        schema = definition.parameters_schema(),
    )
}

fn string_property(description: &str) -> serde_json::Value {
    json!({ "type": "string", "description": description })
}

pub fn speaker_choice_definition() -> ToolDefinition {
    ToolDefinition::new(
        SpeakerChoiceCall::FUNCTION,
        "Choose who should speak next in the ongoing dialogue",
        json!({
            "type": "object",
            "required": ["identifier", "name", "reason"],
            "properties": {
                "identifier": string_property("The identifier of the participant who will speak next"),
                "name": string_property("The name of the participant who will speak next"),
                "reason": string_property("A short justification of why this participant speaks now")
            }
        }),
    )
}

pub fn speech_definition() -> ToolDefinition {
    ToolDefinition::new(
        SpeechTurn::FUNCTION,
        "Generate the next speech of a character in the dialogue",
        json!({
            "type": "object",
            "required": ["name", "speech", "narration_text"],
            "properties": {
                "name": string_property("The name of the character who speaks"),
                "narration_text": string_property(
                    "A brief, vivid description of the character's gestures and actions while speaking, in third person"
                ),
                "speech": string_property("What the character says, in their own voice"),
                "thoughts": string_property("What the character is privately thinking"),
                "desired_action": string_property("What the character wants to do next")
            }
        }),
    )
}

pub fn summary_definition() -> ToolDefinition {
    ToolDefinition::new(
        DialogueSummary::FUNCTION,
        "Summarize the dialogue from a neutral point of view",
        json!({
            "type": "object",
            "required": ["summary"],
            "properties": {
                "summary": string_property("A concise summary of what was said and decided")
            }
        }),
    )
}

pub fn narrative_beat_definition() -> ToolDefinition {
    ToolDefinition::new(
        NarrativeBeat::FUNCTION,
        "Move the scene forward with a short narrative beat",
        json!({
            "type": "object",
            "required": ["narrative_beat"],
            "properties": {
                "narrative_beat": string_property(
                    "A few sentences describing what happens next, without dialogue"
                )
            }
        }),
    )
}

pub fn ambient_narration_definition() -> ToolDefinition {
    ToolDefinition::new(
        AmbientNarration::FUNCTION,
        "Describe the ambience of the place where the dialogue happens",
        json!({
            "type": "object",
            "required": ["ambient_narration"],
            "properties": {
                "ambient_narration": string_property(
                    "A few sentences on sounds, smells and movement around the participants"
                )
            }
        }),
    )
}

pub fn character_definition() -> ToolDefinition {
    ToolDefinition::new(
        CharacterSheet::FUNCTION,
        "Generate a character that fits the world",
        json!({
            "type": "object",
            "required": ["name", "description", "personality", "equipment"],
            "properties": {
                "name": string_property("Full name"),
                "description": string_property("Physical description"),
                "personality": string_property("Personality traits"),
                "profile": string_property("Background and history"),
                "likes": string_property("Things the character likes"),
                "dislikes": string_property("Things the character dislikes"),
                "secrets": string_property("Secrets the character keeps"),
                "equipment": string_property("What the character carries"),
                "voice_profile": string_property("A short label for the character's voice")
            }
        }),
    )
}
