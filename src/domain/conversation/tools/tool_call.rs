//! Parsed tool-call value object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::sanitizer::CLOSING_TAG;

/// A structured call recovered from a completion.
///
/// # Examples
///
/// ```ignore
/// use colloquy::domain::conversation::tools::ParsedCall;
///
/// let call = ParsedCall::new(
///     "choose_speech_turn",
///     serde_json::json!({ "identifier": "2", "name": "Alice" })
///         .as_object()
///         .cloned()
///         .unwrap_or_default(),
/// );
/// assert_eq!(call.to_wire(), r#"<function=choose_speech_turn>{"identifier":"2","name":"Alice"}</function>"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCall {
    /// Name of the function the completion invoked
    function: String,

    /// Decoded arguments (JSON object)
    arguments: Map<String, Value>,
}

impl ParsedCall {
    pub fn new(function: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            function: function.into(),
            arguments,
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    pub fn into_arguments(self) -> Map<String, Value> {
        self.arguments
    }

    /// Renders the call in the `<function=NAME>{JSON}</function>` wire form.
    pub fn to_wire(&self) -> String {
        let json = Value::Object(self.arguments.clone()).to_string();
        format!("<function={}>{}{}", self.function, json, CLOSING_TAG)
    }
}
