//! Recovery of a [`ParsedCall`] from completion output.
//!
//! The parser never panics and never surfaces anything but a typed
//! [`ToolParseError`]; callers decide whether a failure is worth a retry.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use super::sanitizer::ResponseSanitizer;
use super::tool_call::ParsedCall;

static FUNCTION_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<function=(\w+)>(.*?)</function>").expect("static regex"));

/// Machine-checkable classification of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseFailureKind {
    EmptyResponse,
    NoFunctionCall,
    ArgDecodeFailure,
    UnexpectedFunction,
    MissingField,
}

/// Structural failures while turning completion text into a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolParseError {
    #[error("Completion was empty")]
    EmptyResponse,

    #[error("No function call found in completion: {raw}")]
    NoFunctionCall { raw: String },

    #[error("Function arguments could not be decoded ({reason}): {raw}")]
    ArgDecodeFailure { reason: String, raw: String },

    #[error("Expected a call to '{expected}' but got '{actual}'")]
    UnexpectedFunction { expected: String, actual: String },

    #[error("Call to '{function}' is missing required field '{field}'")]
    MissingField { function: String, field: String },
}

impl ToolParseError {
    pub fn kind(&self) -> ParseFailureKind {
        match self {
            Self::EmptyResponse => ParseFailureKind::EmptyResponse,
            Self::NoFunctionCall { .. } => ParseFailureKind::NoFunctionCall,
            Self::ArgDecodeFailure { .. } => ParseFailureKind::ArgDecodeFailure,
            Self::UnexpectedFunction { .. } => ParseFailureKind::UnexpectedFunction,
            Self::MissingField { .. } => ParseFailureKind::MissingField,
        }
    }

    /// Whether asking the backend again can fix this output.
    ///
    /// A call with the wrong name or a missing field is a validation
    /// failure and is raised immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ParseFailureKind::EmptyResponse
                | ParseFailureKind::NoFunctionCall
                | ParseFailureKind::ArgDecodeFailure
        )
    }
}

/// Sanitizes `raw` and extracts the first `<function=NAME>{JSON}</function>`
/// block.
///
/// Argument keys are trimmed recursively.
pub fn parse_tool_call(raw: &str) -> Result<ParsedCall, ToolParseError> {
    if raw.trim().is_empty() {
        return Err(ToolParseError::EmptyResponse);
    }

    let sanitized = ResponseSanitizer::new().sanitize(raw);
    let captures = FUNCTION_CALL
        .captures(&sanitized)
        .ok_or_else(|| ToolParseError::NoFunctionCall {
            raw: raw.to_string(),
        })?;

    let function = captures[1].to_string();
    let arguments: Value =
        serde_json::from_str(&captures[2]).map_err(|e| ToolParseError::ArgDecodeFailure {
            reason: e.to_string(),
            raw: raw.to_string(),
        })?;

    match trim_keys(arguments) {
        Value::Object(map) => Ok(ParsedCall::new(function, map)),
        other => Err(ToolParseError::ArgDecodeFailure {
            reason: format!("expected a JSON object, found {}", json_type(&other)),
            raw: raw.to_string(),
        }),
    }
}

/// Builds a call from a value the backend already structured.
///
/// Accepts `{"function": NAME, "arguments": {...}}` (arguments may also be a
/// JSON-encoded string) or a bare argument object, in which case
/// `expected_function` names the call.
pub fn call_from_structured(
    value: Value,
    expected_function: &str,
) -> Result<ParsedCall, ToolParseError> {
    let raw = value.to_string();
    let Value::Object(mut object) = trim_keys(value) else {
        return Err(ToolParseError::ArgDecodeFailure {
            reason: "structured completion is not an object".to_string(),
            raw,
        });
    };

    let function = match object.get("function") {
        Some(Value::String(name)) if object.contains_key("arguments") => name.clone(),
        _ => return Ok(ParsedCall::new(expected_function, object)),
    };

    let arguments = match object.remove("arguments") {
        Some(Value::Object(map)) => map,
        Some(Value::String(encoded)) => match serde_json::from_str::<Value>(&encoded) {
            Ok(Value::Object(map)) => trim_object_keys(map),
            Ok(other) => {
                return Err(ToolParseError::ArgDecodeFailure {
                    reason: format!("expected a JSON object, found {}", json_type(&other)),
                    raw,
                })
            }
            Err(e) => {
                return Err(ToolParseError::ArgDecodeFailure {
                    reason: e.to_string(),
                    raw,
                })
            }
        },
        _ => {
            return Err(ToolParseError::ArgDecodeFailure {
                reason: "arguments must be an object".to_string(),
                raw,
            })
        }
    };

    Ok(ParsedCall::new(function, arguments))
}

fn trim_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(trim_object_keys(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(trim_keys).collect()),
        other => other,
    }
}

fn trim_object_keys(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(k, v)| (k.trim().to_string(), trim_keys(v)))
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
