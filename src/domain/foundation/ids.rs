//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Identifier of a conversation member.
///
/// Participant identifiers are numeric strings (`"1"`, `"42"`) because they
/// double as keys into the character store. Anything that does not parse as
/// an integer is rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Creates a participant id, validating that it is integer-parseable.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("identifier"));
        }
        if trimmed.parse::<i64>().is_err() {
            return Err(ValidationError::invalid_format(
                "identifier",
                format!("'{}' is not convertible to an integer", trimmed),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the identifier as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the numeric value of the identifier.
    pub fn as_number(&self) -> i64 {
        // Validated at construction.
        self.0.parse().unwrap_or_default()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

/// Name of a narrative playthrough; scopes all persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlaythroughName(String);

impl PlaythroughName {
    /// Creates a playthrough name. Path separators and parent references are
    /// rejected since the name becomes a directory on disk.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("playthrough_name"));
        }
        if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
            return Err(ValidationError::invalid_format(
                "playthrough_name",
                "must not contain path separators",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaythroughName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PlaythroughName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlaythroughName> for String {
    fn from(name: PlaythroughName) -> Self {
        name.0
    }
}

/// Unique identifier for one running conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random SessionId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a SessionId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_id_accepts_integer_strings() {
        let id = ParticipantId::new("42").unwrap();
        assert_eq!(id.as_str(), "42");
        assert_eq!(id.as_number(), 42);
    }

    #[test]
    fn participant_id_trims_whitespace() {
        let id = ParticipantId::new(" 7 ").unwrap();
        assert_eq!(id.as_str(), "7");
    }

    #[test]
    fn participant_id_rejects_non_numeric() {
        let err = ParticipantId::new("abc").unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { .. }));
    }

    #[test]
    fn participant_id_rejects_empty() {
        let err = ParticipantId::new("  ").unwrap_err();
        assert!(matches!(err, ValidationError::EmptyField { .. }));
    }

    #[test]
    fn participant_id_deserializes_through_validation() {
        let ok: ParticipantId = serde_json::from_str("\"3\"").unwrap();
        assert_eq!(ok.as_str(), "3");

        let bad = serde_json::from_str::<ParticipantId>("\"three\"");
        assert!(bad.is_err());
    }

    #[test]
    fn playthrough_name_rejects_path_separators() {
        assert!(PlaythroughName::new("campaign/one").is_err());
        assert!(PlaythroughName::new("..").is_err());
        assert!(PlaythroughName::new("").is_err());
        assert_eq!(PlaythroughName::new("campaign").unwrap().as_str(), "campaign");
    }

    #[test]
    fn session_id_round_trips_through_string() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
