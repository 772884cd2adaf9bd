//! Durable record of an in-flight conversation.
//!
//! A [`SessionSnapshot`] is the only persisted form of an ongoing
//! conversation. Its presence in the session store means "resume";
//! its absence means "start fresh".

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::errors::ConversationError;
use super::participant::{Participant, ParticipantRegistry};
use super::transcript::Transcript;
use crate::domain::foundation::ParticipantId;

/// Snapshot decoding failures. Stores treat all of them as "no ongoing
/// conversation".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("Snapshot is missing the '{0}' field")]
    MissingField(&'static str),

    #[error("Snapshot is malformed: {0}")]
    Malformed(String),
}

/// Persona attributes of one participant as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub name: String,
    pub description: String,
    pub personality: String,
    pub equipment: String,
    #[serde(default)]
    pub voice_profile: Option<String>,
}

impl From<&Participant> for ParticipantRecord {
    fn from(participant: &Participant) -> Self {
        Self {
            name: participant.name().to_string(),
            description: participant.description().to_string(),
            personality: participant.personality().to_string(),
            equipment: participant.equipment().to_string(),
            voice_profile: participant.voice_profile().map(str::to_string),
        }
    }
}

/// `{participants, purpose, transcript}` as written to the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(with = "participant_map")]
    participants: Vec<(ParticipantId, ParticipantRecord)>,
    purpose: Option<String>,
    #[serde(default)]
    transcript: Vec<String>,
}

impl SessionSnapshot {
    /// Captures the current state of a conversation.
    pub fn capture(
        registry: &ParticipantRegistry,
        purpose: Option<&str>,
        transcript: &Transcript,
    ) -> Self {
        Self {
            participants: registry
                .iter()
                .map(|p| (p.id().clone(), ParticipantRecord::from(p)))
                .collect(),
            purpose: purpose.map(str::to_string),
            transcript: transcript.lines().to_vec(),
        }
    }

    /// Decodes a snapshot, requiring both `participants` and `purpose` keys.
    pub fn from_value(value: serde_json::Value) -> Result<Self, SnapshotError> {
        let object = value
            .as_object()
            .ok_or_else(|| SnapshotError::Malformed("expected a JSON object".to_string()))?;

        for field in ["participants", "purpose"] {
            if !object.contains_key(field) {
                return Err(SnapshotError::MissingField(field));
            }
        }

        serde_json::from_value(value).map_err(|e| SnapshotError::Malformed(e.to_string()))
    }

    /// Rebuilds the roster, purpose and transcript, revalidating every
    /// participant.
    pub fn hydrate(
        &self,
    ) -> Result<(ParticipantRegistry, Option<String>, Transcript), ConversationError> {
        let mut registry = ParticipantRegistry::new();
        for (id, record) in &self.participants {
            registry.insert(Participant::new(
                id.clone(),
                record.name.clone(),
                record.description.clone(),
                record.personality.clone(),
                record.equipment.clone(),
                record.voice_profile.clone(),
            )?);
        }
        Ok((
            registry,
            self.purpose.clone(),
            Transcript::from_lines(self.transcript.clone()),
        ))
    }

    pub fn purpose(&self) -> Option<&str> {
        self.purpose.as_deref()
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn participant_ids(&self) -> Vec<&ParticipantId> {
        self.participants.iter().map(|(id, _)| id).collect()
    }
}

/// Serializes the participant list as a JSON object keyed by id while
/// keeping roster order.
mod participant_map {
    use serde::de::{self, MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    use super::ParticipantRecord;
    use crate::domain::foundation::ParticipantId;

    pub fn serialize<S>(
        participants: &[(ParticipantId, ParticipantRecord)],
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(participants.len()))?;
        for (id, record) in participants {
            map.serialize_entry(id.as_str(), record)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<Vec<(ParticipantId, ParticipantRecord)>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedParticipants;

        impl<'de> Visitor<'de> for OrderedParticipants {
            type Value = Vec<(ParticipantId, ParticipantRecord)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of participant id to participant record")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Self::Value =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, record)) = access.next_entry::<String, ParticipantRecord>()? {
                    let id = ParticipantId::new(key).map_err(de::Error::custom)?;
                    entries.retain(|(existing, _)| existing != &id);
                    entries.push((id, record));
                }
                Ok(entries)
            }
        }

        deserializer.deserialize_map(OrderedParticipants)
    }
}
