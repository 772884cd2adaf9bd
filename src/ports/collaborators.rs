//! Collaborator Ports - Character, memory and place lookups.
//!
//! These are consumed only through narrow interfaces; content generation
//! for characters and places lives outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ParticipantId, PlaythroughName};

/// Errors raised by collaborator stores
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("Character not found: {0}")]
    CharacterNotFound(ParticipantId),

    #[error("Place not found: {0}")]
    PlaceNotFound(String),

    #[error("Malformed record: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Persona attributes of a character, as stored by the playthrough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub name: String,
    pub description: String,
    pub personality: String,
    pub equipment: String,
    #[serde(default)]
    pub voice_profile: Option<String>,
}

/// Port for loading character bios and memories
#[async_trait]
pub trait CharacterStore: Send + Sync {
    async fn load_character(
        &self,
        playthrough: &PlaythroughName,
        id: &ParticipantId,
    ) -> Result<CharacterProfile, CollaboratorError>;

    /// Remembered text of a character. A character without memories
    /// yields an empty string.
    async fn load_memories(
        &self,
        playthrough: &PlaythroughName,
        id: &ParticipantId,
    ) -> Result<String, CollaboratorError>;
}

/// Port for appending durable per-character memories
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn append_memory(
        &self,
        playthrough: &PlaythroughName,
        id: &ParticipantId,
        memory: &str,
    ) -> Result<(), CollaboratorError>;
}

/// Port for location descriptions used in prompt context
#[async_trait]
pub trait PlaceStore: Send + Sync {
    async fn describe_place(
        &self,
        playthrough: &PlaythroughName,
        place: &str,
    ) -> Result<String, CollaboratorError>;
}
