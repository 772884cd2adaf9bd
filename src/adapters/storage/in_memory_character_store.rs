//! In-Memory Character Store Adapter
//!
//! Keeps profiles, memories and places in memory. Useful for testing and
//! development. Playthroughs are not separated.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{ParticipantId, PlaythroughName};
use crate::ports::{CharacterProfile, CharacterStore, CollaboratorError, MemoryStore, PlaceStore};

/// In-memory character, memory and place store
#[derive(Debug, Clone, Default)]
pub struct InMemoryCharacterStore {
    profiles: Arc<RwLock<HashMap<ParticipantId, CharacterProfile>>>,
    memories: Arc<RwLock<HashMap<ParticipantId, Vec<String>>>>,
    places: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_character(&self, id: ParticipantId, profile: CharacterProfile) {
        self.profiles.write().await.insert(id, profile);
    }

    pub async fn add_place(&self, place: impl Into<String>, description: impl Into<String>) {
        self.places.write().await.insert(place.into(), description.into());
    }

    /// Memories appended for a character, in order
    pub async fn memories_of(&self, id: &ParticipantId) -> Vec<String> {
        self.memories.read().await.get(id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CharacterStore for InMemoryCharacterStore {
    async fn load_character(
        &self,
        _playthrough: &PlaythroughName,
        id: &ParticipantId,
    ) -> Result<CharacterProfile, CollaboratorError> {
        self.profiles
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CollaboratorError::CharacterNotFound(id.clone()))
    }

    async fn load_memories(
        &self,
        _playthrough: &PlaythroughName,
        id: &ParticipantId,
    ) -> Result<String, CollaboratorError> {
        Ok(self
            .memories
            .read()
            .await
            .get(id)
            .map(|memories| memories.join("\n"))
            .unwrap_or_default())
    }
}

#[async_trait]
impl MemoryStore for InMemoryCharacterStore {
    async fn append_memory(
        &self,
        _playthrough: &PlaythroughName,
        id: &ParticipantId,
        memory: &str,
    ) -> Result<(), CollaboratorError> {
        self.memories
            .write()
            .await
            .entry(id.clone())
            .or_default()
            .push(memory.to_string());
        Ok(())
    }
}

#[async_trait]
impl PlaceStore for InMemoryCharacterStore {
    async fn describe_place(
        &self,
        _playthrough: &PlaythroughName,
        place: &str,
    ) -> Result<String, CollaboratorError> {
        self.places
            .read()
            .await
            .get(place)
            .cloned()
            .ok_or_else(|| CollaboratorError::PlaceNotFound(place.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memories_join_in_order() {
        let store = InMemoryCharacterStore::new();
        let playthrough = PlaythroughName::new("caravan").unwrap();
        let id = ParticipantId::new("2").unwrap();

        store.append_memory(&playthrough, &id, "First.").await.unwrap();
        store.append_memory(&playthrough, &id, "Second.").await.unwrap();

        assert_eq!(store.load_memories(&playthrough, &id).await.unwrap(), "First.\nSecond.");
        assert_eq!(store.memories_of(&id).await.len(), 2);
    }
}
