//! In-Memory Session Store Adapter
//!
//! Keeps snapshots in memory. Useful for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::conversation::SessionSnapshot;
use crate::domain::foundation::PlaythroughName;
use crate::ports::{SessionStore, SessionStoreError};

/// In-memory storage for conversation snapshots
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    snapshots: Arc<RwLock<HashMap<PlaythroughName, SessionSnapshot>>>,
    saves: Arc<RwLock<usize>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls so far (useful for write-through checks)
    pub async fn save_count(&self) -> usize {
        *self.saves.read().await
    }

    /// Get the stored snapshot without going through the port
    pub async fn peek(&self, playthrough: &PlaythroughName) -> Option<SessionSnapshot> {
        self.snapshots.read().await.get(playthrough).cloned()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(
        &self,
        playthrough: &PlaythroughName,
    ) -> Result<Option<SessionSnapshot>, SessionStoreError> {
        Ok(self.snapshots.read().await.get(playthrough).cloned())
    }

    async fn save(
        &self,
        playthrough: &PlaythroughName,
        snapshot: &SessionSnapshot,
    ) -> Result<(), SessionStoreError> {
        self.snapshots
            .write()
            .await
            .insert(playthrough.clone(), snapshot.clone());
        *self.saves.write().await += 1;
        Ok(())
    }

    async fn delete(&self, playthrough: &PlaythroughName) -> Result<(), SessionStoreError> {
        self.snapshots.write().await.remove(playthrough);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::{ParticipantRegistry, Transcript};

    #[tokio::test]
    async fn save_load_delete_cycle() {
        let store = InMemorySessionStore::new();
        let playthrough = PlaythroughName::new("caravan").unwrap();
        let snapshot = SessionSnapshot::capture(&ParticipantRegistry::new(), None, &Transcript::new());

        assert_eq!(store.load(&playthrough).await.unwrap(), None);
        store.save(&playthrough, &snapshot).await.unwrap();
        assert_eq!(store.load(&playthrough).await.unwrap(), Some(snapshot));
        assert_eq!(store.save_count().await, 1);

        store.delete(&playthrough).await.unwrap();
        assert!(store.peek(&playthrough).await.is_none());
    }
}
