//! Session Store Port - Interface for persisting in-flight conversations.
//!
//! The presence of a well-formed snapshot for a playthrough is the only
//! signal that a conversation is ongoing. Implementations must therefore
//! report a missing or malformed snapshot as `Ok(None)`, not as an error.

use async_trait::async_trait;

use crate::domain::conversation::SessionSnapshot;
use crate::domain::foundation::PlaythroughName;

/// Errors that can occur during session store operations
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Failed to serialize snapshot: {0}")]
    SerializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Port for persisting and resuming conversation snapshots
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the ongoing conversation of a playthrough
    ///
    /// # Returns
    /// `None` when no snapshot exists or the stored one is malformed
    ///
    /// # Errors
    /// Returns `SessionStoreError::IoError` for storage failures other than
    /// a missing snapshot
    async fn load(
        &self,
        playthrough: &PlaythroughName,
    ) -> Result<Option<SessionSnapshot>, SessionStoreError>;

    /// Overwrite the snapshot of a playthrough
    async fn save(
        &self,
        playthrough: &PlaythroughName,
        snapshot: &SessionSnapshot,
    ) -> Result<(), SessionStoreError>;

    /// Remove the snapshot of a playthrough. Removing a missing snapshot
    /// succeeds.
    async fn delete(&self, playthrough: &PlaythroughName) -> Result<(), SessionStoreError>;
}
