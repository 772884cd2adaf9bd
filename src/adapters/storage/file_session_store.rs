//! File-based Session Store Adapter
//!
//! Stores the snapshot of each playthrough's ongoing conversation as a JSON
//! file, `<base>/<playthrough>/ongoing_dialogue.json`.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::domain::conversation::SessionSnapshot;
use crate::domain::foundation::PlaythroughName;
use crate::ports::{SessionStore, SessionStoreError};

/// File name of the snapshot inside a playthrough directory.
pub const SNAPSHOT_FILE_NAME: &str = "ongoing_dialogue.json";

/// File-based storage for conversation snapshots
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    base_path: PathBuf,
}

impl FileSessionStore {
    /// Create a new file store with a base directory
    ///
    /// # Example
    /// ```ignore
    /// let store = FileSessionStore::new("./data");
    /// ```
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn playthrough_dir(&self, playthrough: &PlaythroughName) -> PathBuf {
        self.base_path.join(playthrough.as_str())
    }

    /// Path of the snapshot file for a playthrough
    pub fn snapshot_path(&self, playthrough: &PlaythroughName) -> PathBuf {
        self.playthrough_dir(playthrough).join(SNAPSHOT_FILE_NAME)
    }

    async fn ensure_dir(&self, path: &Path) -> Result<(), SessionStoreError> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(
        &self,
        playthrough: &PlaythroughName,
    ) -> Result<Option<SessionSnapshot>, SessionStoreError> {
        let file_path = self.snapshot_path(playthrough);

        let json = match fs::read_to_string(&file_path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SessionStoreError::IoError(e.to_string())),
        };

        let value: serde_json::Value = match serde_json::from_str(&json) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %file_path.display(), error = %e, "Snapshot is not valid JSON; treating as absent");
                return Ok(None);
            }
        };

        match SessionSnapshot::from_value(value) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(path = %file_path.display(), error = %e, "Malformed snapshot; treating as absent");
                Ok(None)
            }
        }
    }

    async fn save(
        &self,
        playthrough: &PlaythroughName,
        snapshot: &SessionSnapshot,
    ) -> Result<(), SessionStoreError> {
        self.ensure_dir(&self.playthrough_dir(playthrough)).await?;

        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| SessionStoreError::SerializationFailed(e.to_string()))?;

        fs::write(self.snapshot_path(playthrough), json)
            .await
            .map_err(|e| SessionStoreError::IoError(e.to_string()))?;

        debug!(playthrough = %playthrough, lines = snapshot.transcript().len(), "Snapshot saved");
        Ok(())
    }

    async fn delete(&self, playthrough: &PlaythroughName) -> Result<(), SessionStoreError> {
        match fs::remove_file(self.snapshot_path(playthrough)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionStoreError::IoError(e.to_string())),
        }
    }
}
