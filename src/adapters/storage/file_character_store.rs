//! File-based Character Store Adapter
//!
//! Reads playthrough content from disk and appends character memories.
//!
//! ```text
//! <base>/<playthrough>/characters.yaml     id -> CharacterProfile
//! <base>/<playthrough>/places.yaml         place -> description
//! <base>/<playthrough>/memories/<id>.txt   appended memory text
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::foundation::{ParticipantId, PlaythroughName};
use crate::ports::{CharacterProfile, CharacterStore, CollaboratorError, MemoryStore, PlaceStore};

/// File-based character, memory and place store
#[derive(Debug, Clone)]
pub struct FileCharacterStore {
    base_path: PathBuf,
}

impl FileCharacterStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn playthrough_dir(&self, playthrough: &PlaythroughName) -> PathBuf {
        self.base_path.join(playthrough.as_str())
    }

    fn characters_file(&self, playthrough: &PlaythroughName) -> PathBuf {
        self.playthrough_dir(playthrough).join("characters.yaml")
    }

    fn places_file(&self, playthrough: &PlaythroughName) -> PathBuf {
        self.playthrough_dir(playthrough).join("places.yaml")
    }

    fn memories_file(&self, playthrough: &PlaythroughName, id: &ParticipantId) -> PathBuf {
        self.playthrough_dir(playthrough)
            .join("memories")
            .join(format!("{}.txt", id))
    }

    async fn read_yaml_map<T>(&self, path: &Path) -> Result<HashMap<String, T>, CollaboratorError>
    where
        T: serde::de::DeserializeOwned,
    {
        let yaml = match fs::read_to_string(path).await {
            Ok(yaml) => yaml,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(CollaboratorError::IoError(e.to_string())),
        };
        if yaml.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_yaml::from_str(&yaml)
            .map_err(|e| CollaboratorError::Malformed(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl CharacterStore for FileCharacterStore {
    async fn load_character(
        &self,
        playthrough: &PlaythroughName,
        id: &ParticipantId,
    ) -> Result<CharacterProfile, CollaboratorError> {
        let mut characters: HashMap<String, CharacterProfile> =
            self.read_yaml_map(&self.characters_file(playthrough)).await?;
        characters
            .remove(id.as_str())
            .ok_or_else(|| CollaboratorError::CharacterNotFound(id.clone()))
    }

    async fn load_memories(
        &self,
        playthrough: &PlaythroughName,
        id: &ParticipantId,
    ) -> Result<String, CollaboratorError> {
        match fs::read_to_string(self.memories_file(playthrough, id)).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(CollaboratorError::IoError(e.to_string())),
        }
    }
}

#[async_trait]
impl MemoryStore for FileCharacterStore {
    async fn append_memory(
        &self,
        playthrough: &PlaythroughName,
        id: &ParticipantId,
        memory: &str,
    ) -> Result<(), CollaboratorError> {
        let path = self.memories_file(playthrough, id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| CollaboratorError::IoError(e.to_string()))?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| CollaboratorError::IoError(e.to_string()))?;
        file.write_all(format!("{}\n", memory.trim()).as_bytes())
            .await
            .map_err(|e| CollaboratorError::IoError(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| CollaboratorError::IoError(e.to_string()))
    }
}

#[async_trait]
impl PlaceStore for FileCharacterStore {
    async fn describe_place(
        &self,
        playthrough: &PlaythroughName,
        place: &str,
    ) -> Result<String, CollaboratorError> {
        let mut places: HashMap<String, String> =
            self.read_yaml_map(&self.places_file(playthrough)).await?;
        places
            .remove(place)
            .ok_or_else(|| CollaboratorError::PlaceNotFound(place.to_string()))
    }
}
