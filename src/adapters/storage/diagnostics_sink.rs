//! Diagnostics Sink Adapters
//!
//! `FileDiagnosticsSink` writes each failed outbound prompt to
//! `<base>/<playthrough>/diagnostics/failed_prompt_<timestamp>.json`.
//! `NullDiagnosticsSink` discards them.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::domain::conversation::Message;
use crate::domain::foundation::PlaythroughName;
use crate::ports::{DiagnosticsError, DiagnosticsSink};

#[derive(Debug, Clone)]
pub struct FileDiagnosticsSink {
    base_path: PathBuf,
}

impl FileDiagnosticsSink {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn diagnostics_dir(&self, playthrough: &PlaythroughName) -> PathBuf {
        self.base_path.join(playthrough.as_str()).join("diagnostics")
    }
}

#[async_trait]
impl DiagnosticsSink for FileDiagnosticsSink {
    async fn record_outbound_messages(
        &self,
        playthrough: &PlaythroughName,
        messages: &[Message],
    ) -> Result<(), DiagnosticsError> {
        let dir = self.diagnostics_dir(playthrough);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| DiagnosticsError::IoError(e.to_string()))?;

        let json = serde_json::to_string_pretty(messages)
            .map_err(|e| DiagnosticsError::SerializationFailed(e.to_string()))?;
        let file_name = format!("failed_prompt_{}.json", Utc::now().format("%Y%m%dT%H%M%S%.6f"));

        fs::write(dir.join(file_name), json)
            .await
            .map_err(|e| DiagnosticsError::IoError(e.to_string()))
    }
}

/// Sink that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDiagnosticsSink;

#[async_trait]
impl DiagnosticsSink for NullDiagnosticsSink {
    async fn record_outbound_messages(
        &self,
        _playthrough: &PlaythroughName,
        _messages: &[Message],
    ) -> Result<(), DiagnosticsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_messages_as_json() {
        let temp_dir = TempDir::new().unwrap();
        let sink = FileDiagnosticsSink::new(temp_dir.path());
        let playthrough = PlaythroughName::new("caravan").unwrap();

        sink.record_outbound_messages(
            &playthrough,
            &[Message::system("persona"), Message::user("Produce P2's speech.")],
        )
        .await
        .unwrap();

        let dir = temp_dir.path().join("caravan").join("diagnostics");
        let mut entries = fs::read_dir(&dir).await.unwrap();
        let entry = entries.next_entry().await.unwrap().unwrap();
        let name = entry.file_name().to_string_lossy().to_string();
        assert!(name.starts_with("failed_prompt_") && name.ends_with(".json"));

        let written: Vec<Message> =
            serde_json::from_str(&fs::read_to_string(entry.path()).await.unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[1].content, "Produce P2's speech.");
    }
}
