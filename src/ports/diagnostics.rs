//! Diagnostics Port - Where failed outbound prompts are dumped.

use async_trait::async_trait;

use crate::domain::conversation::Message;
use crate::domain::foundation::PlaythroughName;

#[derive(Debug, thiserror::Error)]
pub enum DiagnosticsError {
    #[error("Failed to serialize messages: {0}")]
    SerializationFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Port for recording prompts that produced unusable completions
#[async_trait]
pub trait DiagnosticsSink: Send + Sync {
    async fn record_outbound_messages(
        &self,
        playthrough: &PlaythroughName,
        messages: &[Message],
    ) -> Result<(), DiagnosticsError>;
}
