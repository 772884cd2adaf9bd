//! Completion backend configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Completion backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// API key of the OpenAI-compatible endpoint
    pub api_key: Option<String>,

    /// Base URL of the endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for speech, summaries and narration
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used to choose the next speaker (defaults to `model`)
    pub speaker_choice_model: Option<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling mass
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Attempts before the gateway gives up
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl AiConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Model used for speaker choice
    pub fn speaker_choice_model(&self) -> &str {
        self.speaker_choice_model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.model)
    }

    /// Validate backend configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_api_key() {
            return Err(ValidationError::MissingRequired("AI__API_KEY"));
        }
        if self.model.trim().is_empty() {
            return Err(ValidationError::MissingRequired("AI__MODEL"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ValidationError::InvalidTemperature(self.temperature));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(ValidationError::InvalidTopP(self.top_p));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.max_retries == 0 {
            return Err(ValidationError::ZeroRetries);
        }
        Ok(())
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            speaker_choice_model: None,
            temperature: default_temperature(),
            top_p: default_top_p(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    1.0
}

fn default_top_p() -> f32 {
    1.0
}

fn default_timeout() -> u64 {
    90
}

fn default_retries() -> u32 {
    10
}
