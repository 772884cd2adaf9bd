//! Conversation configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Turn-loop tunables
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Human input that ends the conversation
    #[serde(default = "default_termination_keyword")]
    pub termination_keyword: String,

    /// Structural retries for every typed completion
    #[serde(default = "default_max_structured_attempts")]
    pub max_structured_attempts: u32,

    /// Character budget of transcript excerpts in prompts
    #[serde(default = "default_transcript_excerpt_chars")]
    pub transcript_excerpt_chars: usize,

    /// Sampling temperature of dialogue summaries
    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,
}

impl ConversationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.termination_keyword.trim().is_empty() {
            return Err(ValidationError::EmptyTerminationKeyword);
        }
        if self.max_structured_attempts == 0 {
            return Err(ValidationError::ZeroAttempts);
        }
        if self.transcript_excerpt_chars == 0 {
            return Err(ValidationError::InvalidExcerptBudget);
        }
        if !(0.0..=2.0).contains(&self.summary_temperature) {
            return Err(ValidationError::InvalidTemperature(self.summary_temperature));
        }
        Ok(())
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            termination_keyword: default_termination_keyword(),
            max_structured_attempts: default_max_structured_attempts(),
            transcript_excerpt_chars: default_transcript_excerpt_chars(),
            summary_temperature: default_summary_temperature(),
        }
    }
}

fn default_termination_keyword() -> String {
    "goodbye".to_string()
}

fn default_max_structured_attempts() -> u32 {
    3
}

fn default_transcript_excerpt_chars() -> usize {
    6000
}

fn default_summary_temperature() -> f32 {
    0.2
}
