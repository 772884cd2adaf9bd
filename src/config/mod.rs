//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `COLLOQUY` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use colloquy::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Data lives in {}", config.storage.data_dir.display());
//! ```

mod ai;
mod conversation;
mod error;
mod logging;
mod storage;

pub use ai::AiConfig;
pub use conversation::ConversationConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use storage::StorageConfig;

use serde::Deserialize;

use crate::application::DialogueSettings;

/// Root application configuration
///
/// Every section has defaults except the API key, which `validate` requires.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Completion backend (endpoint, models, sampling, retries)
    #[serde(default)]
    pub ai: AiConfig,

    /// Playthrough data directory
    #[serde(default)]
    pub storage: StorageConfig,

    /// Turn-loop tunables
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Subscriber settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `COLLOQUY` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `COLLOQUY__AI__API_KEY=sk-...` -> `ai.api_key = sk-...`
    /// - `COLLOQUY__CONVERSATION__TERMINATION_KEYWORD=farewell`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("COLLOQUY")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        self.storage.validate()?;
        self.conversation.validate()?;
        Ok(())
    }

    /// Settings handed to every conversation session
    pub fn dialogue_settings(&self) -> DialogueSettings {
        DialogueSettings {
            model: self.ai.model.clone(),
            speaker_choice_model: self.ai.speaker_choice_model().to_string(),
            temperature: self.ai.temperature,
            top_p: self.ai.top_p,
            summary_temperature: self.conversation.summary_temperature,
            termination_keyword: self.conversation.termination_keyword.clone(),
            max_structured_attempts: self.conversation.max_structured_attempts,
            transcript_excerpt_chars: self.conversation.transcript_excerpt_chars,
        }
    }
}
