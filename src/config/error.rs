//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Temperature {0} is outside 0.0..=2.0")]
    InvalidTemperature(f32),

    #[error("top_p {0} is outside (0.0, 1.0]")]
    InvalidTopP(f32),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Retry count must be at least 1")]
    ZeroRetries,

    #[error("Structured output attempts must be at least 1")]
    ZeroAttempts,

    #[error("Transcript excerpt budget must be positive")]
    InvalidExcerptBudget,

    #[error("Termination keyword cannot be empty")]
    EmptyTerminationKeyword,

    #[error("Invalid data directory")]
    InvalidDataDir,
}
