//! AI Provider Adapters.
//!
//! Implementations of the AIProvider port.
//!
//! ## Available Adapters
//!
//! - `OpenAIProvider` - OpenAI-compatible chat completion endpoints
//! - `MockAIProvider` - Scripted mock for testing

mod mock_provider;
mod openai_provider;

pub use mock_provider::{MockAIProvider, MockResponse, MOCK_DEFAULT_RESPONSE};
pub use openai_provider::{OpenAIConfig, OpenAIProvider};
