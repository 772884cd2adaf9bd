//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `AIProvider` - The completion backend
//! - `SessionStore` - Snapshot persistence and resumption
//! - `CharacterStore`, `MemoryStore`, `PlaceStore` - Playthrough content
//! - `DiagnosticsSink` - Dumps of prompts that failed

mod ai_provider;
mod collaborators;
mod diagnostics;
mod session_store;

pub use ai_provider::{
    AIError, AIProvider, CompletionContent, CompletionErrorKind, CompletionRequest,
    CompletionResponse, Message, MessageRole, ProviderInfo, TokenUsage,
};
pub use collaborators::{
    CharacterProfile, CharacterStore, CollaboratorError, MemoryStore, PlaceStore,
};
pub use diagnostics::{DiagnosticsError, DiagnosticsSink};
pub use session_store::{SessionStore, SessionStoreError};
