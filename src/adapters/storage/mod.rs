//! Storage Adapters
//!
//! Implementations of the session store, collaborator and diagnostics ports.
//!
//! ## Available Adapters
//!
//! - **FileSessionStore** - Snapshot as a JSON file per playthrough
//! - **InMemorySessionStore** - Snapshots in memory (testing/development)
//! - **FileCharacterStore** - Characters and places from YAML, memories as text
//! - **InMemoryCharacterStore** - Characters, memories and places in memory
//! - **FileDiagnosticsSink** / **NullDiagnosticsSink** - Failed prompt dumps
//!
//! ## Usage
//!
//! ```ignore
//! use adapters::storage::{FileSessionStore, InMemorySessionStore};
//!
//! // Production: file-based storage
//! let store = FileSessionStore::new("./data");
//!
//! // Testing: in-memory storage
//! let store = InMemorySessionStore::new();
//! ```

mod diagnostics_sink;
mod file_character_store;
mod file_session_store;
mod in_memory_character_store;
mod in_memory_session_store;

pub use diagnostics_sink::{FileDiagnosticsSink, NullDiagnosticsSink};
pub use file_character_store::FileCharacterStore;
pub use file_session_store::{FileSessionStore, SNAPSHOT_FILE_NAME};
pub use in_memory_character_store::InMemoryCharacterStore;
pub use in_memory_session_store::InMemorySessionStore;
