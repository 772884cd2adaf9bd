//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - Completion backends (OpenAI-compatible, mock)
//! - `storage` - Snapshot, character and diagnostics persistence

pub mod ai;
pub mod storage;
