//! Domain layer containing conversation logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, errors, state machine trait)
//! - `conversation` - Roster, transcript, prompt assembly and tool-call parsing

pub mod conversation;
pub mod foundation;
