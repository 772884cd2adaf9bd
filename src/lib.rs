//! Colloquy - Multi-party narrative conversation engine
//!
//! Drives a text conversation between one human participant and
//! generatively voiced characters: it picks who speaks next, assembles the
//! prompt for each turn, recovers structured calls from free-text
//! completions, retries classified backend failures and persists the
//! conversation so it survives interruption.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
