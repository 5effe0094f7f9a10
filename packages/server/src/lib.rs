//! Irori chat server library.
//!
//! Users join rooms of up to four members, chat with each other, and submit prompts to a
//! text generator through a per-room queue that is drained one request at a time.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// configuration
pub mod config;
