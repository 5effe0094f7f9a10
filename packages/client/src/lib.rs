//! Irori terminal chat client.
//!
//! Joins a room over WebSocket, prints incoming chat / member / AI queue events, and
//! sends lines read with rustyline as chat messages or (`/ai ...`) AI requests.

pub mod command;
pub mod domain;
pub mod error;
pub mod formatter;
mod runner;
mod session;
mod ui;

pub use runner::{ClientOptions, run_client};
