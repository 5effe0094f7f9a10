//! Shared library for the Irori chat server and client.
//!
//! - `protocol`: WebSocket event envelopes exchanged between server and client
//! - `logger`: tracing subscriber setup
//! - `time`: timestamp helpers

pub mod logger;
pub mod protocol;
pub mod time;
