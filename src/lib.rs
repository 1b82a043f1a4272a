//! Terminal chat client for a local streaming generation backend.
//!
//! The crate splits into a transport-agnostic core (frame decoding, the
//! generation session state machine, the transcript), an HTTP backend
//! client, and a ratatui front end that renders the transcript
//! incrementally as tokens stream in.

pub mod backend;
pub mod config;
pub mod core;
pub mod logging;
pub mod tui;
