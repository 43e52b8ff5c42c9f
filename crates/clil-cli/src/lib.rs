//! # CLIL CLI
//!
//! Command-line client for the CLIL lesson-material backend.
//!
//! ## Architecture
//!
//! - Clap-based argument parsing with derive macros
//! - Handler-based command processing, one module per command group
//! - A [`client::Session`] per invocation wrapping the SDK client and its
//!   session events
//! - Configuration layered through `clil-common`

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod progress;

pub use cli::*;
pub use error::*;
