//! Shared plumbing for the CLIL client crates
//!
//! Holds the pieces every binary in the workspace needs in the same shape:
//! logging initialization and layered configuration loading.

pub mod config;
pub mod logging;

pub use config::{ConfigLoader, ConfigurationError};
