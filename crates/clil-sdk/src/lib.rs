//! # CLIL SDK
//!
//! Authenticated client for the CLIL lesson-material backend.
//!
//! ## Architecture
//!
//! - `request`: builds an [`OutboundCall`] per logical [`Operation`]
//! - `auth`: the [`TokenStore`], credential attachment and the single-flight
//!   [`RefreshCoordinator`]
//! - `transport`: the network exchange behind the [`Transport`] trait
//! - `error`: the closed [`ErrorKind`] taxonomy and its normalizers
//! - `gateway`: ties the above together for one call
//! - `client`: the [`ClilClient`] facade returning [`Outcome`] envelopes

pub mod auth;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod request;
pub mod transport;
pub mod types;

pub use auth::{CredentialPair, Identity, RefreshCoordinator, SessionEvent, TokenStore};
pub use client::{ClientBuilder, ClilClient};
pub use config::{ClientConfig, TimeoutConfig, DEFAULT_BASE_URL};
pub use envelope::Outcome;
pub use error::{ApiError, ErrorKind, Result};
pub use request::{Operation, OutboundCall, TimeoutClass};
pub use transport::{HttpTransport, Transport};
pub use types::*;
