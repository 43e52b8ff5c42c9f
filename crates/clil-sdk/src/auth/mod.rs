//! Session management for the CLIL client
//!
//! Credentials live in a single [`TokenStore`] cell, are attached to outgoing
//! calls by [`attach_credentials`], and are renewed by the single-flight
//! [`RefreshCoordinator`].

pub mod attach;
pub mod refresh;
pub mod session;
pub mod storage;
pub mod token_store;
pub mod types;

pub use attach::{attach_credentials, with_bearer};
pub use refresh::{RefreshCoordinator, RefreshExchange, SESSION_EXPIRED};
pub use session::{SessionEvent, SessionEvents};
pub use storage::{FileSessionStorage, MemorySessionStorage, SessionStorage};
pub use token_store::TokenStore;
pub use types::{
    default_storage_dir, AuthResponse, CredentialPair, Identity, LoginRequest, RefreshRequest,
    RegisterRequest, StorageError,
};
