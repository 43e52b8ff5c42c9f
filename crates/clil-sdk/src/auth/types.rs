//! Session data types
//!
//! Credentials, the identity that accompanies them, the request bodies of
//! the credential exchanges and the storage error type.

use crate::error::ApiError;
use etcetera::{choose_base_strategy, BaseStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Role granted to every account
pub const ROLE_USER: &str = "USER";

/// Role unlocking the admin operations
pub const ROLE_ADMIN: &str = "ADMIN";

/// The authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_roles")]
    pub roles: BTreeSet<String>,
}

fn default_roles() -> BTreeSet<String> {
    BTreeSet::from([ROLE_USER.to_string()])
}

impl Identity {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            roles: default_roles(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        if self.roles.is_empty() {
            self.roles = default_roles();
        }
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    /// Up to two uppercase initials taken from the username
    ///
    /// A multi-word name yields the first letters of its first and last
    /// words. Any other name, `anna.schmidt` included, yields its first two
    /// characters.
    pub fn initials(&self) -> String {
        let words: Vec<&str> = self.username.split_whitespace().collect();

        let initials: String = match words.as_slice() {
            [] => String::new(),
            [single] => single.chars().take(2).collect(),
            [first, .., last] => first.chars().take(1).chain(last.chars().take(1)).collect(),
        };

        if initials.is_empty() {
            "??".to_string()
        } else {
            initials.to_uppercase()
        }
    }
}

/// Access credential plus the optional refresh credential and identity
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub identity: Option<Identity>,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            identity: None,
        }
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Whether the pair can be renewed without the user
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("identity", &self.identity)
            .finish()
    }
}

/// Body returned by login, register and refresh
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl AuthResponse {
    /// Convert into stored credentials
    ///
    /// A refresh exchange that omits the refresh token keeps `fallback_refresh`,
    /// and one that omits the user keeps `fallback_identity`.
    pub fn into_credentials(
        self,
        fallback_refresh: Option<&str>,
        fallback_identity: Option<&Identity>,
    ) -> CredentialPair {
        let identity = match self.username {
            Some(username) if !username.is_empty() => Some(
                Identity::new(username, self.email.unwrap_or_default()).with_roles(self.roles),
            ),
            _ => fallback_identity.cloned(),
        };

        CredentialPair {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .filter(|t| !t.is_empty())
                .or_else(|| fallback_refresh.map(str::to_string)),
            identity,
        }
    }
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl RefreshRequest {
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
        }
    }
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshRequest { refresh_token: [REDACTED] }")
    }
}

/// Session persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored session is malformed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Failed to determine data directory: {0}")]
    DataDir(String),
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::unknown(err.to_string())
    }
}

/// Default directory for the persisted session
pub fn default_storage_dir() -> Result<PathBuf, StorageError> {
    let strategy = choose_base_strategy()
        .map_err(|e| StorageError::DataDir(format!("Failed to determine base directories: {e}")))?;

    Ok(strategy.data_dir().join("clil"))
}
