//! Client configuration

use crate::request::{Audience, TimeoutClass};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default backend origin when not specified
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Per-class request timeouts in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub short_secs: u64,
    pub generation_secs: u64,
    pub upload_secs: u64,
    pub health_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            short_secs: 10,
            generation_secs: 180,
            upload_secs: 120,
            health_secs: 5,
        }
    }
}

impl TimeoutConfig {
    pub fn duration(&self, class: TimeoutClass) -> Duration {
        let secs = match class {
            TimeoutClass::Short => self.short_secs,
            TimeoutClass::Generation => self.generation_secs,
            TimeoutClass::Upload => self.upload_secs,
            TimeoutClass::Health => self.health_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Connection settings for the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend origin, e.g. `https://clil.example.org`
    pub base_url: String,

    /// Path prefix of the protected application API
    pub api_prefix: String,

    /// Path prefix of the credential exchange endpoints
    pub auth_prefix: String,

    pub timeouts: TimeoutConfig,

    pub connect_timeout_secs: u64,

    /// Where the session is persisted; platform data dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: "/api/v1/clil".to_string(),
            auth_prefix: "/api/v1".to_string(),
            timeouts: TimeoutConfig::default(),
            connect_timeout_secs: 5,
            storage_dir: None,
        }
    }
}

impl ClientConfig {
    /// Absolute URL for a path addressed to the given audience
    pub fn url_for(&self, audience: Audience, path: &str) -> String {
        let prefix = match audience {
            Audience::Api => &self.api_prefix,
            Audience::Auth => &self.auth_prefix,
        };
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            prefix.trim_end_matches('/'),
            path
        )
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
