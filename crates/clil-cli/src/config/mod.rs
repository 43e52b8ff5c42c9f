//! Configuration management for the CLIL CLI

use crate::error::Result;
use clil_common::{ConfigLoader, ConfigurationError};
use clil_sdk::ClientConfig;
use etcetera::{choose_base_strategy, BaseStrategy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// CLI configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    /// Backend connection settings
    pub client: ClientConfig,

    /// Terminal output settings
    pub output: OutputConfig,
}

/// Terminal output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Print JSON instead of tables by default
    pub json: bool,

    /// Colored output
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: false,
            color: true,
        }
    }
}

impl ConfigLoader for CliConfig {
    const ENV_PREFIX: &'static str = "CLIL_";
}

impl CliConfig {
    /// Load configuration from the given file, or the default location
    ///
    /// A missing file is not an error; defaults and `CLIL_*` variables apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => expand_path(path),
            None => Self::default_path()?,
        };
        debug!("Loading configuration from: {}", path.display());

        let mut config = Self::load_from_file(&path)?;
        if let Some(dir) = config.client.storage_dir.take() {
            config.client.storage_dir = Some(expand_path(&dir));
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> std::result::Result<(), ConfigurationError> {
        let base_url = self.client.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigurationError::InvalidValue {
                key: "client.base_url".to_string(),
                reason: format!("expected an http:// or https:// URL, got '{base_url}'"),
            });
        }

        let timeouts = &self.client.timeouts;
        let bounds = [
            ("client.timeouts.short_secs", timeouts.short_secs),
            ("client.timeouts.generation_secs", timeouts.generation_secs),
            ("client.timeouts.upload_secs", timeouts.upload_secs),
            ("client.timeouts.health_secs", timeouts.health_secs),
            ("client.connect_timeout_secs", self.client.connect_timeout_secs),
        ];
        if let Some((key, _)) = bounds.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigurationError::InvalidValue {
                key: key.to_string(),
                reason: "must be at least one second".to_string(),
            });
        }
        Ok(())
    }

    /// Get configuration directory
    pub fn config_dir() -> Result<PathBuf> {
        let strategy = choose_base_strategy().map_err(|e| {
            ConfigurationError::DirectoryUnavailable(format!(
                "Failed to determine base directories: {e}"
            ))
        })?;
        Ok(strategy.config_dir().join("clil"))
    }

    /// Default configuration file
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Resolve the file a `--config` argument points at
    pub fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(expand_path(path)),
            None => Self::default_path(),
        }
    }
}

/// Expand `~` and environment variables in a path
fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => match shellexpand::full(raw) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
        },
        None => path.to_path_buf(),
    }
}
