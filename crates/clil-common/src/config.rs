//! Layered configuration loading
//!
//! Every configuration type is assembled the same way: serialized defaults,
//! then an optional TOML file, then prefixed environment variables with `__`
//! separating nested keys.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or rendering configuration
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to parse configuration: {details}")]
    ParseError { details: String },

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Configuration directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

/// Loads a configuration type from defaults, a TOML file and the environment
pub trait ConfigLoader: Serialize + DeserializeOwned + Default {
    /// Environment variable prefix, e.g. `CLIL_`
    const ENV_PREFIX: &'static str;

    /// Build the provider stack for the given file
    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(Self::ENV_PREFIX).split("__"))
    }

    /// Load configuration, tolerating a missing file
    fn load_from_file(path: &Path) -> Result<Self, ConfigurationError> {
        Self::figment(path)
            .extract()
            .map_err(|e| ConfigurationError::ParseError {
                details: e.to_string(),
            })
    }

    /// Render the current value as pretty TOML
    fn to_toml(&self) -> Result<String, ConfigurationError> {
        toml::to_string_pretty(self).map_err(|e| ConfigurationError::ParseError {
            details: format!("Failed to serialize config: {e}"),
        })
    }

    /// Generate an example configuration file from the defaults
    fn generate_example() -> Result<String, ConfigurationError> {
        Self::default().to_toml()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        retries: u32,
    }

    impl Default for Sample {
        fn default() -> Self {
            Self {
                name: "default".to_string(),
                retries: 3,
            }
        }
    }

    impl ConfigLoader for Sample {
        const ENV_PREFIX: &'static str = "CLIL_COMMON_TEST_";
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Sample::load_from_file(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retries = 7").unwrap();

        let loaded = Sample::load_from_file(file.path()).unwrap();
        assert_eq!(loaded.retries, 7);
        assert_eq!(loaded.name, "default");
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "retries = \"many\"").unwrap();

        let err = Sample::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigurationError::ParseError { .. }));
    }

    #[test]
    fn test_example_round_trips_through_toml() {
        let example = Sample::generate_example().unwrap();
        assert!(example.contains("retries = 3"));
    }
}
