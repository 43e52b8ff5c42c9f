//! Error types for the CLIL CLI

use clil_sdk::{ApiError, ErrorKind};
use color_eyre::eyre::{eyre, Report};
use thiserror::Error;

/// CLI error type with minimal variants
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file issues
    #[error("Configuration error: {0}")]
    Config(#[from] clil_common::ConfigurationError),

    /// Failures reported by the backend or the client library
    #[error("{}", describe_api_error(.0))]
    Api(#[from] ApiError),

    /// The stored session was torn down after a failed refresh
    #[error("Your session has expired. Run `clil login` to sign in again")]
    SessionExpired,

    /// Command needs a session but none is stored
    #[error("You are not logged in. Run `clil login` first")]
    NotLoggedIn,

    /// Bad command-line input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Local file access
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON output: {0}")]
    Json(#[from] serde_json::Error),

    /// Everything else (using color-eyre's Report for rich errors)
    #[error(transparent)]
    Internal(#[from] Report),
}

impl CliError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(eyre!(message.into()))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Wrap a failed terminal prompt
    pub fn interactive(err: dialoguer::Error) -> Self {
        Self::internal(format!("Prompt failed: {err}"))
    }

    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::SessionExpired | CliError::NotLoggedIn => 2,
            CliError::Api(err) if err.kind() == ErrorKind::Unauthenticated => 2,
            CliError::InvalidArgument(_) => 64,
            CliError::Api(err) if err.kind() == ErrorKind::Validation => 64,
            CliError::Config(_) => 78,
            _ => 1,
        }
    }
}

fn describe_api_error(err: &ApiError) -> String {
    match err.kind() {
        ErrorKind::NetworkUnreachable => format!(
            "{} (is the backend running? check `client.base_url` with `clil config show`)",
            err.message()
        ),
        _ => err.message().to_string(),
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_errors_keep_backend_message() {
        let err = CliError::from(ApiError::validation("Title is required"));
        assert_eq!(err.to_string(), "Title is required");
        assert_eq!(err.exit_code(), 64);
    }

    #[test]
    fn test_unreachable_backend_has_hint() {
        let err = CliError::from(ApiError::NetworkUnreachable {
            message: "Cannot connect to backend server".to_string(),
        });
        assert!(err.to_string().starts_with("Cannot connect to backend server"));
        assert!(err.to_string().contains("clil config show"));
    }

    #[test]
    fn test_auth_failures_share_exit_code() {
        assert_eq!(CliError::SessionExpired.exit_code(), 2);
        assert_eq!(CliError::NotLoggedIn.exit_code(), 2);
        assert_eq!(
            CliError::from(ApiError::unauthenticated("Bad credentials")).exit_code(),
            2
        );
        assert_eq!(CliError::internal("boom").exit_code(), 1);
    }
}
