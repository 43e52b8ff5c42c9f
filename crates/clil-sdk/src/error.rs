//! Error taxonomy and normalization
//!
//! Every failure that leaves the gateway is one of the [`ErrorKind`] values.
//! HTTP statuses and transport failures are folded into [`ApiError`] by the
//! pure functions [`normalize_status`] and [`normalize_transport`].

use crate::request::TimeoutClass;
use crate::transport::{TransportFailure, TransportFailureKind};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Closed set of failure classes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// No, invalid or expired credential; refresh failed or was impossible
    Unauthenticated,
    NotFound,
    ServerError,
    Timeout,
    NetworkUnreachable,
    /// Caller-supplied data was rejected
    Validation,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::NotFound => "not found",
            ErrorKind::ServerError => "server error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::NetworkUnreachable => "network unreachable",
            ErrorKind::Validation => "validation",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// API client errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("{message}")]
    Unauthenticated { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("{message}")]
    ServerError { status: u16, message: String },

    #[error("{message}")]
    Timeout { message: String },

    #[error("{message}")]
    NetworkUnreachable { message: String },

    #[error("{message}")]
    Validation {
        message: String,
        /// Raw backend payload explaining the rejection, when there was one
        details: Option<serde_json::Value>,
    },

    #[error("{message}")]
    Unknown { message: String },
}

impl ApiError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        ApiError::Unknown {
            message: message.into(),
        }
    }

    /// Rebuild an error from its kind and message (used when unwrapping envelopes)
    pub fn from_kind(
        kind: ErrorKind,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Unauthenticated => ApiError::Unauthenticated { message },
            ErrorKind::NotFound => ApiError::NotFound { message },
            ErrorKind::ServerError => ApiError::ServerError {
                status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                message,
            },
            ErrorKind::Timeout => ApiError::Timeout { message },
            ErrorKind::NetworkUnreachable => ApiError::NetworkUnreachable { message },
            ErrorKind::Validation => ApiError::Validation { message, details },
            ErrorKind::Unknown => ApiError::Unknown { message },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthenticated { .. } => ErrorKind::Unauthenticated,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::ServerError { .. } => ErrorKind::ServerError,
            ApiError::Timeout { .. } => ErrorKind::Timeout,
            ApiError::NetworkUnreachable { .. } => ErrorKind::NetworkUnreachable,
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Unauthenticated { message }
            | ApiError::NotFound { message }
            | ApiError::ServerError { message, .. }
            | ApiError::Timeout { message }
            | ApiError::NetworkUnreachable { message }
            | ApiError::Validation { message, .. }
            | ApiError::Unknown { message } => message,
        }
    }

    /// Backend payload attached to a rejection
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            ApiError::Validation { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout { .. } | ApiError::NetworkUnreachable { .. } => true,
            ApiError::ServerError { status, .. } => matches!(*status, 502..=504),
            _ => false,
        }
    }

    /// Check if this error was caused by the caller
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthenticated { .. }
                | ApiError::NotFound { .. }
                | ApiError::Validation { .. }
        )
    }

    /// Stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated { .. } => "CLIL_UNAUTHENTICATED",
            ApiError::NotFound { .. } => "CLIL_NOT_FOUND",
            ApiError::ServerError { .. } => "CLIL_SERVER_ERROR",
            ApiError::Timeout { .. } => "CLIL_TIMEOUT",
            ApiError::NetworkUnreachable { .. } => "CLIL_NETWORK_UNREACHABLE",
            ApiError::Validation { .. } => "CLIL_VALIDATION",
            ApiError::Unknown { .. } => "CLIL_UNKNOWN",
        }
    }
}

/// Map a non-success HTTP response to an error
///
/// The message is taken from the body's `message`, `error` or `detail`
/// field, falling back to a fixed text for the status class.
pub fn normalize_status(status: StatusCode, body: &[u8], timeout_class: TimeoutClass) -> ApiError {
    let payload = serde_json::from_slice::<serde_json::Value>(body).ok();
    let body_message = payload.as_ref().and_then(extract_message);

    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthenticated {
            message: body_message.unwrap_or_else(|| "Authentication required".into()),
        },
        StatusCode::NOT_FOUND => ApiError::NotFound {
            message: body_message.unwrap_or_else(|| "Resource not found".into()),
        },
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::Validation {
                message: body_message.unwrap_or_else(|| "Request was rejected as invalid".into()),
                details: payload,
            }
        }
        s if s.is_server_error() => ApiError::ServerError {
            status: s.as_u16(),
            message: body_message.unwrap_or_else(|| match timeout_class {
                TimeoutClass::Generation => {
                    "Server error occurred while generating content".into()
                }
                _ => "Server error occurred".into(),
            }),
        },
        s => {
            let raw = body_message.unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
            ApiError::Unknown {
                message: if raw.is_empty() {
                    format!("Request failed with status {s}")
                } else {
                    format!("Request failed with status {s}: {raw}")
                },
            }
        }
    }
}

/// Map a transport-level failure to an error
pub fn normalize_transport(failure: &TransportFailure, timeout_class: TimeoutClass) -> ApiError {
    match failure.kind {
        TransportFailureKind::Timeout => ApiError::Timeout {
            message: match timeout_class {
                TimeoutClass::Generation => {
                    "Request timeout - content generation took too long".into()
                }
                TimeoutClass::Upload => "Request timeout - document upload took too long".into(),
                TimeoutClass::Short | TimeoutClass::Health => "Request timed out".into(),
            },
        },
        TransportFailureKind::Connect => ApiError::NetworkUnreachable {
            message: "Cannot connect to backend server".into(),
        },
        TransportFailureKind::Other => ApiError::Unknown {
            message: failure.detail.clone(),
        },
    }
}

/// Map a success response whose body could not be decoded
pub fn normalize_decode(err: serde_json::Error) -> ApiError {
    ApiError::Unknown {
        message: format!("Failed to decode response: {err}"),
    }
}

fn extract_message(payload: &serde_json::Value) -> Option<String> {
    ["message", "error", "detail"]
        .iter()
        .filter_map(|field| payload.get(*field))
        .find_map(|value| value.as_str().filter(|s| !s.trim().is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn test_status_classes() {
        let cases = [
            (StatusCode::UNAUTHORIZED, ErrorKind::Unauthenticated),
            (StatusCode::NOT_FOUND, ErrorKind::NotFound),
            (StatusCode::BAD_REQUEST, ErrorKind::Validation),
            (StatusCode::CONFLICT, ErrorKind::Validation),
            (StatusCode::UNPROCESSABLE_ENTITY, ErrorKind::Validation),
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::ServerError),
            (StatusCode::BAD_GATEWAY, ErrorKind::ServerError),
            (StatusCode::FORBIDDEN, ErrorKind::Unknown),
            (StatusCode::TOO_MANY_REQUESTS, ErrorKind::Unknown),
        ];

        for (status, kind) in cases {
            assert_eq!(
                normalize_status(status, b"", TimeoutClass::Short).kind(),
                kind,
                "status {status}"
            );
        }
    }

    #[test]
    fn test_message_extraction_order() {
        let err = normalize_status(
            StatusCode::BAD_REQUEST,
            &body(json!({"error": "Bad Request", "message": "Username already taken"})),
            TimeoutClass::Short,
        );
        assert_eq!(err.message(), "Username already taken");

        let err = normalize_status(
            StatusCode::BAD_REQUEST,
            &body(json!({"error": "Name is required"})),
            TimeoutClass::Short,
        );
        assert_eq!(err.message(), "Name is required");

        let err = normalize_status(
            StatusCode::BAD_REQUEST,
            &body(json!({"detail": "metadata must be valid JSON"})),
            TimeoutClass::Upload,
        );
        assert_eq!(err.message(), "metadata must be valid JSON");
    }

    #[test]
    fn test_validation_keeps_payload() {
        let payload = json!({"message": "Invalid", "field": "topic"});
        let err = normalize_status(StatusCode::BAD_REQUEST, &body(payload.clone()), TimeoutClass::Short);
        assert_eq!(err.details(), Some(&payload));
    }

    #[test]
    fn test_unknown_carries_raw_message() {
        let err = normalize_status(StatusCode::FORBIDDEN, b"Access denied", TimeoutClass::Short);
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.message().contains("403"));
        assert!(err.message().contains("Access denied"));
    }

    #[test]
    fn test_server_error_default_depends_on_class() {
        let err = normalize_status(StatusCode::INTERNAL_SERVER_ERROR, b"", TimeoutClass::Generation);
        assert_eq!(err.message(), "Server error occurred while generating content");
        assert!(!err.is_retryable());

        let err = normalize_status(StatusCode::SERVICE_UNAVAILABLE, b"", TimeoutClass::Short);
        assert_eq!(err.message(), "Server error occurred");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_transport_failures() {
        let timeout = TransportFailure::new(TransportFailureKind::Timeout, "deadline elapsed");
        let err = normalize_transport(&timeout, TimeoutClass::Generation);
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.message(), "Request timeout - content generation took too long");

        let connect = TransportFailure::new(TransportFailureKind::Connect, "connection refused");
        let err = normalize_transport(&connect, TimeoutClass::Short);
        assert_eq!(err.kind(), ErrorKind::NetworkUnreachable);
        assert!(err.is_retryable());

        let other = TransportFailure::new(TransportFailureKind::Other, "builder error");
        let err = normalize_transport(&other, TimeoutClass::Short);
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.message(), "builder error");
    }

    #[test]
    fn test_normalization_is_deterministic() {
        let failure = TransportFailure::new(TransportFailureKind::Connect, "refused");
        let a = normalize_transport(&failure, TimeoutClass::Short);
        let b = normalize_transport(&failure, TimeoutClass::Short);
        assert_eq!(a.kind(), b.kind());
        assert_eq!(a.message(), b.message());
    }

    #[test]
    fn test_error_properties() {
        assert!(ApiError::validation("bad").is_client_error());
        assert!(!ApiError::unknown("boom").is_client_error());
        assert_eq!(ApiError::unauthenticated("x").error_code(), "CLIL_UNAUTHENTICATED");

        let rebuilt = ApiError::from_kind(ErrorKind::NotFound, "gone", None);
        assert!(matches!(rebuilt, ApiError::NotFound { .. }));
        assert_eq!(rebuilt.to_string(), "gone");
    }
}
