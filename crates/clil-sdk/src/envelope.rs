//! Uniform result wrapper returned by every client operation

use crate::error::{ApiError, ErrorKind};
use serde::{Deserialize, Serialize};

/// Success or failure of one operation
///
/// On success `data` holds the payload. On failure `error` and `kind` are set
/// and `diagnostic` may carry the backend's rejection payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<serde_json::Value>,
}

impl<T> Outcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
            diagnostic: None,
        }
    }

    pub fn failure(err: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.message().to_string()),
            kind: Some(err.kind()),
            diagnostic: err.details().cloned(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Failure kind, `None` on success
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.kind
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        Outcome {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            kind: self.kind,
            diagnostic: self.diagnostic,
        }
    }

    /// Convert back into a `Result`
    pub fn into_result(self) -> Result<T, ApiError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(ApiError::unknown("Successful outcome carried no data")),
            (false, _) => Err(ApiError::from_kind(
                self.kind.unwrap_or(ErrorKind::Unknown),
                self.error.unwrap_or_else(|| "Unknown error".to_string()),
                self.diagnostic,
            )),
        }
    }
}

impl<T> From<Result<T, ApiError>> for Outcome<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => Outcome::ok(data),
            Err(err) => Outcome::failure(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_shape() {
        let outcome = Outcome::ok(vec![1, 2]);
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"success": true, "data": [1, 2], "error": null})
        );
    }

    #[test]
    fn test_failure_shape() {
        let err = ApiError::Validation {
            message: "Topic is required".into(),
            details: Some(json!({"field": "topic"})),
        };
        let outcome: Outcome<()> = Outcome::failure(err);

        assert!(!outcome.is_success());
        assert_eq!(outcome.error.as_deref(), Some("Topic is required"));
        assert_eq!(outcome.error_kind(), Some(ErrorKind::Validation));
        assert_eq!(outcome.diagnostic, Some(json!({"field": "topic"})));
    }

    #[test]
    fn test_into_result_preserves_kind() {
        let outcome: Outcome<u8> = Err(ApiError::NotFound {
            message: "Material not found".into(),
        })
        .into();

        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "Material not found");
    }

    #[test]
    fn test_map() {
        let outcome = Outcome::ok(2).map(|n| n * 10);
        assert_eq!(outcome.into_result().unwrap(), 20);
    }
}
