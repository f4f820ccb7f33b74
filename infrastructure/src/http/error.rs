//! Error types for the HTTP adapter

use reqwest::StatusCode;
use rosti_application::ApiError;
use serde_json::Value;
use thiserror::Error;

/// Result type alias for adapter setup
pub type Result<T> = std::result::Result<T, HttpSetupError>;

/// Errors that can occur while building the HTTP client
#[derive(Error, Debug)]
pub enum HttpSetupError {
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Translate a transport failure into the port error.
///
/// Body read failures are stream errors; everything else before a response
/// is a network error.
pub(crate) fn from_reqwest(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout
    } else if error.is_body() || error.is_decode() {
        ApiError::Stream(error.to_string())
    } else {
        ApiError::Network(error.to_string())
    }
}

/// Build the error for a non-2xx response from its body.
///
/// Uses the `detail` field when the body carries one.
pub(crate) fn from_status(status: StatusCode, body: &str) -> ApiError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| match value.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        });

    let message = match detail {
        Some(detail) => detail,
        None if status == StatusCode::FORBIDDEN => "Permission Denied".to_string(),
        None => format!("API request failed with status {}", status.as_u16()),
    };

    ApiError::Http {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_is_used() {
        let err = from_status(StatusCode::NOT_FOUND, r#"{"detail": "Conversation not found"}"#);
        assert_eq!(err.to_string(), "HTTP 404: Conversation not found");
    }

    #[test]
    fn test_forbidden_without_detail() {
        let err = from_status(StatusCode::FORBIDDEN, "");
        assert_eq!(err.to_string(), "HTTP 403: Permission Denied");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_fallback_message() {
        let err = from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(
            err,
            ApiError::Http {
                status: 502,
                message: "API request failed with status 502".to_string(),
            }
        );
    }

    #[test]
    fn test_structured_detail_is_stringified() {
        let err = from_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail": [{"msg": "field required"}]}"#,
        );
        assert!(err.to_string().contains("field required"));
    }
}
