//! Error types
//!
//! Failures of the HTTP adapter and of session token handling. Actions never
//! hand these to their callers; they are logged at the action boundary and
//! turned into an empty result.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by the HTTP client adapter
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS or body transfer failure
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API error {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A request URL could not be built from the base URL
    #[error("Invalid URL: {0}")]
    Url(String),
}

impl ApiError {
    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// True when the server rejected the session (HTTP 401)
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

/// Errors raised while storing a bearer token
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Empty token")]
    EmptyToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_reports_status() {
        let err = ApiError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: "Unauthorized".to_string(),
        };
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_non_401_is_not_unauthorized() {
        let err = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        };
        assert!(!err.is_unauthorized());

        let err = ApiError::Url("not a url".to_string());
        assert_eq!(err.status(), None);
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            status: StatusCode::BAD_REQUEST,
            body: "name or address missing".to_string(),
        };
        assert_eq!(err.to_string(), "API error 400 Bad Request: name or address missing");
        assert_eq!(AuthError::EmptyToken.to_string(), "Empty token");
    }
}
