//! Error types for the session crate.
//!
//! Errors are reported through rootcause:
//! - `StorageError`: failures persisting or loading local session state
//! - `TransportError`: failures talking to the remote authentication API
//!
//! An error response from the API is not wrapped: its parsed body is the
//! failure value (`TransportError::Api`).

use serde::Deserialize;
use std::fmt;

/// Errors from credential storage backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    Io { path: String, reason: String },
    /// Stored data could not be interpreted.
    Corrupt { key: String, reason: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, reason } => {
                write!(f, "storage I/O failed for '{path}': {reason}")
            }
            Self::Corrupt { key, reason } => {
                write!(f, "stored value for '{key}' is corrupt: {reason}")
            }
        }
    }
}

impl std::error::Error for StorageError {}

/// One entry of an API error body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// The request field the error refers to, if any.
    #[serde(default)]
    pub param: Option<String>,
}

/// Attempt counters returned with a rate-limited response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimit {
    /// Attempts made so far.
    pub attempt: u32,
    /// Attempts allowed before lockout.
    pub max_attempts: u32,
}

/// A parsed error response from the authentication API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiError {
    /// HTTP status of the response.
    #[serde(default)]
    pub status: u16,
    /// Error entries, possibly empty.
    #[serde(default)]
    pub errors: Vec<ErrorDetail>,
    /// Additional payload (flows for 401, attempt counters for 429).
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl ApiError {
    /// HTTP status signalling the session no longer exists.
    pub const SESSION_GONE: u16 = 410;
    /// HTTP status signalling too many attempts.
    pub const TOO_MANY_REQUESTS: u16 = 429;
    /// HTTP status signalling a pending or missing authentication.
    pub const UNAUTHORIZED: u16 = 401;

    /// Builds an error from the HTTP status and the (possibly non-JSON) body.
    ///
    /// The HTTP status always wins over any `status` field in the body.
    #[must_use]
    pub fn from_body(status: u16, body: Option<&serde_json::Value>) -> Self {
        let mut error = body
            .and_then(|value| Self::deserialize(value).ok())
            .unwrap_or(Self {
                status,
                errors: Vec::new(),
                data: None,
            });
        error.status = status;
        error
    }

    /// Returns true if the session is gone and the token was discarded.
    #[must_use]
    pub fn is_session_gone(&self) -> bool {
        self.status == Self::SESSION_GONE
    }

    /// Returns true for an unauthorized response.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == Self::UNAUTHORIZED
    }

    /// Returns the attempt counters of a rate-limited response.
    #[must_use]
    pub fn rate_limit(&self) -> Option<RateLimit> {
        if self.status != Self::TOO_MANY_REQUESTS {
            return None;
        }
        self.data
            .as_ref()
            .and_then(|data| RateLimit::deserialize(data).ok())
    }

    /// Returns the first error reported for `param`.
    #[must_use]
    pub fn error_for(&self, param: &str) -> Option<&ErrorDetail> {
        self.errors
            .iter()
            .find(|detail| detail.param.as_deref() == Some(param))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API responded with status {}", self.status)?;
        for (i, detail) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            match &detail.param {
                Some(param) => write!(f, "{sep}{} ({param}): {}", detail.code, detail.message)?,
                None => write!(f, "{sep}{}: {}", detail.code, detail.message)?,
            }
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Errors from transport operations.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The request could not be completed.
    Network { reason: String },
    /// The API answered with an error status; the body is the error.
    Api(ApiError),
    /// A request body could not be encoded.
    Encode { reason: String },
    /// A response body did not have the expected shape.
    Decode { reason: String },
    /// The configured base URL or a header value is unusable.
    InvalidRequest { reason: String },
    /// Recording a token or status change failed.
    Storage { reason: String },
}

impl TransportError {
    /// Returns the API error body, if this is an application error.
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(error) => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network { reason } => write!(f, "request failed: {reason}"),
            Self::Api(error) => write!(f, "{error}"),
            Self::Encode { reason } => write!(f, "failed to encode request body: {reason}"),
            Self::Decode { reason } => write!(f, "failed to decode response body: {reason}"),
            Self::InvalidRequest { reason } => write!(f, "invalid request: {reason}"),
            Self::Storage { reason } => write!(f, "failed to record session state: {reason}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<ApiError> for TransportError {
    fn from(error: ApiError) -> Self {
        Self::Api(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn storage_error_display() {
        let err = StorageError::Io {
            path: "/tmp/session.json".to_string(),
            reason: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("/tmp/session.json"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn api_error_uses_http_status_over_body() {
        let body = json!({
            "status": 400,
            "errors": [{"code": "invalid", "message": "Bad password.", "param": "password"}]
        });
        let err = ApiError::from_body(409, Some(&body));
        assert_eq!(err.status, 409);
        assert_eq!(err.errors.len(), 1);
        assert_eq!(
            err.error_for("password").map(|d| d.code.as_str()),
            Some("invalid")
        );
        assert!(err.error_for("email").is_none());
    }

    #[test]
    fn api_error_without_json_body() {
        let err = ApiError::from_body(500, None);
        assert_eq!(err.status, 500);
        assert!(err.errors.is_empty());
        assert_eq!(err.to_string(), "API responded with status 500");
    }

    #[test]
    fn rate_limit_payload() {
        let body = json!({"status": 429, "data": {"attempt": 3, "max_attempts": 5}});
        let err = ApiError::from_body(429, Some(&body));
        assert_eq!(
            err.rate_limit(),
            Some(RateLimit {
                attempt: 3,
                max_attempts: 5
            })
        );

        let other = ApiError::from_body(400, Some(&body));
        assert!(other.rate_limit().is_none());
    }

    #[test]
    fn api_error_display_lists_details() {
        let body = json!({
            "errors": [
                {"code": "required", "message": "This field is required.", "param": "email"},
                {"code": "throttled", "message": "Slow down."}
            ]
        });
        let err = ApiError::from_body(400, Some(&body));
        let text = err.to_string();
        assert!(text.contains("status 400"));
        assert!(text.contains("required (email)"));
        assert!(text.contains("; throttled: Slow down."));
    }

    #[test]
    fn transport_error_exposes_api_error() {
        let err = TransportError::from(ApiError::from_body(410, None));
        assert!(err.api_error().is_some_and(ApiError::is_session_gone));

        let network = TransportError::Network {
            reason: "connection refused".to_string(),
        };
        assert!(network.api_error().is_none());
        assert!(network.to_string().contains("connection refused"));
    }
}
