//! Error types.

use thiserror::Error;

/// The main error type for rAdmin operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-related error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend returned a non-success response.
    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },

    /// Backend rejected the credentials (401/403).
    #[error("Unauthorized [{status}]: {message}")]
    Unauthorized { status: u16, message: String },

    /// Logged-in account is not an administrator.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Operation requires authentication but none was provided.
    #[error("Authentication required")]
    AuthRequired,

    /// A required field was missing in the response.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Invalid argument passed to an API method.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Realtime channel failure.
    #[error("Realtime error: {0}")]
    Realtime(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Create an API error, routing 401/403 to [`Error::Unauthorized`].
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 401 || status == 403 {
            Error::Unauthorized { status, message }
        } else {
            Error::Api { status, message }
        }
    }

    /// Create a missing field error.
    pub fn missing(field: impl Into<String>) -> Self {
        Error::MissingField(field.into())
    }

    /// Check if this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) | Error::Realtime(_) => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Check if this is an authentication error.
    ///
    /// These are fatal to the session: stored credentials should be cleared
    /// and the user sent back to login.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Error::AuthRequired | Error::Unauthorized { .. } | Error::AccessDenied(_)
        )
    }
}

/// Result type alias for rAdmin operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::api(500, "boom");
        assert_eq!(format!("{}", e), "API error [500]: boom");
    }

    #[test]
    fn test_auth_statuses() {
        assert!(Error::api(401, "expired").is_auth_error());
        assert!(Error::api(403, "forbidden").is_auth_error());
        assert!(!Error::api(404, "missing").is_auth_error());
        assert!(Error::AccessDenied("not admin".into()).is_auth_error());
    }

    #[test]
    fn test_retryable() {
        assert!(Error::api(503, "unavailable").is_retryable());
        assert!(!Error::api(400, "bad").is_retryable());
        assert!(!Error::api(401, "expired").is_retryable());
        assert!(Error::Realtime("closed".into()).is_retryable());
    }
}
