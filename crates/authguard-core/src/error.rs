use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("Unauthenticated - session missing or expired")]
    Unauthenticated,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("User declined login")]
    Declined,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl GuardError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => GuardError::Unauthenticated,
            403 => GuardError::Forbidden(truncated),
            404 => GuardError::NotFound(truncated),
            500..=599 => GuardError::ServerError(truncated),
            _ => GuardError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// Status mapping for credential exchanges, where a rejection means bad credentials
    pub fn from_login_status(status: StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 | 403 => GuardError::InvalidCredentials,
            _ => Self::from_status(status, body),
        }
    }

    /// Whether the error came from the network rather than from the server
    pub fn is_transport(&self) -> bool {
        matches!(self, GuardError::TransportFailure(_))
    }
}

impl From<reqwest::Error> for GuardError {
    fn from(err: reqwest::Error) -> Self {
        GuardError::TransportFailure(err.to_string())
    }
}
