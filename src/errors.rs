//! Classified failures surfaced by the auth service client and the session manager.

use reqwest::StatusCode;
use thiserror::Error;

/// Maximum length for error response bodies carried in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Malformed input rejected by the service (bad email, weak password, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Wrong credentials, or an expired / revoked refresh token.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transport failure or a server-side error; the credentials were not judged.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No active session")]
    NoActiveSession,

    #[error("Claim not found: {0}")]
    ClaimNotFound(String),

    #[error("Malformed access token: {0}")]
    MalformedToken(String),
}

impl AuthError {
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..end],
            body.len()
        )
    }

    /// Classify a non-success HTTP response.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 | 422 => AuthError::Validation(truncated),
            401 | 403 => AuthError::Authentication(truncated),
            409 => AuthError::Conflict(truncated),
            _ => AuthError::Network(format!("Status {}: {}", status, truncated)),
        }
    }

    /// True when the service positively rejected the request, as opposed to
    /// the request never being judged (transport failure, 5xx, garbled body).
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, AuthError::Validation(_) | AuthError::Authentication(_))
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AuthError::InvalidResponse(err.to_string())
        } else {
            AuthError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        assert!(matches!(
            AuthError::from_status(StatusCode::BAD_REQUEST, "bad email"),
            AuthError::Validation(msg) if msg == "bad email"
        ));
        assert!(matches!(
            AuthError::from_status(StatusCode::UNAUTHORIZED, ""),
            AuthError::Authentication(_)
        ));
        assert!(matches!(
            AuthError::from_status(StatusCode::CONFLICT, "exists"),
            AuthError::Conflict(_)
        ));
        assert!(matches!(
            AuthError::from_status(StatusCode::BAD_GATEWAY, "upstream"),
            AuthError::Network(_)
        ));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(2000);
        match AuthError::from_status(StatusCode::BAD_REQUEST, &body) {
            AuthError::Validation(msg) => {
                assert!(msg.len() < 600);
                assert!(msg.contains("2000 total bytes"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_only_confirmed_rejections_are_fatal() {
        assert!(AuthError::Authentication("expired".into()).is_session_fatal());
        assert!(AuthError::Validation("missing".into()).is_session_fatal());
        assert!(!AuthError::Network("timeout".into()).is_session_fatal());
        assert!(!AuthError::InvalidResponse("garbled".into()).is_session_fatal());
    }
}
