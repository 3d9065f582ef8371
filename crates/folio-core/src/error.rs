//! Error types for folio.
//!
//! A single error type with explicit variants for transport, authentication,
//! protocol, and input validation failures. Remote function failures are not
//! errors of this type; they travel as [`FunctionError`](crate::FunctionError)
//! inside an invocation outcome.

use std::fmt;
use thiserror::Error;

/// The unified error type for folio operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (invalid credentials, missing or expired session).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Protocol errors (non-success responses from the identity service).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors (invalid URL, function name, user id).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Whether the session behind this error can no longer be refreshed.
    ///
    /// Transport failures are transient and never count; a rejected refresh
    /// token or a 400/401 answer to a refresh request does.
    pub fn is_unrecoverable_auth(&self) -> bool {
        match self {
            Error::Auth(AuthError::RefreshTokenInvalid | AuthError::SessionExpired) => true,
            Error::Protocol(err) => err.status == 400 || err.is_auth_error(),
            _ => false,
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// The response body could not be decoded.
    #[error("malformed response: {message}")]
    Decode { message: String },
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid credentials provided.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// There is no session to operate on.
    #[error("no active session")]
    NoSession,

    /// Session has expired.
    #[error("session expired")]
    SessionExpired,

    /// Refresh token is missing, invalid or expired.
    #[error("refresh token invalid")]
    RefreshTokenInvalid,
}

/// Protocol-level errors from identity service responses.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Machine-readable error code (if present).
    pub error: Option<String>,
    /// Error message from the server.
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref error) = self.error {
            write!(f, " [{}]", error)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, error: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            error,
            message,
        }
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401
            || self.error.as_deref() == Some("invalid_grant")
            || self.error.as_deref() == Some("refresh_token_not_found")
            || self.error.as_deref() == Some("session_not_found")
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid project URL.
    #[error("invalid project URL '{value}': {reason}")]
    ProjectUrl { value: String, reason: String },

    /// Invalid remote function name.
    #[error("invalid function name '{value}': {reason}")]
    FunctionName { value: String, reason: String },

    /// Invalid user id.
    #[error("invalid user id '{value}': {reason}")]
    UserId { value: String, reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display_includes_status_and_code() {
        let err = ProtocolError::new(
            400,
            Some("invalid_grant".to_string()),
            Some("Invalid Refresh Token".to_string()),
        );
        assert_eq!(err.to_string(), "HTTP 400 [invalid_grant]: Invalid Refresh Token");
    }

    #[test]
    fn transport_errors_are_recoverable() {
        let err = Error::Transport(TransportError::Timeout);
        assert!(!err.is_unrecoverable_auth());
    }

    #[test]
    fn rejected_refresh_is_unrecoverable() {
        let err = Error::Protocol(ProtocolError::new(400, None, None));
        assert!(err.is_unrecoverable_auth());
        assert!(Error::Auth(AuthError::RefreshTokenInvalid).is_unrecoverable_auth());
        assert!(!Error::Protocol(ProtocolError::new(503, None, None)).is_unrecoverable_auth());
    }
}
