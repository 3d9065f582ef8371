//! Identity service endpoint definitions and request/response types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use folio_core::error::{Error, TransportError};
use folio_core::{AccessToken, Identity, RefreshToken, Result, Session, UserId};

// ============================================================================
// Endpoint Names
// ============================================================================

/// Token endpoint; the grant type goes in the query string.
pub const TOKEN: &str = "token";

/// Session termination.
pub const LOGOUT: &str = "logout";

pub const GRANT_PASSWORD: &str = "password";

pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for the password grant.
#[derive(Debug, Serialize)]
pub struct PasswordGrantRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Request body for the refresh grant.
#[derive(Debug, Serialize)]
pub struct RefreshGrantRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response from either grant.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    /// Absolute expiry as a Unix timestamp, when the server sends one.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct UserResponse {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl TokenResponse {
    /// Convert to a [`Session`], computing the expiry relative to `now`
    /// unless the server gave an absolute one.
    ///
    /// An empty access token or an unrepresentable expiry is a decode error.
    pub fn into_session(self, now: DateTime<Utc>) -> Result<Session> {
        if self.access_token.trim().is_empty() {
            return Err(decode_error("token response has an empty access_token"));
        }

        let expires_at = match self.expires_at.and_then(|secs| DateTime::from_timestamp(secs, 0)) {
            Some(at) => at,
            None => Duration::try_seconds(self.expires_in)
                .and_then(|ttl| now.checked_add_signed(ttl))
                .ok_or_else(|| {
                    decode_error(format!("expires_in out of range: {}", self.expires_in))
                })?,
        };

        let mut identity = Identity::new(UserId::new(self.user.id)?);
        if let Some(email) = self.user.email {
            identity = identity.with_email(email);
        }

        let mut session = Session::new(identity, AccessToken::new(self.access_token), expires_at);
        if let Some(refresh_token) = self.refresh_token {
            session = session.with_refresh_token(RefreshToken::new(refresh_token));
        }
        Ok(session)
    }
}

fn decode_error(message: impl Into<String>) -> Error {
    Error::Transport(TransportError::Decode {
        message: message.into(),
    })
}

/// Error body returned by the identity service.
///
/// Older endpoints use `error`/`error_description`, newer ones `error_code`/`msg`.
#[derive(Debug, Default, Deserialize)]
pub struct AuthErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthErrorResponse {
    pub fn code(&self) -> Option<String> {
        self.error.clone().or_else(|| self.error_code.clone())
    }

    pub fn description(&self) -> Option<String> {
        self.error_description
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.message.clone())
    }
}
