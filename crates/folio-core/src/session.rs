//! Authenticated session value.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::tokens::{AccessToken, RefreshToken};
use crate::types::UserId;

/// The user a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id assigned by the identity service.
    pub id: UserId,
    /// Account email, when the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    /// Create an identity without an email.
    pub fn new(id: UserId) -> Self {
        Self { id, email: None }
    }

    /// Attach an email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// An authenticated identity window.
///
/// Sessions are immutable: a refresh or sign-out replaces the whole value,
/// it never edits one in place. Token values are redacted from Debug output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    access_token: AccessToken,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<RefreshToken>,
    expires_at: DateTime<Utc>,
    identity: Identity,
}

impl Session {
    /// Create a session without a refresh token.
    pub fn new(identity: Identity, access_token: AccessToken, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token,
            refresh_token: None,
            expires_at,
            identity,
        }
    }

    /// Attach the refresh token issued alongside the access token.
    pub fn with_refresh_token(mut self, refresh_token: RefreshToken) -> Self {
        self.refresh_token = Some(refresh_token);
        self
    }

    /// Returns the bearer credential for this session.
    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    /// Returns the refresh token, if the service issued one.
    pub fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    /// Returns the absolute expiry of the access token.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns the user this session belongs to.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Remaining lifetime of the access token at `now` (negative once expired).
    pub fn expires_in(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }

    /// Whether the access token outlives `now` by strictly more than `skew`.
    pub fn is_usable_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.expires_in(now) > skew
    }
}
