//! Identity provider trait.

use async_trait::async_trait;

use crate::session::Session;
use crate::{Credentials, Result};

use super::AuthChanges;

/// The identity service that issues and rotates sessions.
///
/// Providers are stateful: they remember the session they last issued, so
/// refresh and sign-out take no arguments.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Change stream type for this provider.
    type Changes: AuthChanges;

    /// Subscribe to pushed session changes.
    ///
    /// Dropping the returned stream unsubscribes.
    fn auth_changes(&self) -> Self::Changes;

    /// Fetch the provider's current session.
    async fn fetch_current_session(&self) -> Result<Option<Session>>;

    /// Exchange the refresh token for a new session.
    ///
    /// Returns `Ok(None)` when there is no session to refresh.
    async fn refresh_session(&self) -> Result<Option<Session>>;

    /// Terminate the current session.
    async fn sign_out(&self) -> Result<()>;

    /// Create a session from email and password.
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session>;
}
