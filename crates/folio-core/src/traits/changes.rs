//! Auth change notifications.

use futures_core::Stream;

use crate::session::Session;

/// What caused an auth change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeKind {
    /// The provider's view of the session at subscription time.
    InitialSession,
    /// A user signed in.
    SignedIn,
    /// The session was terminated.
    SignedOut,
    /// The access token was rotated.
    TokenRefreshed,
    /// The user record changed (email, metadata).
    UserUpdated,
}

/// A pushed change of the provider's session.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthChange {
    /// What happened.
    pub kind: AuthChangeKind,
    /// The session after the change, if any.
    pub session: Option<Session>,
}

impl AuthChange {
    /// Create a change notification.
    pub fn new(kind: AuthChangeKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }

    /// A sign-out notification.
    pub fn signed_out() -> Self {
        Self::new(AuthChangeKind::SignedOut, None)
    }
}

/// Stream of auth change notifications.
pub trait AuthChanges: Stream<Item = AuthChange> + Send + 'static {}

impl<T> AuthChanges for T where T: Stream<Item = AuthChange> + Send + 'static {}
