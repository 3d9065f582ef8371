//! Authoritative session state for the process.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use chrono::{Duration, Utc};
use futures_util::StreamExt;
use tokio::sync::{Mutex, watch};
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};

use folio_core::traits::IdentityProvider;
use folio_core::{AccessToken, Credentials, Result, Session};

/// Lifecycle of a [`SessionStore`].
///
/// The store is `Loading` from construction until the first authoritative
/// answer (bootstrap result, bootstrap failure or pushed change), then
/// `Ready` for the rest of its life.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Loading,
    Ready,
}

/// Snapshot of the store: lifecycle plus the current session.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    lifecycle: Lifecycle,
    session: Option<Session>,
    revision: u64,
}

impl StoreState {
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Ticket of the last applied session update; 0 before any update.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }
}

/// Observes changes of the store's session.
///
/// Rapid changes may coalesce into one wakeup; [`latest`](Self::latest) is
/// always the newest state. Dropping the watch unregisters it.
#[derive(Debug)]
pub struct SessionWatch {
    rx: watch::Receiver<StoreState>,
}

impl SessionWatch {
    /// Wait for the next change. Returns `false` once the store is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Snapshot of the latest state, marking it as seen.
    pub fn latest(&mut self) -> StoreState {
        self.rx.borrow_and_update().clone()
    }

    /// Wait until the state satisfies `predicate` and return that snapshot.
    ///
    /// Returns `None` if the store is dropped first.
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&StoreState) -> bool,
    ) -> Option<StoreState> {
        self.rx
            .wait_for(|state| predicate(state))
            .await
            .ok()
            .map(|state| (*state).clone())
    }
}

/// The single owner of the current [`Session`].
///
/// Every write, whether it comes from a pushed change, the bootstrap fetch,
/// a refresh or a sign-out, goes through one apply step tagged with a
/// monotonically increasing ticket. A write whose ticket is older than the
/// last applied one is dropped, so the most recent observation wins no matter
/// in which order the tasks finish.
///
/// Handles are cheap to clone. The provider subscription lives until
/// [`SessionStore::shutdown`] is called or the last handle is dropped.
pub struct SessionStore<P: IdentityProvider> {
    inner: Arc<StoreInner<P>>,
}

struct StoreInner<P> {
    provider: P,
    state: watch::Sender<StoreState>,
    tickets: AtomicU64,
    alive: AtomicBool,
    bootstrapped: AtomicBool,
    /// Held for the duration of a refresh; holds the token the last one produced.
    refresh_gate: Mutex<Option<AccessToken>>,
    /// Bumped under the gate each time a refresh finishes, successful or not.
    refresh_epoch: AtomicU64,
    listener: OnceLock<AbortHandle>,
}

impl<P: IdentityProvider> Clone for SessionStore<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: IdentityProvider> SessionStore<P> {
    /// Create a store and subscribe it to the provider's change stream.
    ///
    /// The subscription is wired before this returns, so a change pushed
    /// while [`bootstrap`](Self::bootstrap) is in flight is never lost.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn new(provider: P) -> Self {
        let changes = provider.auth_changes();
        let (state, _) = watch::channel(StoreState {
            lifecycle: Lifecycle::Loading,
            ..StoreState::default()
        });

        let inner = Arc::new(StoreInner {
            provider,
            state,
            tickets: AtomicU64::new(0),
            alive: AtomicBool::new(true),
            bootstrapped: AtomicBool::new(false),
            refresh_gate: Mutex::new(None),
            refresh_epoch: AtomicU64::new(0),
            listener: OnceLock::new(),
        });

        let task = tokio::spawn(listen(Arc::downgrade(&inner), changes));
        let _ = inner.listener.set(task.abort_handle());

        debug!("session store loading");
        Self { inner }
    }

    /// Returns the identity provider behind this store.
    pub fn provider(&self) -> &P {
        &self.inner.provider
    }

    /// Fetch the provider's current session once.
    ///
    /// Only the first call does anything. A failed fetch is logged and the
    /// store becomes ready without a session; it never surfaces an error.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) {
        if self.inner.bootstrapped.swap(true, Ordering::AcqRel) {
            debug!("bootstrap already ran");
            return;
        }

        let ticket = self.inner.next_ticket();
        match self.inner.provider.fetch_current_session().await {
            Ok(session) => {
                if !self.inner.apply(ticket, session) {
                    debug!("newer session already observed; discarding bootstrap result");
                }
            }
            Err(e) => {
                warn!(error = %e, "bootstrap fetch failed; continuing without a session");
                self.inner.mark_ready();
            }
        }
    }

    /// Register for session changes.
    ///
    /// Changes that land before the watcher looks may coalesce: a subscriber
    /// always sees the latest state but can miss intermediate ones.
    pub fn subscribe(&self) -> SessionWatch {
        SessionWatch {
            rx: self.inner.state.subscribe(),
        }
    }

    /// Snapshot of the full store state.
    pub fn state(&self) -> StoreState {
        self.inner.state.borrow().clone()
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Option<Session> {
        self.inner.state.borrow().session.clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.state.borrow().lifecycle
    }

    /// Wait until the store has reached [`Lifecycle::Ready`] or shut down.
    pub async fn wait_ready(&self) {
        let mut rx = self.inner.state.subscribe();
        let alive = &self.inner.alive;
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx
            .wait_for(|state| state.is_ready() || !alive.load(Ordering::Acquire))
            .await;
    }

    /// Returns an access token that outlives `refresh_skew`.
    ///
    /// A token inside the skew window is refreshed first. Concurrent callers
    /// share one refresh: whoever queued behind it gets its outcome, a failed
    /// refresh included, instead of trying again. Returns `None` when there is
    /// no session or the refresh fails.
    #[instrument(skip(self))]
    pub async fn usable_credential(&self, refresh_skew: Duration) -> Option<AccessToken> {
        // While the bootstrap fetch is in flight "no session" is not an answer yet.
        if self.inner.bootstrapped.load(Ordering::Acquire) && !self.state().is_ready() {
            self.wait_ready().await;
        }

        // Read before the session so a refresh finishing in between is noticed.
        let attempts = self.inner.refresh_epoch.load(Ordering::Acquire);
        let session = self.current()?;
        if session.is_usable_at(Utc::now(), refresh_skew) {
            return Some(session.access_token().clone());
        }

        debug!(
            expires_in = session.expires_in(Utc::now()).num_seconds(),
            "credential inside refresh window"
        );

        let mut last = self.inner.refresh_gate.lock().await;

        match self.current() {
            None => {
                debug!("session ended while waiting for the refresh gate");
                return None;
            }
            Some(session) if session.is_usable_at(Utc::now(), refresh_skew) => {
                debug!("session renewed while waiting; skipping refresh");
                return Some(session.access_token().clone());
            }
            Some(_) => {}
        }
        if self.inner.refresh_epoch.load(Ordering::Acquire) != attempts {
            debug!(refreshed = last.is_some(), "sharing the refresh that finished while waiting");
            return last.clone();
        }

        match self.refresh_locked(&mut last).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "refresh failed; no usable credential");
                None
            }
        }
    }

    /// Ask the provider for a new session regardless of token freshness.
    ///
    /// Returns `Ok(None)` when there is no session to refresh. When the
    /// provider rejects the refresh token the session is cleared before the
    /// error is returned.
    #[instrument(skip(self))]
    pub async fn force_refresh(&self) -> Result<Option<AccessToken>> {
        let mut last = self.inner.refresh_gate.lock().await;
        self.refresh_locked(&mut last).await
    }

    /// Terminate the session with the provider, then clear it locally.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        self.inner.provider.sign_out().await?;

        let ticket = self.inner.next_ticket();
        self.inner.apply(ticket, None);
        info!("signed out");
        Ok(())
    }

    /// Sign in with email and password and make the result current.
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    pub async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
        let session = self.inner.provider.sign_in_with_password(credentials).await?;

        let ticket = self.inner.next_ticket();
        self.inner.apply(ticket, Some(session.clone()));
        info!(user = %session.identity().id, "signed in");
        Ok(session)
    }

    /// Tear the store down.
    ///
    /// Unsubscribes from the provider and discards the result of any fetch
    /// or refresh still in flight. Calling it again is a no-op.
    pub fn shutdown(&self) {
        if self.inner.alive.swap(false, Ordering::AcqRel) {
            if let Some(listener) = self.inner.listener.get() {
                listener.abort();
            }
            // Wake wait_ready callers; the state itself is unchanged.
            self.inner.state.send_modify(|_| {});
            debug!("session store shut down");
        }
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        !self.inner.alive.load(Ordering::Acquire)
    }

    // `last` is the refresh gate's guarded slot.
    async fn refresh_locked(&self, last: &mut Option<AccessToken>) -> Result<Option<AccessToken>> {
        let result = self.refresh_with_provider().await;
        *last = result.as_ref().ok().cloned().flatten();
        self.inner.refresh_epoch.fetch_add(1, Ordering::AcqRel);
        result
    }

    async fn refresh_with_provider(&self) -> Result<Option<AccessToken>> {
        let ticket = self.inner.next_ticket();
        info!("refreshing session");

        match self.inner.provider.refresh_session().await {
            Ok(Some(session)) => {
                let token = session.access_token().clone();
                if self.inner.apply(ticket, Some(session)) {
                    debug!("session refreshed");
                    Ok(Some(token))
                } else {
                    debug!("newer session observed during refresh");
                    Ok(self.current().map(|s| s.access_token().clone()))
                }
            }
            Ok(None) => {
                debug!("provider has no session to refresh");
                self.inner.apply(ticket, None);
                Ok(None)
            }
            Err(e) => {
                if e.is_unrecoverable_auth() {
                    warn!(error = %e, "refresh rejected; clearing session");
                    self.inner.apply(ticket, None);
                }
                Err(e)
            }
        }
    }
}

impl<P: IdentityProvider> std::fmt::Debug for SessionStore<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("SessionStore")
            .field("lifecycle", &state.lifecycle)
            .field("signed_in", &state.session.is_some())
            .field("revision", &state.revision)
            .finish()
    }
}

impl<P> StoreInner<P> {
    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// The one entry point for session writes. Returns whether it applied.
    fn apply(&self, ticket: u64, session: Option<Session>) -> bool {
        if !self.alive.load(Ordering::Acquire) {
            debug!(ticket, "store shut down; discarding session update");
            return false;
        }

        let mut applied = false;
        self.state.send_if_modified(|state| {
            if ticket <= state.revision {
                return false;
            }
            if state.lifecycle != Lifecycle::Ready {
                info!("session store ready");
            }
            state.lifecycle = Lifecycle::Ready;
            state.session = session;
            state.revision = ticket;
            applied = true;
            true
        });
        applied
    }

    fn mark_ready(&self) {
        if !self.alive.load(Ordering::Acquire) {
            return;
        }
        self.state.send_if_modified(|state| {
            if state.lifecycle == Lifecycle::Ready {
                return false;
            }
            info!("session store ready");
            state.lifecycle = Lifecycle::Ready;
            true
        });
    }
}

impl<P> Drop for StoreInner<P> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get() {
            listener.abort();
        }
    }
}

async fn listen<P: IdentityProvider>(inner: Weak<StoreInner<P>>, changes: P::Changes) {
    let mut changes = std::pin::pin!(changes);

    while let Some(change) = changes.next().await {
        let Some(store) = inner.upgrade() else {
            break;
        };
        let ticket = store.next_ticket();
        debug!(kind = ?change.kind, ticket, "auth change pushed");
        store.apply(ticket, change.session);
    }

    debug!("auth change stream ended");
}
