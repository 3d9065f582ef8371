//! Scripted identity provider and function transport.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde_json::{Value, json};
use tokio::sync::{Notify, Semaphore, broadcast};

use folio_core::error::{AuthError, ProtocolError, TransportError};
use folio_core::{
    AccessToken, AuthChange, AuthChangeKind, Credentials, Error, FunctionError, FunctionName,
    FunctionRequest, FunctionTransport, Identity, IdentityProvider, RefreshToken, Result,
    Session, UserId,
};
use folio_session::{SessionStore, StoreState};

/// Build a session whose token expires `seconds` from now.
pub fn session(token: &str, seconds: i64) -> Session {
    Session::new(
        Identity::new(UserId::new("user-1").unwrap()).with_email("ada@example.com"),
        AccessToken::new(token),
        Utc::now() + Duration::seconds(seconds),
    )
    .with_refresh_token(RefreshToken::new(format!("{token}-refresh")))
}

/// What a scripted fetch or refresh returns.
pub enum Reply {
    Session(Session),
    Empty,
    Offline,
    Rejected,
}

impl Reply {
    fn into_result(self) -> Result<Option<Session>> {
        match self {
            Reply::Session(session) => Ok(Some(session)),
            Reply::Empty => Ok(None),
            Reply::Offline => Err(Error::Transport(TransportError::Connection {
                message: "network unreachable".to_string(),
            })),
            Reply::Rejected => Err(Error::Protocol(ProtocolError::new(
                400,
                Some("invalid_grant".to_string()),
                Some("Invalid Refresh Token".to_string()),
            ))),
        }
    }
}

struct ProviderState {
    changes: broadcast::Sender<AuthChange>,
    fetch_reply: Mutex<Option<Reply>>,
    fetch_started: Notify,
    fetch_gate: Semaphore,
    refresh_replies: Mutex<VecDeque<Reply>>,
    refresh_delay: Mutex<StdDuration>,
    refreshes: AtomicUsize,
    fetches: AtomicUsize,
    sign_outs: AtomicUsize,
    sign_out_fails: Mutex<bool>,
}

/// Identity provider whose answers are set up by the test.
///
/// Unscripted refreshes succeed with `refreshed-<n>` tokens valid for an hour.
#[derive(Clone)]
pub struct FakeProvider {
    state: Arc<ProviderState>,
}

impl FakeProvider {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            state: Arc::new(ProviderState {
                changes,
                fetch_reply: Mutex::new(None),
                fetch_started: Notify::new(),
                fetch_gate: Semaphore::new(Semaphore::MAX_PERMITS),
                refresh_replies: Mutex::new(VecDeque::new()),
                refresh_delay: Mutex::new(StdDuration::ZERO),
                refreshes: AtomicUsize::new(0),
                fetches: AtomicUsize::new(0),
                sign_outs: AtomicUsize::new(0),
                sign_out_fails: Mutex::new(false),
            }),
        }
    }

    /// A provider whose bootstrap fetch blocks until [`release_fetch`](Self::release_fetch).
    pub fn gated() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            state: Arc::new(ProviderState {
                changes,
                fetch_reply: Mutex::new(None),
                fetch_started: Notify::new(),
                fetch_gate: Semaphore::new(0),
                refresh_replies: Mutex::new(VecDeque::new()),
                refresh_delay: Mutex::new(StdDuration::ZERO),
                refreshes: AtomicUsize::new(0),
                fetches: AtomicUsize::new(0),
                sign_outs: AtomicUsize::new(0),
                sign_out_fails: Mutex::new(false),
            }),
        }
    }

    pub fn on_fetch(&self, reply: Reply) {
        *self.state.fetch_reply.lock().unwrap() = Some(reply);
    }

    pub fn on_refresh(&self, reply: Reply) {
        self.state.refresh_replies.lock().unwrap().push_back(reply);
    }

    pub fn set_refresh_delay(&self, delay: StdDuration) {
        *self.state.refresh_delay.lock().unwrap() = delay;
    }

    pub fn fail_sign_out(&self) {
        *self.state.sign_out_fails.lock().unwrap() = true;
    }

    pub fn push(&self, change: AuthChange) {
        let _ = self.state.changes.send(change);
    }

    pub async fn fetch_started(&self) {
        self.state.fetch_started.notified().await;
    }

    pub fn release_fetch(&self) {
        self.state.fetch_gate.add_permits(1);
    }

    pub fn refreshes(&self) -> usize {
        self.state.refreshes.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.state.fetches.load(Ordering::SeqCst)
    }

    pub fn sign_outs(&self) -> usize {
        self.state.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    type Changes = BoxStream<'static, AuthChange>;

    fn auth_changes(&self) -> Self::Changes {
        let mut rx = self.state.changes.subscribe();
        async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(change) => yield change,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
        .boxed()
    }

    async fn fetch_current_session(&self) -> Result<Option<Session>> {
        self.state.fetches.fetch_add(1, Ordering::SeqCst);
        self.state.fetch_started.notify_one();
        let permit = self.state.fetch_gate.acquire().await.expect("gate closed");
        permit.forget();

        let reply = self.state.fetch_reply.lock().unwrap().take();
        reply.unwrap_or(Reply::Empty).into_result()
    }

    async fn refresh_session(&self) -> Result<Option<Session>> {
        let n = self.state.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *self.state.refresh_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let reply = self.state.refresh_replies.lock().unwrap().pop_front();
        reply
            .unwrap_or_else(|| Reply::Session(session(&format!("refreshed-{n}"), 3600)))
            .into_result()
    }

    async fn sign_out(&self) -> Result<()> {
        self.state.sign_outs.fetch_add(1, Ordering::SeqCst);
        if *self.state.sign_out_fails.lock().unwrap() {
            return Err(Error::Transport(TransportError::Timeout));
        }
        Ok(())
    }

    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
        if credentials.password() != "hunter2" {
            return Err(AuthError::InvalidCredentials.into());
        }
        Ok(session("signed-in", 3600))
    }
}

/// Function transport that replays scripted outcomes and records requests.
///
/// Unscripted calls succeed with `{"ok": true}`.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<std::result::Result<Value, FunctionError>>>>,
    requests: Arc<Mutex<Vec<FunctionRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, outcome: std::result::Result<Value, FunctionError>) {
        self.replies.lock().unwrap().push_back(outcome);
    }

    pub fn requests(&self) -> Vec<FunctionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl FunctionTransport for ScriptedTransport {
    async fn call(
        &self,
        _name: &FunctionName,
        request: FunctionRequest,
    ) -> std::result::Result<Value, FunctionError> {
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Ok(json!({"ok": true})))
    }
}

/// Wait (bounded) until the store state satisfies `predicate`.
pub async fn wait_until(
    store: &SessionStore<FakeProvider>,
    predicate: impl FnMut(&StoreState) -> bool,
) -> StoreState {
    let mut watch = store.subscribe();
    tokio::time::timeout(StdDuration::from_secs(2), watch.wait_for(predicate))
        .await
        .expect("timed out waiting for store state")
        .expect("store dropped")
}

/// A store whose bootstrap already resolved to `initial`.
pub async fn ready_store(
    provider: &FakeProvider,
    initial: Option<Session>,
) -> SessionStore<FakeProvider> {
    provider.on_fetch(match initial {
        Some(session) => Reply::Session(session),
        None => Reply::Empty,
    });
    let store = SessionStore::new(provider.clone());
    store.bootstrap().await;
    store
}

pub fn signed_in(session: Session) -> AuthChange {
    AuthChange::new(AuthChangeKind::SignedIn, Some(session))
}

pub fn function(name: &str) -> FunctionName {
    FunctionName::new(name).unwrap()
}
