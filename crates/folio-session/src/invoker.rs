//! Remote function calls with credential attachment and one auth retry.

use std::collections::BTreeMap;

use chrono::Duration;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use folio_core::traits::{FunctionTransport, IdentityProvider};
use folio_core::{
    AccessToken, AuthFailureClassifier, FunctionError, FunctionName, FunctionRequest,
    is_auth_failure,
};

use crate::store::SessionStore;

/// Refresh a token this many seconds before it expires.
pub const DEFAULT_REFRESH_SKEW_SECONDS: i64 = 60;

/// Per-call options for [`ResilientInvoker::invoke`].
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    /// JSON body.
    pub body: Option<Value>,
    /// Extra headers. A caller-supplied `Authorization` is replaced whenever
    /// a credential is available.
    pub headers: BTreeMap<String, String>,
    /// Refresh and retry once when the call fails with an auth-class error.
    pub retry_on_auth_error: bool,
    /// Tokens expiring sooner than this are refreshed before the call.
    pub refresh_skew: Duration,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            body: None,
            headers: BTreeMap::new(),
            retry_on_auth_error: true,
            refresh_skew: Duration::seconds(DEFAULT_REFRESH_SKEW_SECONDS),
        }
    }
}

impl InvokeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_retry_on_auth_error(mut self, retry: bool) -> Self {
        self.retry_on_auth_error = retry;
        self
    }

    pub fn with_refresh_skew(mut self, skew: Duration) -> Self {
        self.refresh_skew = skew;
        self
    }
}

/// What happened during one [`ResilientInvoker::invoke`].
#[derive(Debug, Clone)]
pub struct Invocation {
    /// The function that was called.
    pub function: FunctionName,
    /// Credential attached to the last physical call, if any.
    pub credential: Option<AccessToken>,
    /// Result of the last physical call.
    pub outcome: Result<Value, FunctionError>,
    /// Physical calls made: 1 or 2.
    pub calls: u8,
    /// Whether a forced refresh was attempted.
    pub refreshed: bool,
}

impl Invocation {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The response payload, if the call succeeded.
    pub fn data(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    /// The failure, if the call failed.
    pub fn error(&self) -> Option<&FunctionError> {
        self.outcome.as_ref().err()
    }

    /// Whether the final failure is auth-class.
    ///
    /// After a retry this means the session cannot be recovered and the
    /// user has to sign in again.
    pub fn is_auth_failure(&self) -> bool {
        self.error().is_some_and(is_auth_failure)
    }

    pub fn into_result(self) -> Result<Value, FunctionError> {
        self.outcome
    }
}

/// Calls remote functions on behalf of the signed-in user.
///
/// Each [`invoke`](Self::invoke) makes at most two physical calls and at most
/// one forced refresh. There are no other retries.
pub struct ResilientInvoker<P: IdentityProvider, T> {
    store: SessionStore<P>,
    transport: T,
    classifier: AuthFailureClassifier,
}

impl<P, T> ResilientInvoker<P, T>
where
    P: IdentityProvider,
    T: FunctionTransport,
{
    pub fn new(store: SessionStore<P>, transport: T) -> Self {
        Self {
            store,
            transport,
            classifier: is_auth_failure,
        }
    }

    /// Replace the auth-class failure predicate.
    pub fn with_classifier(mut self, classifier: AuthFailureClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn store(&self) -> &SessionStore<P> {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Call `function` with the freshest credential the store can provide.
    ///
    /// 1. Take a credential that outlives `refresh_skew`, refreshing if needed.
    /// 2. Attach it as a bearer token, or send no `Authorization` at all.
    /// 3. On an auth-class failure (and only if retries are enabled) force a
    ///    refresh and, if that produced a token, call once more with it.
    ///
    /// Failures are reported in the returned [`Invocation`], never panicked.
    #[instrument(skip(self, function, options), fields(function = %function))]
    pub async fn invoke(&self, function: &FunctionName, options: InvokeOptions) -> Invocation {
        let InvokeOptions {
            body,
            headers,
            retry_on_auth_error,
            refresh_skew,
        } = options;
        let request = FunctionRequest { body, headers };

        let credential = self.store.usable_credential(refresh_skew).await;
        if credential.is_none() {
            debug!("no credential available; calling without authorization");
        }

        let outcome = self.call(function, request.clone(), credential.as_ref()).await;
        let mut invocation = Invocation {
            function: function.clone(),
            credential,
            outcome,
            calls: 1,
            refreshed: false,
        };

        let Err(error) = &invocation.outcome else {
            return invocation;
        };
        if !(self.classifier)(error) {
            debug!(status = ?error.status, "call failed; not an auth failure");
            return invocation;
        }
        if !retry_on_auth_error {
            debug!("auth failure; retry disabled");
            return invocation;
        }

        info!(status = ?error.status, "auth failure; forcing session refresh");
        invocation.refreshed = true;

        let fresh = match self.store.force_refresh().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                warn!("no session after refresh; returning original failure");
                return invocation;
            }
            Err(e) => {
                warn!(error = %e, "forced refresh failed; returning original failure");
                return invocation;
            }
        };

        invocation.outcome = self.call(function, request, Some(&fresh)).await;
        invocation.credential = Some(fresh);
        invocation.calls = 2;

        if let Err(error) = &invocation.outcome {
            debug!(status = ?error.status, "retry failed");
        }
        invocation
    }

    async fn call(
        &self,
        function: &FunctionName,
        mut request: FunctionRequest,
        credential: Option<&AccessToken>,
    ) -> Result<Value, FunctionError> {
        if let Some(token) = credential {
            request.set_bearer(token);
        }
        self.transport.call(function, request).await
    }
}

impl<P: IdentityProvider, T> std::fmt::Debug for ResilientInvoker<P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientInvoker")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
