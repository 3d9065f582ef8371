//! Identity provider backed by the project's `/auth/v1` endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use futures_util::future::ready;
use futures_util::stream::BoxStream;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, instrument, warn};

use folio_core::error::{AuthError, Error};
use folio_core::{AuthChange, AuthChangeKind, Credentials, IdentityProvider, Result, Session};

use crate::client::RestClient;
use crate::config::ClientConfig;
use crate::endpoints::{
    GRANT_PASSWORD, GRANT_REFRESH_TOKEN, LOGOUT, PasswordGrantRequest, RefreshGrantRequest,
    TokenResponse,
};

const CHANGE_BUFFER: usize = 16;

/// Identity provider for a hosted project.
///
/// Holds the current session in memory and announces every sign-in, refresh
/// and sign-out on its change stream.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    client: RestClient,
    session: RwLock<Option<Session>>,
    changes: broadcast::Sender<AuthChange>,
}

impl HttpIdentityProvider {
    /// Create a provider with no session.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::from_persisted(config, None)
    }

    /// Restore a provider from a previously exported session.
    pub fn from_persisted(config: ClientConfig, session: Option<Session>) -> Result<Self> {
        Ok(Self::with_client(RestClient::new(config)?, session))
    }

    /// Build on an existing client, sharing its connection pool.
    pub fn with_client(client: RestClient, session: Option<Session>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            inner: Arc::new(ProviderInner {
                client,
                session: RwLock::new(session),
                changes,
            }),
        }
    }

    pub fn client(&self) -> &RestClient {
        &self.inner.client
    }

    /// Export the current session for persistence.
    pub async fn export_session(&self) -> Option<Session> {
        self.inner.session.read().await.clone()
    }

    async fn install(&self, kind: AuthChangeKind, session: Option<Session>) {
        *self.inner.session.write().await = session.clone();
        // No receivers is fine: nobody is listening yet.
        let _ = self.inner.changes.send(AuthChange::new(kind, session));
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    type Changes = BoxStream<'static, AuthChange>;

    fn auth_changes(&self) -> Self::Changes {
        BroadcastStream::new(self.inner.changes.subscribe())
            .filter_map(|change| {
                ready(match change {
                    Ok(change) => Some(change),
                    Err(e) => {
                        warn!(error = %e, "auth change listener lagged");
                        None
                    }
                })
            })
            .boxed()
    }

    async fn fetch_current_session(&self) -> Result<Option<Session>> {
        Ok(self.export_session().await)
    }

    #[instrument(skip(self))]
    async fn refresh_session(&self) -> Result<Option<Session>> {
        let Some(current) = self.export_session().await else {
            debug!("no session to refresh");
            return Ok(None);
        };
        let refresh_token = current
            .refresh_token()
            .ok_or(AuthError::RefreshTokenInvalid)?
            .as_str()
            .to_string();

        let request = RefreshGrantRequest {
            refresh_token: &refresh_token,
        };
        let response: std::result::Result<TokenResponse, Error> = self
            .inner
            .client
            .token(GRANT_REFRESH_TOKEN, &request)
            .await;

        match response {
            Ok(response) => {
                let session = response.into_session(Utc::now())?;
                info!(user = %session.identity().id, "session refreshed");
                self.install(AuthChangeKind::TokenRefreshed, Some(session.clone()))
                    .await;
                Ok(Some(session))
            }
            Err(e) if e.is_unrecoverable_auth() => {
                warn!(error = %e, "refresh token rejected; signing out locally");
                self.install(AuthChangeKind::SignedOut, None).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<()> {
        let Some(current) = self.export_session().await else {
            debug!("already signed out");
            return Ok(());
        };

        match self
            .inner
            .client
            .auth_procedure_no_response(LOGOUT, current.access_token().as_str())
            .await
        {
            Ok(()) => {}
            // The server has already forgotten the session.
            Err(Error::Protocol(e)) if matches!(e.status, 401 | 403 | 404) => {
                debug!(status = e.status, "session unknown to server");
            }
            Err(e) => return Err(e),
        }

        self.install(AuthChangeKind::SignedOut, None).await;
        info!("signed out");
        Ok(())
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<Session> {
        let request = PasswordGrantRequest {
            email: credentials.email(),
            password: credentials.password(),
        };
        let response: TokenResponse = self
            .inner
            .client
            .token(GRANT_PASSWORD, &request)
            .await
            .map_err(|e| match e {
                Error::Protocol(p) if matches!(p.status, 400 | 401) => {
                    debug!(error = %p, "password grant refused");
                    Error::Auth(AuthError::InvalidCredentials)
                }
                other => other,
            })?;

        let session = response.into_session(Utc::now())?;
        info!(user = %session.identity().id, "signed in");
        self.install(AuthChangeKind::SignedIn, Some(session.clone()))
            .await;
        Ok(session)
    }
}

impl std::fmt::Debug for HttpIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIdentityProvider")
            .field("project", &self.inner.client.config().project_url)
            .field("session", &"[REDACTED]")
            .finish()
    }
}
