//! CLI session wrapper.

pub mod storage;

use anyhow::{Context, Result};
use folio_core::{ProjectUrl, Session};
use folio_http::{ClientConfig, HttpFunctionTransport, HttpIdentityProvider};
use folio_session::SessionStore;
use tracing::debug;

use crate::cli::ProjectArgs;
use storage::{SessionFile, StoredSession};

/// Resolve connection settings from flags, environment or the stored session.
pub fn client_config(args: &ProjectArgs, stored: Option<&ProjectUrl>) -> Result<ClientConfig> {
    let project_url = match (&args.url, stored) {
        (Some(url), _) => ProjectUrl::new(url).context("Invalid project URL")?,
        (None, Some(url)) => url.clone(),
        (None, None) => anyhow::bail!("No project URL. Pass --url or set FOLIO_URL."),
    };
    let api_key = args
        .api_key
        .as_deref()
        .context("No API key. Pass --api-key or set FOLIO_API_KEY.")?;

    Ok(ClientConfig::new(project_url, api_key)?.with_timeout_seconds(args.timeout))
}

/// A bootstrapped session store wired to the stored session.
pub struct CliSession {
    file: Option<SessionFile>,
    project_url: ProjectUrl,
    provider: HttpIdentityProvider,
    store: SessionStore<HttpIdentityProvider>,
    config: ClientConfig,
}

impl CliSession {
    /// Open the store on top of whatever session is on disk.
    pub async fn open(args: &ProjectArgs, file: SessionFile) -> Result<Self> {
        let stored = file.load().context("Failed to load session")?;
        let config = client_config(args, stored.as_ref().map(|s| &s.project_url))?;

        // A session minted by another project is useless here, and its file
        // is left alone.
        let (file, session) = match stored {
            Some(s) if s.project_url != config.project_url => (None, None),
            stored => (Some(file), stored.map(|s| s.session)),
        };

        Self::start(file, config, session)
            .await
            .context("Failed to create HTTP client")
    }

    /// Open the store and fail unless a session was stored.
    pub async fn open_signed_in(args: &ProjectArgs, file: SessionFile) -> Result<Self> {
        let cli = Self::open(args, file).await?;
        if cli.store.current().is_none() {
            anyhow::bail!("No active session. Run 'folio login' first.");
        }
        Ok(cli)
    }

    /// Start with an empty store, for signing in.
    pub async fn fresh(config: ClientConfig, file: SessionFile) -> Result<Self> {
        Self::start(Some(file), config, None)
            .await
            .context("Failed to create HTTP client")
    }

    async fn start(
        file: Option<SessionFile>,
        config: ClientConfig,
        session: Option<Session>,
    ) -> folio_core::Result<Self> {
        let provider = HttpIdentityProvider::from_persisted(config.clone(), session)?;
        let store = SessionStore::new(provider.clone());
        store.bootstrap().await;

        Ok(Self {
            file,
            project_url: config.project_url.clone(),
            provider,
            store,
            config,
        })
    }

    pub fn store(&self) -> &SessionStore<HttpIdentityProvider> {
        &self.store
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A transport sharing the provider's HTTP client.
    pub fn transport(&self) -> HttpFunctionTransport {
        HttpFunctionTransport::with_client(self.provider.client().clone())
    }

    /// Write the provider's current session back to disk, or remove the file
    /// when the session has ended.
    pub async fn persist(&self) -> Result<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        match self.provider.export_session().await {
            Some(session) => {
                debug!(path = %file.path().display(), "saving session");
                file.save(&StoredSession {
                    project_url: self.project_url.clone(),
                    session,
                })
            }
            None => {
                debug!(path = %file.path().display(), "session ended; removing file");
                file.clear()
            }
        }
    }

    /// Persist and stop listening for changes.
    pub async fn close(self) -> Result<()> {
        let result = self.persist().await;
        self.store.shutdown();
        result
    }
}
