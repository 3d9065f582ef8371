//! HTTP client for the project's REST surface.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, trace};

use folio_core::Result;
use folio_core::error::{Error, InvalidInputError, ProtocolError, TransportError};

use crate::config::ClientConfig;
use crate::endpoints::{AuthErrorResponse, TOKEN};

/// Header carrying the project API key.
pub const API_KEY_HEADER: &str = "apikey";

/// Shared HTTP client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl RestClient {
    /// Create a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// TLS backend cannot be initialised.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let api_key =
            HeaderValue::from_str(&config.api_key).map_err(|_| InvalidInputError::Other {
                message: "API key contains characters not allowed in a header".to_string(),
            })?;
        headers.insert(API_KEY_HEADER, api_key);

        let client = reqwest::Client::builder()
            .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a POST to an arbitrary project URL. The API key is already set.
    pub(crate) fn post(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.post(url)
    }

    /// Exchange a grant at the token endpoint.
    #[instrument(skip(self, body), fields(project = %self.config.project_url))]
    pub(crate) async fn token<B, R>(&self, grant_type: &str, body: &B) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = self.config.project_url.auth_url(TOKEN);
        debug!(grant_type, "token request");

        let response = self
            .client
            .post(&url)
            .query(&[("grant_type", grant_type)])
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        self.handle_response(response).await
    }

    /// POST to an identity endpoint with a bearer token, expecting no body back.
    #[instrument(skip(self, token), fields(project = %self.config.project_url))]
    pub(crate) async fn auth_procedure_no_response(&self, path: &str, token: &str) -> Result<()> {
        let url = self.config.project_url.auth_url(path);
        debug!(path, "authenticated procedure (no response)");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Protocol(parse_error_response(response).await))
        }
    }

    async fn handle_response<R: DeserializeOwned>(&self, response: reqwest::Response) -> Result<R> {
        let status = response.status();
        trace!(status = %status, "identity response");

        if status.is_success() {
            response.json::<R>().await.map_err(transport_error)
        } else {
            Err(Error::Protocol(parse_error_response(response).await))
        }
    }
}

async fn parse_error_response(response: reqwest::Response) -> ProtocolError {
    let status = response.status().as_u16();

    match response.json::<AuthErrorResponse>().await {
        Ok(body) => ProtocolError::new(status, body.code(), body.description()),
        Err(_) => ProtocolError::new(status, None, None),
    }
}

/// Map a reqwest failure onto the transport error kinds.
pub(crate) fn transport_error(e: reqwest::Error) -> Error {
    let error = if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connection {
            message: e.to_string(),
        }
    } else if e.is_decode() {
        TransportError::Decode {
            message: e.to_string(),
        }
    } else {
        TransportError::Http {
            message: e.to_string(),
        }
    };
    Error::Transport(error)
}
