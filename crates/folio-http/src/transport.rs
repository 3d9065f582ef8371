//! Remote function transport over `POST /functions/v1/<name>`.

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{debug, instrument, trace};

use folio_core::{FunctionError, FunctionName, FunctionRequest, FunctionTransport, Result};

use crate::client::RestClient;
use crate::config::ClientConfig;

/// Message used when a failed response carries no readable error text.
const NON_2XX_MESSAGE: &str = "Edge Function returned a non-2xx status code";

/// Calls the project's remote functions.
#[derive(Debug, Clone)]
pub struct HttpFunctionTransport {
    client: RestClient,
}

impl HttpFunctionTransport {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self::with_client(RestClient::new(config)?))
    }

    /// Build on an existing client, sharing its connection pool.
    pub fn with_client(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FunctionTransport for HttpFunctionTransport {
    #[instrument(skip(self, name, request), fields(function = %name))]
    async fn call(
        &self,
        name: &FunctionName,
        request: FunctionRequest,
    ) -> std::result::Result<Value, FunctionError> {
        let url = self.client.config().project_url.function_url(name);
        let mut builder = self.client.post(&url);

        for (key, value) in &request.headers {
            let key = HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| FunctionError::transport(format!("invalid header name '{key}'")))?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                FunctionError::transport(format!("invalid value for header '{key}'"))
            })?;
            builder = builder.header(key, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!("invoking function");
        let response = builder
            .send()
            .await
            .map_err(|e| FunctionError::transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FunctionError::transport(e.to_string()))?;
        trace!(status = %status, bytes = text.len(), "function response");

        let body = decode_body(&text);
        if status.is_success() {
            return Ok(body);
        }

        let body = (!body.is_null()).then_some(body);
        let message = body
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| NON_2XX_MESSAGE.to_string());
        Err(FunctionError::http(status.as_u16(), message, body))
    }
}

/// JSON if it parses, the raw text otherwise, `null` when empty.
fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn error_message(body: &Value) -> Option<String> {
    match body {
        Value::String(text) => Some(text.clone()),
        Value::Object(fields) => ["error", "message", "msg"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}
