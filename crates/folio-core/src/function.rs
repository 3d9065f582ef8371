//! Remote function request and failure types.

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::tokens::AccessToken;

/// Name of the header that carries the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";

/// A request to a remote function: an optional JSON body plus headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionRequest {
    /// JSON body, sent as `application/json` when present.
    pub body: Option<Value>,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
}

impl FunctionRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Attach `token` as the bearer credential.
    ///
    /// Any existing authorization header is replaced, whatever its casing.
    pub fn set_bearer(&mut self, token: &AccessToken) {
        self.headers
            .retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION));
        self.headers.insert(AUTHORIZATION.to_string(), token.bearer());
    }

    /// Returns the authorization header value, if any.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION))
            .map(|(_, value)| value.as_str())
    }
}

/// A failed remote function call.
///
/// `status` is present when the call reached the server; transport failures
/// (DNS, connection reset, timeout) leave it empty.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct FunctionError {
    /// HTTP status reported by the transport.
    pub status: Option<u16>,
    /// Human-readable description.
    pub message: String,
    /// Response body, when the server sent one.
    pub body: Option<Value>,
}

impl FunctionError {
    /// A failure reported by the server with an HTTP status.
    pub fn http(status: u16, message: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            body,
        }
    }

    /// A failure that never produced a response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    /// The response body rendered as JSON text, or empty if there is none.
    pub fn serialized_body(&self) -> String {
        match &self.body {
            Some(body) => serde_json::to_string(body).unwrap_or_default(),
            None => String::new(),
        }
    }
}
