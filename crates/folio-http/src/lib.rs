//! folio-http - HTTP implementations of the folio boundaries.
//!
//! [`HttpIdentityProvider`] talks to the project's `/auth/v1` endpoints and
//! [`HttpFunctionTransport`] posts to `/functions/v1/<name>`. Both share a
//! [`ClientConfig`] and send the project API key with every request.

mod client;
mod config;
mod endpoints;
mod provider;
mod transport;

pub use client::RestClient;
pub use config::{ClientConfig, DEFAULT_TIMEOUT_SECONDS};
pub use provider::HttpIdentityProvider;
pub use transport::HttpFunctionTransport;
