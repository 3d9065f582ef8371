//! folio-core - Session, credential and remote-function types.
//!
//! This crate holds the values and boundary traits shared by the session
//! store, the resilient invoker and the concrete HTTP backends.

pub mod classify;
pub mod credentials;
pub mod error;
pub mod function;
pub mod session;
pub mod tokens;
pub mod traits;
pub mod types;

pub use classify::{AuthFailureClassifier, is_auth_failure};
pub use credentials::Credentials;
pub use error::Error;
pub use function::{FunctionError, FunctionRequest};
pub use session::{Identity, Session};
pub use tokens::{AccessToken, RefreshToken};
pub use traits::{AuthChange, AuthChangeKind, AuthChanges, FunctionTransport, IdentityProvider};
pub use types::{FunctionName, ProjectUrl, UserId};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
