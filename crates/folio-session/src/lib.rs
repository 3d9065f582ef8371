//! folio-session - Session store and resilient remote function invoker.
//!
//! [`SessionStore`] owns the current session for the life of the process:
//! it listens to the identity provider's pushed changes, performs one
//! bootstrap fetch, and hands out fresh credentials. [`ResilientInvoker`]
//! calls remote functions with those credentials and retries once when a
//! call fails because the token was rejected.
//!
//! # Example
//!
//! ```no_run
//! use folio_core::{FunctionName, FunctionTransport, IdentityProvider};
//! use folio_session::{InvokeOptions, ResilientInvoker, SessionStore};
//!
//! async fn generate<P: IdentityProvider, T: FunctionTransport>(provider: P, transport: T) {
//!     let store = SessionStore::new(provider);
//!     store.bootstrap().await;
//!
//!     let invoker = ResilientInvoker::new(store, transport);
//!     let name = FunctionName::new("generate-pdf").unwrap();
//!     let invocation = invoker
//!         .invoke(&name, InvokeOptions::new().with_body(serde_json::json!({"doc": 1})))
//!         .await;
//!
//!     if invocation.is_auth_failure() {
//!         // The session is gone for good; ask the user to sign in again.
//!     }
//! }
//! ```

mod invoker;
mod store;

pub use invoker::{DEFAULT_REFRESH_SKEW_SECONDS, Invocation, InvokeOptions, ResilientInvoker};
pub use store::{Lifecycle, SessionStore, SessionWatch, StoreState};
