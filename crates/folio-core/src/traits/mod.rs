//! Boundary traits for the identity service and the function transport.

mod changes;
mod identity;
mod transport;

pub use changes::{AuthChange, AuthChangeKind, AuthChanges};
pub use identity::IdentityProvider;
pub use transport::FunctionTransport;
