//! Validated identifier types.
//!
//! These types enforce their format at construction time, so an invalid
//! URL or function name never reaches the transport.

mod function_name;
mod project_url;
mod user_id;

pub use function_name::FunctionName;
pub use project_url::ProjectUrl;
pub use user_id::UserId;
