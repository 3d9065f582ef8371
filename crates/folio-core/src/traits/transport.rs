//! Remote function transport trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::function::{FunctionError, FunctionRequest};
use crate::types::FunctionName;

/// Delivers one request to a named remote function.
///
/// Implementations make exactly one physical call per invocation and never
/// retry on their own.
#[async_trait]
pub trait FunctionTransport: Send + Sync {
    /// Call `name` with `request`, returning the decoded response payload.
    async fn call(
        &self,
        name: &FunctionName,
        request: FunctionRequest,
    ) -> std::result::Result<Value, FunctionError>;
}
