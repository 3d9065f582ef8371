//! Auth-class failure classification.
//!
//! The identity service and the function gateway do not agree on a single
//! signal for "your token is no good", so classification is a heuristic over
//! the status, the message and the body. Keep every rule here; retry logic
//! only ever asks [`is_auth_failure`].

use crate::function::FunctionError;

/// Signature of a failure classifier.
pub type AuthFailureClassifier = fn(&FunctionError) -> bool;

/// Whether a failed call should be retried with a freshly refreshed token.
///
/// A failure is auth-class if any of:
/// - the transport reported status 401;
/// - the message contains `"401"` (case-sensitive) or `"jwt"` (any case);
/// - the serialized body contains `"Invalid JWT"` or `"401"`.
pub fn is_auth_failure(error: &FunctionError) -> bool {
    if error.status == Some(401) {
        return true;
    }

    if error.message.contains("401") || error.message.to_lowercase().contains("jwt") {
        return true;
    }

    let body = error.serialized_body();
    body.contains("Invalid JWT") || body.contains("401")
}
