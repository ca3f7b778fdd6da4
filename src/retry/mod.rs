//! Opt-in retry helper (§10.4).
//!
//! Nothing in [`crate::orchestrator`] or [`crate::provider`] calls into this
//! module on its own: retrying a failed `generate`/`stream` call is a
//! decision the caller makes explicitly by wrapping the call with
//! [`retry`]/[`retry_with`], mirroring the low-level-policy-plus-facade split
//! the rest of this codebase uses for retry.

mod policy;

pub use policy::RetryPolicy;

use crate::error::LlmError;

/// Retry `operation` using `policy`, consulting [`LlmError::is_retryable`]
/// (or the policy's own override) between attempts.
pub async fn retry_with<F, Fut, T>(operation: F, policy: RetryPolicy) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, LlmError>>,
{
    policy.execute(operation).await
}

/// Retry `operation` with [`RetryPolicy::default`].
pub async fn retry<F, Fut, T>(operation: F) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, LlmError>>,
{
    retry_with(operation, RetryPolicy::default()).await
}
