//! Bounded retry with exponential backoff for port calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::RetryPolicy;
use crate::error::{EngineError, EngineResult};
use crate::ports::{StoreError, StoreResult};

/// Runs `call` until it succeeds, fails with a non-transient error, or the
/// policy's attempts are used up.
///
/// Only [`StoreError::Transient`] is retried. Exhaustion is reported as
/// [`EngineError::RetriesExhausted`].
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut call: F) -> EngineResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff_ms = policy.initial_backoff_ms;
    let mut attempt = 1;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(error @ StoreError::Transient { .. }) => {
                if attempt >= max_attempts {
                    return Err(EngineError::RetriesExhausted {
                        operation: operation.to_string(),
                        attempts: attempt,
                        last_error: error.to_string(),
                    });
                }
                warn!(
                    operation,
                    attempt,
                    backoff_ms,
                    error = %error,
                    "Transient storage failure, retrying"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms = backoff_ms.saturating_mul(2).min(policy.max_backoff_ms);
                attempt += 1;
            }
            Err(error) => return Err(error.into()),
        }
    }
}
