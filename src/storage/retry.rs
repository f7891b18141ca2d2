//! Bounded exponential backoff for store calls
//!
//! Only transient errors (a busy or locked database, an unavailable
//! store) are retried. Anything else fails on the first attempt.

use super::traits::{StorageError, StorageResult};
use crate::config::RetryPolicy;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetryError {
    #[error("{operation} failed: {source}")]
    Failed {
        operation: String,
        #[source]
        source: StorageError,
    },

    #[error("{operation} still failing after {attempts} attempts: {source}")]
    Exhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: StorageError,
    },
}

/// Run `operation` until it succeeds, fails permanently, or the policy's
/// attempts are used up. Backoff doubles per attempt up to the cap.
pub async fn retry_with_backoff<T, F>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> StorageResult<T>,
{
    let start_time = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff_ms = policy.initial_backoff_ms;
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation() {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis(),
                        "store operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !err.is_transient() => {
                return Err(RetryError::Failed {
                    operation: operation_name.to_string(),
                    source: err,
                });
            }
            Err(err) if attempt >= max_attempts => {
                tracing::error!(
                    operation = operation_name,
                    attempt,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    error = %err,
                    "store operation failed: retries exhausted"
                );
                return Err(RetryError::Exhausted {
                    operation: operation_name.to_string(),
                    attempts: attempt,
                    source: err,
                });
            }
            Err(err) => {
                let delay_ms = backoff_ms.min(policy.max_backoff_ms);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = delay_ms,
                    error = %err,
                    "store operation failed, will retry after backoff"
                );
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                backoff_ms = backoff_ms.saturating_mul(2).min(policy.max_backoff_ms);
            }
        }
    }
}
