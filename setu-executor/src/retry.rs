//! Bounded retry with exponential backoff for idempotent reads only, per
//! spec.md §7: `UpstreamBusy` and transient `UpstreamError` are retried,
//! everything else surfaces immediately.

use std::time::Duration;

use crate::error::ExecutorError;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
        }
    }
}

fn is_retryable(err: &ExecutorError) -> bool {
    matches!(err, ExecutorError::UpstreamBusy | ExecutorError::UpstreamError(_))
}

fn backoff_for(policy: &RetryPolicy, attempt: u32) -> Duration {
    let millis = policy.base_delay.as_millis() as u64 * 2u64.saturating_pow(attempt);
    Duration::from_millis(millis).min(policy.max_delay)
}

/// Run `op` up to `policy.max_attempts` times, backing off between
/// retryable failures. Non-retryable errors and cancellation return
/// immediately.
pub async fn with_retry<F, Fut, T>(policy: RetryPolicy, mut op: F) -> Result<T, ExecutorError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ExecutorError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) && attempt + 1 < policy.max_attempts => {
                tokio::time::sleep(backoff_for(&policy, attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_upstream_busy_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(RetryPolicy::default(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ExecutorError::UpstreamBusy)
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        let calls = AtomicU32::new(0);
        let result: Result<(), ExecutorError> = with_retry(policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ExecutorError::UpstreamBusy) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn never_retries_row_limit() {
        let calls = AtomicU32::new(0);
        let result: Result<(), ExecutorError> = with_retry(RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ExecutorError::RowLimit(100)) }
        })
        .await;
        assert!(matches!(result, Err(ExecutorError::RowLimit(100))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
