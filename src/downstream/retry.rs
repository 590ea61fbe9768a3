//! Generic retry policy for transient downstream failures.
//!
//! Only failures classified with an HTTP status are candidates for retry;
//! anything else (connection refused, serialization, validation) propagates
//! on the first attempt.

use crate::utils::errors::BridgeResult;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            retryable_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }
}

/// Run `operation`, retrying transient failures per `policy`.
///
/// The operation runs at most `1 + max_retries` times. Waits grow linearly:
/// `retry_delay * attempt_number`, 1-indexed.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> BridgeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BridgeResult<T>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(status) = err.status() else {
                    return Err(err);
                };
                if !policy.is_retryable(status) {
                    return Err(err);
                }
                attempt += 1;
                if attempt > policy.max_retries {
                    return Err(err);
                }
                let delay = policy.retry_delay * attempt;
                warn!(
                    status,
                    attempt,
                    max_retries = policy.max_retries,
                    "transient failure, retrying in {:?}",
                    delay
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::BridgeError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn request_error(status: u16) -> BridgeError {
        BridgeError::RequestError {
            status,
            message: "synthetic".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_status_exhausts_all_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();

        let counter = calls.clone();
        let err = with_retry(&policy, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(request_error(503))
            }
        })
        .await
        .unwrap_err();

        // 1 initial + 3 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();

        let counter = calls.clone();
        let err = with_retry(&policy, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(request_error(404))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_unclassified_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();

        let counter = calls.clone();
        let err = with_retry(&policy, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(BridgeError::TransportError("connection refused".into()))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, BridgeError::TransportError(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();

        let counter = calls.clone();
        let value = with_retry(&policy, move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(request_error(502))
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_linear() {
        let policy = RetryPolicy {
            max_retries: 3,
            retry_delay: Duration::from_millis(100),
            retryable_statuses: vec![500],
        };

        let start = tokio::time::Instant::now();
        let _ = with_retry(&policy, || async { Err::<(), _>(request_error(500)) }).await;

        // 100 + 200 + 300 ms of waiting across the three retries.
        assert_eq!(start.elapsed(), Duration::from_millis(600));
    }
}
