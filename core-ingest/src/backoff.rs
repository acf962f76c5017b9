//! Bounded retry with exponential backoff.
//!
//! A batch is attempted at most `max_attempts` times. Retryable failures wait
//! `min(cap, base * 2^retry)` before the next attempt, where `retry` counts
//! from 1. A server `Retry-After` hint lengthens the wait, up to `cap`.
//! Waits race against the run's cancellation token.

use crate::api::{ApiError, ApiResult};
use core_runtime::config::BackoffConfig;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(BackoffConfig::default())
    }
}

impl From<BackoffConfig> for BackoffPolicy {
    fn from(config: BackoffConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base: config.base_delay,
            cap: config.max_delay,
        }
    }
}

impl BackoffPolicy {
    /// Policy with no waits, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base: Duration::ZERO,
            cap: Duration::ZERO,
        }
    }

    /// Wait before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }

    /// Wait before retry number `retry`, honouring the failure's `Retry-After`.
    pub fn wait_after(&self, retry: u32, error: &ApiError) -> Duration {
        let delay = self.delay(retry);
        match error.retry_after {
            Some(hint) => delay.max(hint.min(self.cap)),
            None => delay,
        }
    }
}

/// Result of one bounded batch loop.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome<T> {
    Success(T),
    /// Every allowed attempt failed; carries the last failure
    Exhausted(ApiError),
    Cancelled,
}

impl<T> BatchOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Success(_))
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, runs out of
/// attempts or `cancel` fires. `op` receives the 1-based attempt number.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &BackoffPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> BatchOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return BatchOutcome::Cancelled;
        }

        attempt += 1;
        let error = match op(attempt).await {
            Ok(value) => return BatchOutcome::Success(value),
            Err(error) => error,
        };

        if !error.is_retryable() {
            debug!(attempt, error = %error, "Non-retryable failure");
            return BatchOutcome::Exhausted(error);
        }

        if attempt >= policy.max_attempts {
            warn!(
                attempts = attempt,
                error = %error,
                "Retry ceiling reached"
            );
            return BatchOutcome::Exhausted(error);
        }

        let wait = policy.wait_after(attempt, &error);
        warn!(
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = wait.as_millis() as u64,
            error = %error,
            "Batch request failed, retrying"
        );

        tokio::select! {
            _ = cancel.cancelled() => return BatchOutcome::Cancelled,
            _ = tokio::time::sleep(wait) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_is_capped_exponential() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(4), Duration::from_secs(16));
        assert_eq!(policy.delay(6), Duration::from_secs(60));
        assert_eq!(policy.delay(40), Duration::from_secs(60));
    }

    #[test]
    fn test_retry_after_hint_extends_wait_within_cap() {
        let policy = BackoffPolicy::default();
        let hinted = |secs| ApiError::transient("429").with_retry_after(Some(Duration::from_secs(secs)));

        assert_eq!(policy.wait_after(1, &ApiError::transient("503")), Duration::from_secs(2));
        assert_eq!(policy.wait_after(1, &hinted(9)), Duration::from_secs(9));
        assert_eq!(policy.wait_after(3, &hinted(1)), Duration::from_secs(8));
        assert_eq!(policy.wait_after(1, &hinted(3600)), Duration::from_secs(60));
        assert_eq!(BackoffPolicy::immediate(3).wait_after(1, &hinted(9)), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_transient_failures_stop_at_ceiling() {
        let calls = AtomicU32::new(0);
        let outcome: BatchOutcome<()> = retry_with_backoff(
            &BackoffPolicy::immediate(5),
            &CancellationToken::new(),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::transient("503")) }
            },
        )
        .await;

        assert!(matches!(outcome, BatchOutcome::Exhausted(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_non_retryable_failure_exhausts_immediately() {
        let calls = AtomicU32::new(0);
        let outcome: BatchOutcome<()> = retry_with_backoff(
            &BackoffPolicy::immediate(5),
            &CancellationToken::new(),
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::rejected(400, "invalid id")) }
            },
        )
        .await;

        match outcome {
            BatchOutcome::Exhausted(err) => assert_eq!(err.status, Some(400)),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_retries() {
        let outcome = retry_with_backoff(
            &BackoffPolicy::immediate(5),
            &CancellationToken::new(),
            |attempt| async move {
                if attempt < 3 {
                    Err(ApiError::authorization("expired"))
                } else {
                    Ok(attempt)
                }
            },
        )
        .await;

        assert_eq!(outcome, BatchOutcome::Success(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let policy = BackoffPolicy::default();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let outcome: BatchOutcome<()> = retry_with_backoff(&policy, &cancel, |_| async {
            Err(ApiError::transient("timeout"))
        })
        .await;

        assert_eq!(outcome, BatchOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);

        let outcome: BatchOutcome<()> =
            retry_with_backoff(&BackoffPolicy::immediate(5), &cancel, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert_eq!(outcome, BatchOutcome::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
