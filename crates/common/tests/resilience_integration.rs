//! Integration tests for the retry executor
//!
//! Models the rate-limited write path: only throttling errors are retried,
//! spacing doubles between attempts and the last error survives exhaustion.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cmdbsync_common::resilience::policies::PredicateRetry;
use cmdbsync_common::resilience::{BackoffStrategy, RetryConfig, RetryError, RetryExecutor};

/// Error shape used to exercise the policy split
#[derive(Debug, Clone, PartialEq, Eq)]
enum WriteError {
    Throttled,
    Rejected(u16),
}

fn throttle_only() -> PredicateRetry<fn(&WriteError, u32) -> bool> {
    PredicateRetry::new(|err: &WriteError, _| matches!(err, WriteError::Throttled))
}

fn config() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        backoff: BackoffStrategy::Exponential {
            initial_delay: Duration::from_secs(10),
            base: 2.0,
            max_delay: Duration::from_secs(300),
        },
    }
}

/// Throttled twice, then accepted: the third attempt wins after 10s + 20s.
#[tokio::test(start_paused = true)]
async fn test_throttled_write_recovers() {
    let calls = Arc::new(AtomicU32::new(0));
    let executor = RetryExecutor::new(config(), throttle_only());

    let started = tokio::time::Instant::now();
    let outcome = executor
        .execute_with_outcome(|| {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(WriteError::Throttled)
                } else {
                    Ok("written")
                }
            }
        })
        .await;

    assert_eq!(outcome.result.expect("write should succeed"), "written");
    assert_eq!(outcome.attempts, 3);
    assert_eq!(started.elapsed(), Duration::from_secs(30));
}

/// A rejected payload is reported on the first attempt without sleeping.
#[tokio::test(start_paused = true)]
async fn test_rejected_write_is_not_retried() {
    let executor = RetryExecutor::new(config(), throttle_only());
    let started = tokio::time::Instant::now();

    let result = executor.execute(|| async { Err::<(), _>(WriteError::Rejected(400)) }).await;

    match result {
        Err(RetryError::NonRetryable { attempts, error }) => {
            assert_eq!(attempts, 1);
            assert_eq!(error, WriteError::Rejected(400));
        }
        other => panic!("expected non-retryable error, got {other:?}"),
    }
    assert_eq!(started.elapsed(), Duration::ZERO);
}

/// Persistent throttling ends as exhaustion carrying the throttling error.
#[tokio::test(start_paused = true)]
async fn test_persistent_throttling_exhausts_budget() {
    let executor = RetryExecutor::new(config(), throttle_only());

    let result = executor.execute(|| async { Err::<(), _>(WriteError::Throttled) }).await;

    let err = result.expect_err("should exhaust");
    assert!(matches!(err, RetryError::AttemptsExhausted { attempts: 3, .. }));
    assert_eq!(err.into_inner(), WriteError::Throttled);
}
