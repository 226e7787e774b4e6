//! Generic retry executor with pluggable policies and exponential backoff
//!
//! The executor runs an async operation until it succeeds, the policy says
//! stop, or the attempt budget is spent. Delays are slept with
//! `tokio::time::sleep`, so tests can run under a paused clock.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Errors that can occur during retry operations
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    #[error("All retry attempts exhausted after {attempts} tries: {error:?}")]
    AttemptsExhausted { attempts: u32, error: E },

    /// The policy refused to retry this error
    #[error("Operation failed with non-retryable error: {error:?}")]
    NonRetryable { attempts: u32, error: E },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up.
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::AttemptsExhausted { attempts, .. } | Self::NonRetryable { attempts, .. } => {
                *attempts
            }
        }
    }

    /// The last error returned by the operation.
    pub fn into_inner(self) -> E {
        match self {
            Self::AttemptsExhausted { error, .. } | Self::NonRetryable { error, .. } => error,
        }
    }
}

/// Result type for retry operations
pub type RetryResult<T, E> = Result<T, RetryError<E>>;

/// Outcome of a retry execution with the number of attempts it took.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: RetryResult<T, E>,
    pub attempts: u32,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> RetryResult<T, E> {
        self.result
    }
}

/// Decides whether an error should be retried
pub trait RetryPolicy<E> {
    /// `attempt` is the zero-based index of the attempt that just failed.
    fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision;
}

/// Decision for whether to retry an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the configured backoff delay
    Retry,
    /// Give up
    Stop,
}

/// Backoff strategy for calculating retry delays
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Exponential backoff: `initial_delay * base^attempt`, capped
    Exponential { initial_delay: Duration, base: f64, max_delay: Duration },
}

impl BackoffStrategy {
    /// Delay after the zero-based `attempt` failed
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Exponential { initial_delay, base, max_delay } => {
                let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
                let millis = initial_delay.as_secs_f64() * 1000.0 * base.powi(exponent);
                let capped = millis.min(max_delay.as_secs_f64() * 1000.0).max(0.0);
                Duration::from_secs_f64(capped / 1000.0)
            }
        }
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, first try included
    pub max_attempts: u32,
    /// Backoff strategy for calculating delays
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(100),
                base: 2.0,
                max_delay: Duration::from_secs(30),
            },
        }
    }
}

/// The main retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    /// Create a new retry executor with the given configuration and policy
    pub const fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> RetryResult<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and report the attempt count.
    #[instrument(skip(self, operation), fields(max_attempts = self.config.max_attempts))]
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            let attempt_number = attempt + 1;
            debug!("Executing operation (attempt {}/{})", attempt_number, max_attempts);

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Operation succeeded after {} retries", attempt);
                    }
                    return RetryOutcome { result: Ok(value), attempts: attempt_number };
                }
                Err(error) => error,
            };

            if self.policy.should_retry(&error, attempt) == RetryDecision::Stop {
                debug!("Retry policy determined not to retry: {:?}", error);
                return RetryOutcome {
                    result: Err(RetryError::NonRetryable { attempts: attempt_number, error }),
                    attempts: attempt_number,
                };
            }

            if attempt_number >= max_attempts {
                warn!(
                    "All retry attempts exhausted after {} tries, last error: {:?}",
                    attempt_number, error
                );
                return RetryOutcome {
                    result: Err(RetryError::AttemptsExhausted { attempts: attempt_number, error }),
                    attempts: attempt_number,
                };
            }

            let delay = self.config.backoff.calculate_delay(attempt);
            warn!("Operation failed (attempt {}), retrying after {:?}", attempt_number, delay);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Pre-defined retry policies
pub mod policies {
    use super::{RetryDecision, RetryPolicy};

    /// Retries while the predicate holds
    #[derive(Debug, Clone, Copy)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub const fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E, u32) -> bool,
    {
        fn should_retry(&self, error: &E, attempt: u32) -> RetryDecision {
            if (self.predicate)(error, attempt) {
                RetryDecision::Retry
            } else {
                RetryDecision::Stop
            }
        }
    }
}
