//! Resilience patterns for transient failures
//!
//! A generic retry executor: callers supply the operation, a
//! [`RetryPolicy`] deciding which errors are worth another attempt, and a
//! [`RetryConfig`] bounding attempts and spacing them with a
//! [`BackoffStrategy`].

pub mod retry;

pub use retry::{
    policies, BackoffStrategy, RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryOutcome,
    RetryPolicy, RetryResult,
};
