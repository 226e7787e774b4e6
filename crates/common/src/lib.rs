//! Common runtime utilities shared across the CMDB sync crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: duration formatting
//! - `runtime`: async retry executor with exponential backoff and predicate policies

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod time;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use resilience::{
    BackoffStrategy, RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryOutcome,
    RetryPolicy, RetryResult,
};
#[cfg(feature = "foundation")]
pub use time::format::format_duration;
