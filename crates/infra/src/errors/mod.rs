//! Error conversions for the adapters

pub mod conversions;

pub use conversions::{infra, InfraError};
