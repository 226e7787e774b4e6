//! Macro for implementing Display and FromStr for lowercase keyword enums
//!
//! Used by [`crate::OperationKind`] and [`crate::RunMode`], whose string form
//! appears in logs, the audit ledger and configuration.
//!
//! # Example
//!
//! ```rust
//! use cmdbsync_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Phase {
//!     Domains,
//!     Cascade,
//! }
//!
//! impl_domain_status_conversions!(Phase {
//!     Domains => "domains",
//!     Cascade => "cascade",
//! });
//!
//! assert_eq!(Phase::Cascade.to_string(), "cascade");
//! assert_eq!("DOMAINS".parse::<Phase>().unwrap(), Phase::Domains);
//! ```

/// Implements Display and FromStr for keyword enums
///
/// - Display writes the mapped string
/// - FromStr matches case-insensitively and names the enum in its error
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
