//! # CMDB Sync Domain
//!
//! Business domain types for the CMDB reconciliation workspace.
//!
//! This crate contains:
//! - Export records and the operational status enumeration
//! - Tracked items, cascading options and the domain mapping table
//! - Sync operations emitted by the comparator and their outcomes
//! - Configuration structures
//! - Domain error types and Result definitions
//!
//! ## Architecture
//! - No dependencies on other workspace crates
//! - No I/O; pure data and naming rules

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
pub use utils::naming::{
    clean_domain_display, derive_retired_label, name_index_key, normalize_name, normalize_value,
    strip_retired_prefixes, truncate_chars,
};
