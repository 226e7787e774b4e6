//! # CMDB Sync Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - HTTP client with basic authentication and transport retries
//! - Jira adapters for issues, users and cascading select options
//! - Confluence page client, domain table model and cached mapping source
//! - Configuration, env file and export loading
//! - Audit ledger, change report and logging setup
//!
//! ## Architecture
//! - Implements traits defined in `cmdbsync-core`
//! - Contains all "impure" code (network, filesystem)

pub mod audit;
pub mod config;
pub mod confluence;
pub mod errors;
pub mod export;
pub mod http;
pub mod jira;
pub mod logging;

// Re-export commonly used items
pub use audit::{CsvChangeReport, JsonlAuditLedger};
pub use config::LoadOptions;
pub use confluence::{ConfluenceClient, ConfluenceDomainTable};
pub use errors::InfraError;
pub use export::load_export;
pub use http::HttpClient;
pub use jira::{JiraIssueTracker, JiraOptionStore};
pub use logging::{init_logging, LogSettings};
