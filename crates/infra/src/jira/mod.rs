//! Jira Cloud REST adapters
//!
//! Both adapters share one [`HttpClient`](crate::http::HttpClient) bound to
//! the site URL.

pub mod adf;
pub mod issues;
pub mod options;

pub use issues::JiraIssueTracker;
pub use options::JiraOptionStore;
