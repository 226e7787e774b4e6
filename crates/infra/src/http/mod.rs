//! HTTP transport shared by the Jira and Confluence clients

pub mod client;

pub use client::{HttpClient, HttpClientBuilder};
