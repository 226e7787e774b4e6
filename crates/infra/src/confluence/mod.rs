//! Confluence adapters: page client, domain table model and the cached
//! mapping source

pub mod client;
pub mod mapping;
pub mod table;

pub use client::{ConfluenceClient, StoragePage};
pub use mapping::ConfluenceDomainTable;
pub use table::{insert_row, parse_domain_table, render_row};
