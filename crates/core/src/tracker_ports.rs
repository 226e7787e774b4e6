//! Port interfaces for the issue tracker
//!
//! Two surfaces of the same platform: work items (search, create, update)
//! and the option list of the cascading select field.

use async_trait::async_trait;
use cmdbsync_domain::{CascadeOption, ItemChanges, ItemDraft, Result, TrackedItem};

use crate::reader::{Page, PageCursor};

/// Search request for tracked items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub jql: String,
    /// Platform field ids to return alongside summary, labels, assignee and
    /// reporter.
    pub fields: Vec<String>,
    /// Field holding the external identifier, copied into
    /// [`TrackedItem::external_id`].
    pub external_id_field: Option<String>,
}

/// A user account returned by the directory search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub account_id: String,
    pub email: Option<String>,
}

/// Trait for reading and writing tracked work items
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Fetch one page of search results.
    async fn search_page(&self, query: &ItemQuery, cursor: &PageCursor) -> Result<Page<TrackedItem>>;

    /// Look users up by a free-text query (usually an email).
    async fn search_users(&self, query: &str) -> Result<Vec<UserAccount>>;

    /// Create an item and return its key.
    async fn create_item(&self, draft: &ItemDraft) -> Result<String>;

    /// Apply fields, labels and comment in one request.
    async fn update_item(&self, key: &str, changes: &ItemChanges) -> Result<()>;

    /// Write a free-text value to a single field.
    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()>;

    async fn add_label(&self, key: &str, label: &str) -> Result<()>;

    async fn remove_label(&self, key: &str, label: &str) -> Result<()>;

    async fn add_comment(&self, key: &str, text: &str) -> Result<()>;
}

/// Trait for the option list of the cascading select field
///
/// Implementations are bound to one field and context.
#[async_trait]
pub trait OptionStore: Send + Sync {
    /// Fetch one page of the flat option listing.
    async fn list_page(&self, cursor: &PageCursor) -> Result<Page<CascadeOption>>;

    /// Create a child option and return its id.
    async fn create_option(&self, parent_id: &str, value: &str, disabled: bool) -> Result<String>;

    async fn set_disabled(&self, option_id: &str, disabled: bool) -> Result<()>;

    async fn delete_option(&self, option_id: &str) -> Result<()>;

    /// Move the given options to the top of their parent, in order.
    async fn move_to_first(&self, option_ids: &[String]) -> Result<()>;
}
