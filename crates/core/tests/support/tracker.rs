//! In-memory issue tracker

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use cmdbsync_core::{Continuation, IssueTracker, ItemQuery, Page, PageCursor, UserAccount};
use cmdbsync_domain::{FieldValue, ItemChanges, ItemDraft, Result, SyncError, TrackedItem};
use parking_lot::Mutex;

type ItemFilter = Arc<dyn Fn(&TrackedItem) -> bool + Send + Sync>;

#[derive(Default)]
struct State {
    items: Vec<TrackedItem>,
    users: Vec<UserAccount>,
    next_key: u32,
    filter: Option<ItemFilter>,
    write_failures: VecDeque<SyncError>,
    search_failure: Option<SyncError>,
    writes: Vec<String>,
    comments: Vec<(String, String)>,
    user_searches: usize,
}

/// Stores items and applies writes to them the way the platform would.
///
/// Searches ignore the query text; a test narrows the population with
/// [`InMemoryTracker::with_filter`]. Results come back two per page.
#[derive(Default)]
pub struct InMemoryTracker {
    state: Mutex<State>,
}

impl InMemoryTracker {
    pub fn new(items: Vec<TrackedItem>) -> Self {
        let tracker = Self::default();
        {
            let mut state = tracker.state.lock();
            state.next_key = 1000;
            state.items = items;
        }
        tracker
    }

    pub fn with_filter(self, filter: impl Fn(&TrackedItem) -> bool + Send + Sync + 'static) -> Self {
        self.state.lock().filter = Some(Arc::new(filter));
        self
    }

    pub fn with_users(self, users: Vec<UserAccount>) -> Self {
        self.state.lock().users = users;
        self
    }

    /// The next writes fail with these errors, in order.
    pub fn fail_writes(&self, errors: impl IntoIterator<Item = SyncError>) {
        self.state.lock().write_failures.extend(errors);
    }

    pub fn fail_search(&self, error: SyncError) {
        self.state.lock().search_failure = Some(error);
    }

    pub fn items(&self) -> Vec<TrackedItem> {
        self.state.lock().items.clone()
    }

    pub fn item(&self, key: &str) -> Option<TrackedItem> {
        self.state.lock().items.iter().find(|i| i.key == key).cloned()
    }

    /// Write calls in order, as `"<call> <key>"`.
    pub fn writes(&self) -> Vec<String> {
        self.state.lock().writes.clone()
    }

    pub fn comments(&self) -> Vec<(String, String)> {
        self.state.lock().comments.clone()
    }

    pub fn user_searches(&self) -> usize {
        self.state.lock().user_searches
    }

    fn write(&self, call: &str, key: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.writes.push(format!("{call} {key}"));
        match state.write_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn with_item(&self, key: &str, apply: impl FnOnce(&mut TrackedItem)) -> Result<()> {
        let mut state = self.state.lock();
        let item = state
            .items
            .iter_mut()
            .find(|i| i.key == key)
            .ok_or_else(|| SyncError::NotFound(format!("issue {key}")))?;
        apply(item);
        Ok(())
    }
}

fn field_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(v) | FieldValue::Select(v) => v.clone(),
    }
}

#[async_trait]
impl IssueTracker for InMemoryTracker {
    async fn search_page(&self, query: &ItemQuery, cursor: &PageCursor) -> Result<Page<TrackedItem>> {
        let state = self.state.lock();
        if let Some(error) = &state.search_failure {
            return Err(error.clone());
        }
        let start = match cursor {
            PageCursor::Token(Some(token)) => token.parse::<usize>().unwrap_or(0),
            _ => 0,
        };
        let matching: Vec<TrackedItem> = state
            .items
            .iter()
            .filter(|item| state.filter.as_ref().map_or(true, |f| f(item)))
            .cloned()
            .map(|mut item| {
                item.external_id = query
                    .external_id_field
                    .as_ref()
                    .and_then(|field| item.custom_values.get(field).cloned());
                item
            })
            .collect();
        let end = (start + 2).min(matching.len());
        let items = matching.get(start..end).map(<[TrackedItem]>::to_vec).unwrap_or_default();
        let next = (end < matching.len()).then(|| end.to_string());
        Ok(Page::new(items, Continuation::Token(next)))
    }

    async fn search_users(&self, query: &str) -> Result<Vec<UserAccount>> {
        let mut state = self.state.lock();
        state.user_searches += 1;
        let query = query.to_lowercase();
        Ok(state
            .users
            .iter()
            .filter(|u| u.email.as_deref().is_some_and(|e| e.to_lowercase().contains(&query)))
            .cloned()
            .collect())
    }

    async fn create_item(&self, draft: &ItemDraft) -> Result<String> {
        self.write("create", &draft.external_id)?;
        let mut state = self.state.lock();
        state.next_key += 1;
        let key = format!("{}-{}", draft.project_key, state.next_key);
        let mut item = TrackedItem {
            key: key.clone(),
            summary: draft.summary.clone(),
            labels: draft.labels.iter().cloned().collect(),
            reporter: draft.reporter.clone(),
            ..TrackedItem::default()
        };
        for (field, value) in &draft.fields {
            item.custom_values.insert(field.clone(), field_text(value));
        }
        item.custom_values.insert(draft.external_id_field.clone(), draft.external_id.clone());
        state.items.push(item);
        Ok(key)
    }

    async fn update_item(&self, key: &str, changes: &ItemChanges) -> Result<()> {
        self.write("update", key)?;
        self.with_item(key, |item| {
            for (field, value) in &changes.fields {
                item.custom_values.insert(field.clone(), field_text(value));
            }
            if let Some(summary) = &changes.summary {
                item.summary = summary.clone();
            }
            if changes.clear_assignee {
                item.assignee = None;
            }
            if let Some(reporter) = &changes.reporter {
                item.reporter = Some(reporter.clone());
            }
            if let Some(label) = &changes.add_label {
                item.labels.insert(label.clone());
            }
        })?;
        if let Some(comment) = &changes.comment {
            self.state.lock().comments.push((key.to_string(), comment.clone()));
        }
        Ok(())
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.write("set_field", key)?;
        self.with_item(key, |item| {
            item.custom_values.insert(field.to_string(), value.to_string());
        })
    }

    async fn add_label(&self, key: &str, label: &str) -> Result<()> {
        self.write("add_label", key)?;
        self.with_item(key, |item| {
            item.labels.insert(label.to_string());
        })
    }

    async fn remove_label(&self, key: &str, label: &str) -> Result<()> {
        self.write("remove_label", key)?;
        self.with_item(key, |item| {
            item.labels.remove(label);
        })
    }

    async fn add_comment(&self, key: &str, text: &str) -> Result<()> {
        self.write("comment", key)?;
        self.state.lock().comments.push((key.to_string(), text.to_string()));
        Ok(())
    }
}
