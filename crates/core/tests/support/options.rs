//! In-memory cascading option list

use std::collections::VecDeque;

use async_trait::async_trait;
use cmdbsync_core::{Continuation, OptionStore, Page, PageCursor};
use cmdbsync_domain::{CascadeOption, CurrentTree, Result, SyncError};
use parking_lot::Mutex;

#[derive(Default)]
struct State {
    options: Vec<CascadeOption>,
    next_id: u32,
    failures: VecDeque<SyncError>,
    calls: Vec<String>,
    page_size: u32,
}

/// Flat option listing served in small offset pages.
pub struct InMemoryOptionStore {
    state: Mutex<State>,
}

impl InMemoryOptionStore {
    pub fn new(options: Vec<CascadeOption>) -> Self {
        Self {
            state: Mutex::new(State { options, next_id: 500, page_size: 3, ..State::default() }),
        }
    }

    /// Parents `(id, name)` with children `(id, name, disabled)`.
    pub fn with_tree(tree: &[(&str, &str, &[(&str, &str, bool)])]) -> Self {
        let mut options = Vec::new();
        for (parent_id, parent_name, _) in tree {
            options.push(parent(parent_id, parent_name));
        }
        for (parent_id, _, children) in tree {
            for (id, name, disabled) in *children {
                options.push(child(id, parent_id, name, *disabled));
            }
        }
        Self::new(options)
    }

    pub fn fail_next(&self, errors: impl IntoIterator<Item = SyncError>) {
        self.state.lock().failures.extend(errors);
    }

    pub fn tree(&self) -> CurrentTree {
        CurrentTree::from_options(self.state.lock().options.clone())
    }

    /// Write calls in order, as `"<call> <id>"`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    fn call(&self, call: String) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

pub fn parent(id: &str, name: &str) -> CascadeOption {
    CascadeOption { id: id.into(), value: name.into(), disabled: false, parent_id: None }
}

pub fn child(id: &str, parent_id: &str, name: &str, disabled: bool) -> CascadeOption {
    CascadeOption { id: id.into(), value: name.into(), disabled, parent_id: Some(parent_id.into()) }
}

#[async_trait]
impl OptionStore for InMemoryOptionStore {
    async fn list_page(&self, cursor: &PageCursor) -> Result<Page<CascadeOption>> {
        let state = self.state.lock();
        let (start, max) = match cursor {
            PageCursor::Offset { start_at, max_results } => (*start_at as usize, *max_results),
            PageCursor::Token(_) => return Err(SyncError::Internal("offset paging only".into())),
        };
        let size = max.min(state.page_size) as usize;
        let total = state.options.len();
        let end = (start + size).min(total);
        let items = state.options.get(start..end).map(<[CascadeOption]>::to_vec).unwrap_or_default();
        Ok(Page::new(
            items,
            Continuation::Offset { is_last: Some(end >= total), total: u32::try_from(total).ok() },
        ))
    }

    async fn create_option(&self, parent_id: &str, value: &str, disabled: bool) -> Result<String> {
        self.call(format!("create {parent_id}/{value}"))?;
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id.to_string();
        state.options.push(child(&id, parent_id, value, disabled));
        Ok(id)
    }

    async fn set_disabled(&self, option_id: &str, disabled: bool) -> Result<()> {
        self.call(format!("{} {option_id}", if disabled { "disable" } else { "enable" }))?;
        let mut state = self.state.lock();
        let option = state
            .options
            .iter_mut()
            .find(|o| o.id == option_id)
            .ok_or_else(|| SyncError::NotFound(format!("option {option_id}")))?;
        option.disabled = disabled;
        Ok(())
    }

    async fn delete_option(&self, option_id: &str) -> Result<()> {
        self.call(format!("delete {option_id}"))?;
        self.state.lock().options.retain(|o| o.id != option_id);
        Ok(())
    }

    async fn move_to_first(&self, option_ids: &[String]) -> Result<()> {
        self.call(format!("reorder {}", option_ids.join(",")))?;
        let mut state = self.state.lock();
        let mut moved = Vec::new();
        for id in option_ids {
            if let Some(position) = state.options.iter().position(|o| &o.id == id) {
                moved.push(state.options.remove(position));
            }
        }
        for (offset, option) in moved.into_iter().enumerate() {
            state.options.insert(offset, option);
        }
        Ok(())
    }
}
