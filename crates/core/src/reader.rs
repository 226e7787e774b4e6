//! Remote state reader
//!
//! Turns token-paged and offset-paged listings into one accumulated
//! sequence. A page with no items always stops the loop, whatever the
//! continuation says.

use std::future::Future;

use cmdbsync_domain::{Result, SyncError};
use tracing::{debug, warn};

/// Position of the next page to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Continuation token returned by the previous page; `None` on the first.
    Token(Option<String>),
    /// Offset into the listing.
    Offset { start_at: u32, max_results: u32 },
}

impl PageCursor {
    pub const fn first_token() -> Self {
        Self::Token(None)
    }

    pub const fn first_offset(max_results: u32) -> Self {
        Self::Offset { start_at: 0, max_results }
    }
}

/// How the source says whether more pages exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Token style: `None` means done.
    Token(Option<String>),
    /// Offset style, with whichever completion hints the response carried.
    Offset { is_last: Option<bool>, total: Option<u32> },
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub continuation: Continuation,
}

impl<T> Page<T> {
    pub const fn new(items: Vec<T>, continuation: Continuation) -> Self {
        Self { items, continuation }
    }

    /// Cursor for the page after this one, or `None` when the listing is done.
    pub fn next_cursor(&self, current: &PageCursor) -> Option<PageCursor> {
        if self.items.is_empty() {
            return None;
        }
        match (&self.continuation, current) {
            (Continuation::Token(token), _) => {
                token.as_ref().filter(|t| !t.is_empty()).map(|t| PageCursor::Token(Some(t.clone())))
            }
            (Continuation::Offset { is_last, total }, PageCursor::Offset { start_at, max_results }) => {
                let returned = u32::try_from(self.items.len()).unwrap_or(u32::MAX);
                let next = start_at.saturating_add(returned);
                let done = match (is_last, total) {
                    (Some(is_last), _) => *is_last,
                    (None, Some(total)) => next >= *total,
                    (None, None) => true,
                };
                (!done).then_some(PageCursor::Offset { start_at: next, max_results: *max_results })
            }
            (Continuation::Offset { .. }, PageCursor::Token(_)) => None,
        }
    }
}

/// Records accumulated by [`fetch_all`].
#[derive(Debug)]
pub struct FetchOutcome<T> {
    pub records: Vec<T>,
    pub pages: usize,
    /// Fault that cut the listing short; `records` then holds what came before.
    pub interrupted: Option<SyncError>,
}

impl<T> FetchOutcome<T> {
    pub const fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }

    /// Records of a complete listing. An interrupted listing becomes an error
    /// so that a pass never proceeds on a partial index.
    pub fn into_complete(self) -> Result<Vec<T>> {
        match self.interrupted {
            None => Ok(self.records),
            Some(err) => Err(err),
        }
    }
}

/// Page through a listing until the source reports completion.
///
/// A fault on any page stops the loop and returns what was accumulated so
/// far, with the fault kept in [`FetchOutcome::interrupted`].
pub async fn fetch_all<T, F, Fut>(label: &str, first: PageCursor, mut fetch: F) -> FetchOutcome<T>
where
    F: FnMut(PageCursor) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let mut records = Vec::new();
    let mut pages = 0;
    let mut cursor = first;

    loop {
        let page = match fetch(cursor.clone()).await {
            Ok(page) => page,
            Err(err) => {
                warn!(listing = label, pages, fetched = records.len(), error = %err, "listing interrupted");
                return FetchOutcome { records, pages, interrupted: Some(err) };
            }
        };
        pages += 1;
        debug!(listing = label, page = pages, items = page.items.len(), "page fetched");

        let next = page.next_cursor(&cursor);
        records.extend(page.items);

        match next {
            Some(next) if next == cursor => {
                warn!(listing = label, "continuation repeated itself; stopping");
                break;
            }
            Some(next) => cursor = next,
            None => break,
        }
    }

    FetchOutcome { records, pages, interrupted: None }
}
