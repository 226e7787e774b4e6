//! Reporter identity resolution

use std::sync::Arc;

use cmdbsync_domain::Result;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::tracker_ports::IssueTracker;

/// Resolves the configured reporter to an account id.
///
/// A value without `@` is taken as an account id. An email is looked up once
/// per process and memoized; `force_refresh` repeats the lookup.
pub struct ReporterResolver {
    tracker: Arc<dyn IssueTracker>,
    configured: Option<String>,
    memo: Mutex<Option<Option<String>>>,
}

impl ReporterResolver {
    pub fn new(tracker: Arc<dyn IssueTracker>, configured: Option<String>) -> Self {
        let configured = configured.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self { tracker, configured, memo: Mutex::new(None) }
    }

    /// Account id to force as reporter, if any.
    ///
    /// `Ok(None)` means no reporter is configured or the email matched no
    /// account. Lookup failures are returned as errors.
    pub async fn resolve(&self, force_refresh: bool) -> Result<Option<String>> {
        let Some(configured) = &self.configured else {
            return Ok(None);
        };
        if !configured.contains('@') {
            return Ok(Some(configured.clone()));
        }
        if !force_refresh {
            if let Some(cached) = self.memo.lock().clone() {
                return Ok(cached);
            }
        }

        let users = self.tracker.search_users(configured).await?;
        let resolved = match users.iter().find(|u| {
            u.email.as_deref().is_some_and(|email| email.eq_ignore_ascii_case(configured))
        }) {
            Some(user) => Some(user.account_id.clone()),
            None => match users.first() {
                Some(user) => {
                    warn!(email = %configured, account_id = %user.account_id, "no exact email match; using first account returned");
                    Some(user.account_id.clone())
                }
                None => {
                    warn!(email = %configured, "reporter email matched no account");
                    None
                }
            },
        };

        debug!(email = %configured, resolved = ?resolved, "reporter resolved");
        *self.memo.lock() = Some(resolved.clone());
        Ok(resolved)
    }
}

impl std::fmt::Debug for ReporterResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReporterResolver").field("configured", &self.configured).finish()
    }
}
