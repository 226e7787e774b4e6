//! Operation applier
//!
//! Executes comparator output one operation at a time. Simulate mode
//! short-circuits every operation to a synthetic success that is still
//! logged and audited. Live mode retries rate-limited calls with exponential
//! backoff and pauses after every successful write.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use cmdbsync_common::resilience::policies::PredicateRetry;
use cmdbsync_common::{BackoffStrategy, RetryConfig, RetryExecutor};
use cmdbsync_domain::{
    EntityRef, OperationKind, OperationOutcome, OperationPayload, OperationStatus,
    RateLimitSettings, Result, RunMode, SyncError, SyncOperation,
};
use parking_lot::Mutex;
use serde_json::json;
use tracing::{debug, instrument};

use crate::audit::AuditTrail;
use crate::document_ports::DomainMappingSource;
use crate::tracker_ports::{IssueTracker, OptionStore};

const CONTEXT: &str = "apply";

type RateLimitPolicy = PredicateRetry<fn(&SyncError, u32) -> bool>;

fn retry_on_rate_limit(error: &SyncError, _attempt: u32) -> bool {
    error.is_rate_limited()
}

/// Pacing and retry tuning of the applier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplierSettings {
    /// Pause after every successful write.
    pub request_delay: Duration,
    /// Pause after a successful label removal.
    pub label_removal_delay: Duration,
    /// Total attempts for a rate-limited call.
    pub max_attempts: u32,
    /// First backoff delay; doubled on each further attempt.
    pub retry_base_delay: Duration,
}

impl From<&RateLimitSettings> for ApplierSettings {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            request_delay: Duration::from_millis(settings.request_delay_ms),
            label_removal_delay: Duration::from_millis(settings.label_removal_delay_ms),
            max_attempts: settings.max_retries.max(1),
            retry_base_delay: Duration::from_secs(settings.retry_base_delay_secs),
        }
    }
}

impl Default for ApplierSettings {
    fn default() -> Self {
        Self::from(&RateLimitSettings::default())
    }
}

/// Applies [`SyncOperation`]s against the remote ports.
pub struct OperationApplier {
    tracker: Arc<dyn IssueTracker>,
    options: Arc<dyn OptionStore>,
    mapping: Option<Arc<dyn DomainMappingSource>>,
    audit: AuditTrail,
    mode: RunMode,
    settings: ApplierSettings,
    executor: RetryExecutor<RateLimitPolicy>,
    seen: Mutex<HashSet<String>>,
}

impl OperationApplier {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        options: Arc<dyn OptionStore>,
        mode: RunMode,
        settings: ApplierSettings,
    ) -> Self {
        let base = settings.retry_base_delay;
        let config = RetryConfig {
            max_attempts: settings.max_attempts.max(1),
            backoff: BackoffStrategy::Exponential {
                initial_delay: base,
                base: 2.0,
                max_delay: base.saturating_mul(1 << settings.max_attempts.min(16)),
            },
        };
        let policy: RateLimitPolicy = PredicateRetry::new(retry_on_rate_limit);
        Self {
            tracker,
            options,
            mapping: None,
            audit: AuditTrail::log_only(),
            mode,
            settings,
            executor: RetryExecutor::new(config, policy),
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Attach the domain table, required for row appends.
    pub fn with_mapping_source(mut self, mapping: Arc<dyn DomainMappingSource>) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn with_audit(mut self, audit: AuditTrail) -> Self {
        self.audit = audit;
        self
    }

    pub const fn mode(&self) -> RunMode {
        self.mode
    }

    /// Apply each operation in order. A failure never stops the sequence.
    pub async fn apply_all<'a>(
        &self,
        operations: impl IntoIterator<Item = &'a SyncOperation>,
    ) -> Vec<OperationOutcome> {
        let mut outcomes = Vec::new();
        for operation in operations {
            outcomes.push(self.apply(operation).await);
        }
        outcomes
    }

    /// Apply one operation and report its outcome.
    #[instrument(skip(self, operation), fields(op = %operation.kind, target = %operation.target))]
    pub async fn apply(&self, operation: &SyncOperation) -> OperationOutcome {
        if !self.seen.lock().insert(operation.idempotency_key.clone()) {
            let outcome = outcome(operation, OperationStatus::Skipped("duplicate operation".into()), None, 0);
            self.audit
                .info(CONTEXT, &format!("skipped duplicate {} {}", operation.kind, operation.target), detail(operation, &outcome))
                .await;
            return outcome;
        }

        if self.mode.is_simulate() {
            let outcome = outcome(operation, OperationStatus::Simulated, None, 0);
            self.audit
                .info(CONTEXT, &format!("[simulate] {} {}", operation.kind, operation.target), detail(operation, &outcome))
                .await;
            return outcome;
        }

        let run = self.executor.execute_with_outcome(|| self.dispatch(operation)).await;
        match run.result {
            Ok(created_id) => {
                let outcome = outcome(operation, OperationStatus::Applied, created_id, run.attempts);
                self.audit
                    .info(CONTEXT, &format!("{} {}", operation.kind, operation.target), detail(operation, &outcome))
                    .await;
                self.follow_up(operation, &outcome).await;
                self.pause_after(operation.kind).await;
                outcome
            }
            Err(err) => {
                let attempts = err.attempts();
                let error = err.into_inner();
                let outcome =
                    outcome(operation, OperationStatus::Failed(error.to_string()), None, attempts);
                let mut detail = detail(operation, &outcome);
                detail["error"] = json!(error);
                detail["response_body"] = json!(error.response_body());
                self.audit
                    .error(CONTEXT, &format!("{} {} failed: {error}", operation.kind, operation.target), detail)
                    .await;
                outcome
            }
        }
    }

    /// One remote call (two for a move) per operation.
    async fn dispatch(&self, operation: &SyncOperation) -> Result<Option<String>> {
        match &operation.payload {
            OperationPayload::CreateItem(draft) => self.tracker.create_item(draft).await.map(Some),
            OperationPayload::UpdateItem(changes) => {
                self.tracker.update_item(item_key(operation)?, changes).await.map(|()| None)
            }
            OperationPayload::SetField { field, value } => {
                self.tracker.set_field(item_key(operation)?, field, value).await.map(|()| None)
            }
            OperationPayload::AddLabel { label } => {
                self.tracker.add_label(item_key(operation)?, label).await.map(|()| None)
            }
            OperationPayload::RemoveLabel { label } => {
                self.tracker.remove_label(item_key(operation)?, label).await.map(|()| None)
            }
            OperationPayload::AddComment { text } => {
                self.tracker.add_comment(item_key(operation)?, text).await.map(|()| None)
            }
            OperationPayload::CreateOption { parent_id, value, disabled } => {
                self.options.create_option(parent_id, value, *disabled).await.map(Some)
            }
            OperationPayload::MoveOption { from_option_id, to_parent_id, value, disabled, .. } => {
                self.options.set_disabled(from_option_id, true).await?;
                self.options.create_option(to_parent_id, value, *disabled).await.map(Some)
            }
            OperationPayload::SetOptionDisabled { option_id, disabled } => {
                self.options.set_disabled(option_id, *disabled).await.map(|()| None)
            }
            OperationPayload::DeleteOption { option_id } => {
                self.options.delete_option(option_id).await.map(|()| None)
            }
            OperationPayload::ReorderOptions { option_ids, .. } => {
                self.options.move_to_first(option_ids).await.map(|()| None)
            }
            OperationPayload::AppendDomainRow(row) => {
                let mapping = self.mapping.as_ref().ok_or_else(|| {
                    SyncError::Config("no domain table is configured for row appends".into())
                })?;
                mapping.append_row(row).await.map(|()| None)
            }
        }
    }

    /// The creation comment is posted once the item exists.
    async fn follow_up(&self, operation: &SyncOperation, outcome: &OperationOutcome) {
        let (OperationPayload::CreateItem(draft), Some(key)) = (&operation.payload, &outcome.created_id)
        else {
            return;
        };
        let Some(comment) = &draft.comment else { return };

        let run = self.executor.execute(|| self.tracker.add_comment(key, comment)).await;
        if let Err(err) = run {
            self.audit
                .warning(
                    CONTEXT,
                    &format!("comment on created item {key} failed"),
                    json!({ "issue_key": key, "error": err.to_string() }),
                )
                .await;
        }
    }

    async fn pause_after(&self, kind: OperationKind) {
        let delay = if kind.is_label_removal() {
            self.settings.label_removal_delay
        } else {
            self.settings.request_delay
        };
        if !delay.is_zero() {
            debug!(?delay, "pacing after write");
            tokio::time::sleep(delay).await;
        }
    }
}

fn item_key(operation: &SyncOperation) -> Result<&str> {
    match &operation.target {
        EntityRef::Item { key } => Ok(key),
        other => Err(SyncError::Internal(format!("{} needs an item target, got {other}", operation.kind))),
    }
}

fn outcome(
    operation: &SyncOperation,
    status: OperationStatus,
    created_id: Option<String>,
    attempts: u32,
) -> OperationOutcome {
    OperationOutcome {
        idempotency_key: operation.idempotency_key.clone(),
        kind: operation.kind,
        target: operation.target.clone(),
        status,
        created_id,
        attempts,
    }
}

fn detail(operation: &SyncOperation, outcome: &OperationOutcome) -> serde_json::Value {
    json!({
        "idempotency_key": operation.idempotency_key,
        "kind": operation.kind.to_string(),
        "target": operation.target,
        "payload": operation.payload_json(),
        "status": outcome.status,
        "created_id": outcome.created_id,
        "attempts": outcome.attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_follow_rate_limit_section() {
        let settings = ApplierSettings::from(&RateLimitSettings {
            request_delay_ms: 250,
            max_retries: 0,
            retry_base_delay_secs: 2,
            max_workers: 1,
            label_removal_delay_ms: 10,
        });
        assert_eq!(settings.request_delay, Duration::from_millis(250));
        assert_eq!(settings.max_attempts, 1);
        assert_eq!(settings.retry_base_delay, Duration::from_secs(2));
    }

    #[test]
    fn only_rate_limits_are_retried() {
        assert!(retry_on_rate_limit(&SyncError::RateLimited("429".into()), 0));
        assert!(!retry_on_rate_limit(&SyncError::http(500, "boom"), 0));
        assert!(!retry_on_rate_limit(&SyncError::Transport("reset".into()), 0));
    }
}
