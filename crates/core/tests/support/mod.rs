//! Shared test helpers for `cmdbsync-core` integration tests.
//!
//! In-memory fakes of every port, so reconciliation passes can run end to
//! end and be re-run against the state they produced.

#![allow(dead_code)]

pub mod options;
pub mod sinks;
pub mod tracker;

use std::sync::Arc;
use std::time::Duration;

use cmdbsync_core::{ApplierSettings, OperationApplier};
use cmdbsync_domain::{ExportSnapshot, RunMode, SyncSettings};
use serde_json::json;

pub use options::InMemoryOptionStore;
pub use sinks::{InMemoryDomainTable, RecordingAudit, RecordingReport};
pub use tracker::InMemoryTracker;

/// Settings with short field ids (`cf_*`) and table updates enabled.
pub fn settings() -> SyncSettings {
    serde_json::from_value(json!({
        "jira": { "project_key": "AMI", "issue_type": "Business Service", "reporter_account_id": "acc-robot" },
        "custom_fields": {
            "business_service_id": "cf_id",
            "business_domain_id": "cf_dom",
            "business_domain": "cf_domname",
            "business_service_name": "cf_name",
            "business_service_short_name": "cf_short",
            "business_service_status": "cf_status",
            "business_service_usage": "cf_usage",
            "business_service_classification": "cf_class",
            "business_service_option_id": "cf_optid"
        },
        "confluence": { "page_id": "1", "table_id": "t", "auto_update_table": true },
        "dropdown_cascading_field": { "bus_domain_and_service": "cf_cascade", "context_id": "7" },
        "excluded_issue_keys": []
    }))
    .unwrap()
}

/// No pacing, three attempts, short backoff.
pub fn fast_settings() -> ApplierSettings {
    ApplierSettings {
        request_delay: Duration::ZERO,
        label_removal_delay: Duration::ZERO,
        max_attempts: 3,
        retry_base_delay: Duration::from_millis(10),
    }
}

pub fn applier(
    tracker: &Arc<InMemoryTracker>,
    options: &Arc<InMemoryOptionStore>,
    mode: RunMode,
) -> OperationApplier {
    OperationApplier::new(tracker.clone(), options.clone(), mode, fast_settings())
}

pub fn export(records: serde_json::Value) -> ExportSnapshot {
    cmdbsync_domain::parse_export(records).unwrap()
}
