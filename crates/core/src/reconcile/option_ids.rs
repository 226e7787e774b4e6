//! Option-id backfill
//!
//! Copies the id of the matching child option into a text field on every
//! non-retired service item, so automation rules can set the cascading field
//! without a lookup.

use std::sync::Arc;

use cmdbsync_domain::{
    fields, normalize_value, EntityRef, JiraSettings, OperationKind, OperationPayload, Result,
    SyncOperation, SyncSettings, TrackedItem,
};
use tracing::{debug, info, instrument};

use super::{load_items, load_option_tree, option_id_backfill_jql};
use crate::applier::OperationApplier;
use crate::index::OptionTreeIndex;
use crate::report::{OptionIdStats, PassReport};
use crate::tracker_ports::{IssueTracker, ItemQuery, OptionStore};

/// Field ids read and written by the backfill.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BackfillFields {
    status: String,
    name: String,
    domain: String,
    option_id: String,
}

pub struct OptionIdReconciler {
    tracker: Arc<dyn IssueTracker>,
    options: Arc<dyn OptionStore>,
    applier: Arc<OperationApplier>,
    jira: JiraSettings,
    fields: BackfillFields,
}

impl OptionIdReconciler {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        options: Arc<dyn OptionStore>,
        applier: Arc<OperationApplier>,
        settings: &SyncSettings,
    ) -> Result<Self> {
        let map = &settings.custom_fields;
        Ok(Self {
            tracker,
            options,
            applier,
            jira: settings.jira.clone(),
            fields: BackfillFields {
                status: map.require(fields::BUSINESS_SERVICE_STATUS)?.to_string(),
                name: map.require(fields::BUSINESS_SERVICE_NAME)?.to_string(),
                domain: map.require(fields::BUSINESS_DOMAIN)?.to_string(),
                option_id: map.require(fields::BUSINESS_SERVICE_OPTION_ID)?.to_string(),
            },
        })
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<PassReport<OptionIdStats>> {
        let query = ItemQuery {
            jql: option_id_backfill_jql(&self.jira, &self.fields.status),
            fields: vec![
                self.fields.status.clone(),
                self.fields.name.clone(),
                self.fields.domain.clone(),
                self.fields.option_id.clone(),
            ],
            external_id_field: None,
        };
        let items = load_items(self.tracker.as_ref(), "option-id candidates", &query).await?;
        let index = OptionTreeIndex::build(load_option_tree(self.options.as_ref()).await?);

        let mut stats = OptionIdStats::default();
        let mut operations = Vec::new();
        for item in &items {
            match self.expected_option_id(item, &index) {
                None => {
                    debug!(issue_key = %item.key, "no matching option");
                    stats.unresolved += 1;
                }
                Some(id) if normalize_value(item.value(&self.fields.option_id)).as_deref() == Some(id) => {
                    stats.unchanged += 1;
                }
                Some(id) => operations.push(SyncOperation::new(
                    OperationKind::Update,
                    EntityRef::Item { key: item.key.clone() },
                    OperationPayload::SetField { field: self.fields.option_id.clone(), value: id.to_string() },
                )),
            }
        }

        let outcomes = self.applier.apply_all(&operations).await;
        for outcome in &outcomes {
            if outcome.failed() {
                stats.errors += 1;
            } else if outcome.succeeded() {
                stats.updated += 1;
            }
        }

        info!(items = items.len(), %stats, "option-id backfill finished");
        Ok(PassReport { stats, outcomes })
    }

    fn expected_option_id<'a>(&self, item: &TrackedItem, index: &'a OptionTreeIndex) -> Option<&'a str> {
        let domain = normalize_value(item.value(&self.fields.domain))?;
        let name = normalize_value(item.value(&self.fields.name))?;
        index.child_in(&domain, &name).map(|child| child.id.as_str())
    }
}
