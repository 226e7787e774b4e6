//! Service record reconciliation

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use cmdbsync_domain::{
    ExportSnapshot, JiraSettings, OperationKind, OperationOutcome, Result, SyncSettings,
};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::{load_items, service_population_jql};
use crate::applier::OperationApplier;
use crate::audit::AuditTrail;
use crate::compare::{diff_services, ServiceDiffContext, ServiceFieldIds, ServicePlan};
use crate::identity::ReporterResolver;
use crate::index::ItemIndex;
use crate::report::{PassReport, ServiceSyncStats};
use crate::target::service_targets;
use crate::tracker_ports::{IssueTracker, ItemQuery};

const CONTEXT: &str = "services";

/// Creates and updates one tracked item per exported service and removes the
/// verification label from items whose service left the export.
pub struct ServiceReconciler {
    tracker: Arc<dyn IssueTracker>,
    applier: Arc<OperationApplier>,
    reporter: Arc<ReporterResolver>,
    audit: AuditTrail,
    jira: JiraSettings,
    fields: ServiceFieldIds,
    excluded_keys: Vec<String>,
}

impl ServiceReconciler {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        applier: Arc<OperationApplier>,
        reporter: Arc<ReporterResolver>,
        settings: &SyncSettings,
    ) -> Result<Self> {
        Ok(Self {
            tracker,
            applier,
            reporter,
            audit: AuditTrail::log_only(),
            jira: settings.jira.clone(),
            fields: ServiceFieldIds::from_map(&settings.custom_fields)?,
            excluded_keys: settings.excluded_issue_keys.clone(),
        })
    }

    pub fn with_audit(mut self, audit: AuditTrail) -> Self {
        self.audit = audit;
        self
    }

    /// Load the current items and compute the plan without applying it.
    pub async fn plan(&self, services: &ExportSnapshot, today: NaiveDate) -> Result<ServicePlan> {
        let targets = service_targets(services);
        let index = self.load_index().await?;
        let reporter = self.resolve_reporter().await;
        let ctx = ServiceDiffContext {
            jira: &self.jira,
            fields: &self.fields,
            reporter: reporter.as_deref(),
            today,
        };
        Ok(diff_services(&targets.records, &index, &ctx))
    }

    /// Run the pass. Upserts are applied before any label removal.
    #[instrument(skip(self, services), fields(records = services.records.len()))]
    pub async fn run(&self, services: &ExportSnapshot) -> Result<PassReport<ServiceSyncStats>> {
        let mut stats = ServiceSyncStats::default();

        for rejected in &services.rejected {
            stats.excluded += 1;
            self.audit
                .error(
                    CONTEXT,
                    &format!("export row {} rejected: {}", rejected.index, rejected.reason),
                    json!({ "index": rejected.index, "reason": rejected.reason }),
                )
                .await;
        }

        let targets = service_targets(services);
        stats.processed = targets.records.len();
        stats.excluded += targets.excluded.len();

        let plan = self.plan(services, Local::now().date_naive()).await?;
        stats.unchanged = plan.unchanged;
        for skipped in &plan.skipped {
            stats.excluded += 1;
            self.audit
                .warning(
                    CONTEXT,
                    &format!("service {} skipped: {}", skipped.sys_id, skipped.reason),
                    json!({ "sys_id": skipped.sys_id, "reason": skipped.reason }),
                )
                .await;
        }

        info!(upserts = plan.upserts.len(), cleanups = plan.cleanups.len(), "service plan ready");

        let mut outcomes = self.applier.apply_all(&plan.upserts).await;
        outcomes.extend(self.applier.apply_all(&plan.cleanups).await);
        for outcome in &outcomes {
            count(&mut stats, outcome);
        }

        info!(%stats, "service pass finished");
        Ok(PassReport { stats, outcomes })
    }

    async fn load_index(&self) -> Result<ItemIndex> {
        let query = ItemQuery {
            jql: service_population_jql(&self.jira, &self.excluded_keys),
            fields: self.fields.all(),
            external_id_field: Some(self.fields.external_id.clone()),
        };
        let items = load_items(self.tracker.as_ref(), "service items", &query).await?;
        info!(items = items.len(), "service items loaded");
        Ok(ItemIndex::build(items))
    }

    /// A failed lookup is reported and the pass continues without forcing
    /// a reporter.
    async fn resolve_reporter(&self) -> Option<String> {
        match self.reporter.resolve(false).await {
            Ok(reporter) => reporter,
            Err(err) => {
                warn!(error = %err, "reporter lookup failed");
                self.audit
                    .warning(
                        CONTEXT,
                        "reporter lookup failed; items keep their current reporter",
                        json!({ "error": err }),
                    )
                    .await;
                None
            }
        }
    }
}

fn count(stats: &mut ServiceSyncStats, outcome: &OperationOutcome) {
    if outcome.failed() {
        stats.errors += 1;
        return;
    }
    if !outcome.succeeded() {
        return;
    }
    match outcome.kind {
        OperationKind::Create => stats.created += 1,
        OperationKind::Update | OperationKind::LabelAdd => stats.updated += 1,
        OperationKind::LabelRemove => stats.labels_removed += 1,
        _ => {}
    }
}
