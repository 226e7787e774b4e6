//! Domain backfill and domain table maintenance

use std::collections::BTreeSet;
use std::sync::Arc;

use cmdbsync_domain::{
    fields, DomainLifecycle, DomainMapping, DomainRow, ExportSnapshot, JiraSettings,
    OperationOutcome, Result, SyncSettings, TrackedItem,
};
use serde_json::json;
use tracing::{debug, info, instrument};

use super::{domain_backfill_jql, load_items};
use crate::applier::OperationApplier;
use crate::audit::AuditTrail;
use crate::compare::{
    append_row_op, field_fill_ops, group_candidates, missing_rows, resolve_domain,
    DomainResolution,
};
use crate::document_ports::DomainMappingSource;
use crate::report::{DomainSyncStats, PassReport};
use crate::target::partition_domains;
use crate::tracker_ports::{IssueTracker, ItemQuery};

const CONTEXT: &str = "domains";

/// Fills the free-text domain name on items that only carry the domain id,
/// and keeps the documentation table in step with the domain export.
pub struct DomainReconciler {
    tracker: Arc<dyn IssueTracker>,
    applier: Arc<OperationApplier>,
    mapping_source: Arc<dyn DomainMappingSource>,
    audit: AuditTrail,
    jira: JiraSettings,
    domain_id_field: String,
    domain_field: String,
    excluded_keys: Vec<String>,
    auto_update_table: bool,
}

impl DomainReconciler {
    pub fn new(
        tracker: Arc<dyn IssueTracker>,
        applier: Arc<OperationApplier>,
        mapping_source: Arc<dyn DomainMappingSource>,
        settings: &SyncSettings,
    ) -> Result<Self> {
        Ok(Self {
            tracker,
            applier,
            mapping_source,
            audit: AuditTrail::log_only(),
            jira: settings.jira.clone(),
            domain_id_field: settings.custom_fields.require(fields::BUSINESS_DOMAIN_ID)?.to_string(),
            domain_field: settings.custom_fields.require(fields::BUSINESS_DOMAIN)?.to_string(),
            excluded_keys: settings.excluded_issue_keys.clone(),
            auto_update_table: settings.confluence()?.auto_update_table,
        })
    }

    pub fn with_audit(mut self, audit: AuditTrail) -> Self {
        self.audit = audit;
        self
    }

    #[instrument(skip(self, domains), fields(records = domains.records.len()))]
    pub async fn run(
        &self,
        domains: &ExportSnapshot,
        force_refresh: bool,
    ) -> Result<PassReport<DomainSyncStats>> {
        let mut stats = DomainSyncStats::default();
        let mut outcomes = Vec::new();

        for rejected in &domains.rejected {
            self.audit
                .error(
                    CONTEXT,
                    &format!("export row {} rejected: {}", rejected.index, rejected.reason),
                    json!({ "index": rejected.index, "reason": rejected.reason }),
                )
                .await;
        }

        let mut mapping = self.mapping_source.load(force_refresh).await?;
        info!(entries = mapping.len(), "domain mapping loaded");

        let query = ItemQuery {
            jql: domain_backfill_jql(&self.jira, &self.domain_id_field, &self.domain_field, &self.excluded_keys),
            fields: vec![self.domain_id_field.clone(), self.domain_field.clone()],
            external_id_field: None,
        };
        let candidates = load_items(self.tracker.as_ref(), "domain candidates", &query).await?;
        let groups = group_candidates(&candidates, &self.domain_id_field);
        info!(candidates = candidates.len(), domains = groups.len(), "backfill candidates loaded");

        let mut handled = BTreeSet::new();
        for (domain_id, items) in &groups {
            handled.insert(domain_id.clone());
            match resolve_domain(domain_id, &mapping, domains) {
                DomainResolution::Mapped(entry) => {
                    let name = entry.name.clone();
                    self.fill(items, &name, &mut stats, &mut outcomes).await;
                }
                DomainResolution::Export(record) => {
                    let name = record.display_name().trim().to_string();
                    self.fill(items, &name, &mut stats, &mut outcomes).await;
                    if self.auto_update_table {
                        let row = DomainRow::for_domain(domain_id.clone(), name, None);
                        if self.append(row, &mut mapping, &mut outcomes).await {
                            debug!(sys_id = %domain_id, "domain added to the table");
                        } else {
                            stats.errors += 1;
                        }
                    } else {
                        stats.not_found += 1;
                        self.audit
                            .warning(
                                CONTEXT,
                                &format!("ACTION REQUIRED: add domain '{name}' ({domain_id}) to the domain table"),
                                json!({ "sys_id": domain_id, "name": name, "items": keys(items) }),
                            )
                            .await;
                    }
                }
                DomainResolution::Unknown => {
                    stats.not_found += 1;
                    self.audit
                        .error(
                            CONTEXT,
                            &format!("domain {domain_id} is neither in the table nor in the export"),
                            json!({ "sys_id": domain_id, "items": keys(items) }),
                        )
                        .await;
                }
            }
        }

        stats.activated = count_activated(&groups.keys().cloned().collect(), &mapping, domains);

        if self.auto_update_table {
            let partition = partition_domains(domains);
            for addition in missing_rows(&partition, &mapping, &handled) {
                let lifecycle = addition.lifecycle;
                if self.append(addition.row, &mut mapping, &mut outcomes).await {
                    match lifecycle {
                        DomainLifecycle::Retired => stats.retired_added += 1,
                        _ => stats.planned_added += 1,
                    }
                } else {
                    stats.errors += 1;
                }
            }
        }

        info!(%stats, "domain pass finished");
        Ok(PassReport { stats, outcomes })
    }

    async fn fill(
        &self,
        items: &[&TrackedItem],
        name: &str,
        stats: &mut DomainSyncStats,
        outcomes: &mut Vec<OperationOutcome>,
    ) {
        let ops = field_fill_ops(items, &self.domain_field, name);
        let results = self.applier.apply_all(&ops).await;
        if results.iter().any(OperationOutcome::succeeded) {
            stats.executed += 1;
        }
        stats.errors += results.iter().filter(|o| o.failed()).count();
        outcomes.extend(results);
    }

    /// Append a row and record it locally so later steps see it.
    async fn append(
        &self,
        row: DomainRow,
        mapping: &mut DomainMapping,
        outcomes: &mut Vec<OperationOutcome>,
    ) -> bool {
        let entry = row.to_entry();
        let outcome = self.applier.apply(&append_row_op(row)).await;
        let succeeded = outcome.succeeded();
        if succeeded {
            mapping.record_automation(entry);
        }
        outcomes.push(outcome);
        succeeded
    }
}

/// Referenced domains the table still marks as planned while the export
/// already lists them as active.
fn count_activated(
    referenced: &BTreeSet<String>,
    mapping: &DomainMapping,
    domains: &ExportSnapshot,
) -> usize {
    referenced
        .iter()
        .filter(|id| mapping.get(id).is_some_and(|entry| entry.is_planned()))
        .filter(|id| {
            domains
                .find(id)
                .is_some_and(|record| DomainLifecycle::from(&record.status()) == DomainLifecycle::Active)
        })
        .inspect(|id| info!(sys_id = %id, "planned domain is now active"))
        .count()
}

fn keys(items: &[&TrackedItem]) -> Vec<String> {
    items.iter().map(|item| item.key.clone()).collect()
}

#[cfg(test)]
mod tests {
    use cmdbsync_domain::{parse_export, DomainEntry, DomainQualifier, EntrySource};

    use super::*;

    #[test]
    fn activation_needs_planned_entry_and_active_export() {
        let export = parse_export(serde_json::json!([
            { "sys_id": "D1", "name": "Finance", "operational_status": "1" },
            { "sys_id": "D2", "name": "HR", "operational_status": "20" },
            { "sys_id": "D3", "name": "Ops" }
        ]))
        .unwrap();
        let mut mapping = DomainMapping::new();
        for id in ["D1", "D2", "D3"] {
            mapping.insert_document(DomainEntry {
                sys_id: id.into(),
                name: id.into(),
                qualifier: (id != "D3").then_some(DomainQualifier::Planned),
                source: EntrySource::Document,
            });
        }
        let referenced: BTreeSet<String> = ["D1", "D2", "D3"].iter().map(|s| (*s).to_string()).collect();
        assert_eq!(count_activated(&referenced, &mapping, &export), 1);
    }
}
