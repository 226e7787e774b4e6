//! Service record diff

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use cmdbsync_domain::constants::{
    CREATED_COMMENT_PREFIX, MAX_SUMMARY_CHARS, SUMMARY_SEPARATOR, UPDATED_COMMENT_PREFIX,
    VERIFICATION_LABEL,
};
use cmdbsync_domain::{
    derive_retired_label, fields, normalize_value, truncate_chars, CustomFieldMap, EntityRef,
    ExternalRecord, FieldValue, ItemChanges, ItemDraft, JiraSettings, OperationKind,
    OperationPayload, Result, SyncOperation, TrackedItem,
};

use crate::index::{ItemIndex, MatchKind};

/// Platform ids of the fields a service record is compared on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFieldIds {
    pub external_id: String,
    pub domain_id: String,
    pub name: String,
    pub short_name: String,
    pub status: String,
    pub usage: String,
    pub classification: String,
}

impl ServiceFieldIds {
    pub fn from_map(map: &CustomFieldMap) -> Result<Self> {
        Ok(Self {
            external_id: map.require(fields::BUSINESS_SERVICE_ID)?.to_string(),
            domain_id: map.require(fields::BUSINESS_DOMAIN_ID)?.to_string(),
            name: map.require(fields::BUSINESS_SERVICE_NAME)?.to_string(),
            short_name: map.require(fields::BUSINESS_SERVICE_SHORT_NAME)?.to_string(),
            status: map.require(fields::BUSINESS_SERVICE_STATUS)?.to_string(),
            usage: map.require(fields::BUSINESS_SERVICE_USAGE)?.to_string(),
            classification: map.require(fields::BUSINESS_SERVICE_CLASSIFICATION)?.to_string(),
        })
    }

    /// Every field the service search must return.
    pub fn all(&self) -> Vec<String> {
        vec![
            self.external_id.clone(),
            self.domain_id.clone(),
            self.name.clone(),
            self.short_name.clone(),
            self.status.clone(),
            self.usage.clone(),
            self.classification.clone(),
        ]
    }

    /// Desired value of each compared field for a record.
    fn desired(&self, record: &ExternalRecord) -> [(&str, FieldValue); 6] {
        let text = |v: &Option<String>| FieldValue::Text(v.clone().unwrap_or_default());
        let select = |v: Option<String>| FieldValue::Select(v.unwrap_or_default());
        [
            (self.domain_id.as_str(), text(&record.u_business_domain)),
            (self.name.as_str(), text(&record.name)),
            (self.short_name.as_str(), text(&record.u_short_service_id)),
            (self.status.as_str(), select(record.status().field_label())),
            (self.usage.as_str(), select(record.used_for.clone())),
            (self.classification.as_str(), select(record.service_classification.clone())),
        ]
    }
}

/// Inputs of the service diff besides the two states.
#[derive(Debug, Clone)]
pub struct ServiceDiffContext<'a> {
    pub jira: &'a JiraSettings,
    pub fields: &'a ServiceFieldIds,
    /// Resolved account id of the mandatory reporter.
    pub reporter: Option<&'a str>,
    pub today: NaiveDate,
}

/// A target record skipped as a data fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub sys_id: String,
    pub reason: String,
}

/// Operations for the service pass, in application order.
#[derive(Debug, Clone, Default)]
pub struct ServicePlan {
    /// Creates, updates and label adds.
    pub upserts: Vec<SyncOperation>,
    /// Label removals for items whose record left the export. Applied last.
    pub cleanups: Vec<SyncOperation>,
    pub unchanged: usize,
    pub skipped: Vec<SkippedRecord>,
}

impl ServicePlan {
    pub fn operations(&self) -> impl Iterator<Item = &SyncOperation> {
        self.upserts.iter().chain(&self.cleanups)
    }

    pub fn len(&self) -> usize {
        self.upserts.len() + self.cleanups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn value_of(value: &FieldValue) -> &str {
    match value {
        FieldValue::Text(v) | FieldValue::Select(v) => v,
    }
}

/// Changed fields of an existing item. Empty desired values never clear a
/// field.
fn changed_fields(
    item: &TrackedItem,
    record: &ExternalRecord,
    ids: &ServiceFieldIds,
) -> BTreeMap<String, FieldValue> {
    ids.desired(record)
        .into_iter()
        .filter_map(|(field, desired)| {
            let wanted = normalize_value(Some(value_of(&desired)))?;
            let current = normalize_value(item.value(field));
            (current.as_deref() != Some(wanted.as_str())).then(|| (field.to_string(), desired))
        })
        .collect()
}

fn expected_summary(item: &TrackedItem, record: &ExternalRecord) -> String {
    let base = if item.summary.trim().is_empty() {
        default_summary(record)
    } else {
        item.summary.clone()
    };
    derive_retired_label(&base, record.status().is_retired())
}

fn default_summary(record: &ExternalRecord) -> String {
    truncate_chars(
        &format!("{}{SUMMARY_SEPARATOR}{}", record.display_name().trim(), record.sys_id),
        MAX_SUMMARY_CHARS,
    )
}

/// Operation bringing an existing item in line with its record, if any.
fn update_for(
    item: &TrackedItem,
    record: &ExternalRecord,
    matched: MatchKind,
    ctx: &ServiceDiffContext<'_>,
) -> Option<SyncOperation> {
    let mut fields = changed_fields(item, record, ctx.fields);
    if matched == MatchKind::Name && item.external_id.as_deref() != Some(record.sys_id.as_str()) {
        fields.insert(ctx.fields.external_id.clone(), FieldValue::Text(record.sys_id.clone()));
    }
    let summary = Some(expected_summary(item, record)).filter(|s| *s != item.summary);
    let reporter_differs =
        ctx.reporter.is_some_and(|wanted| item.reporter.as_deref() != Some(wanted));
    let target = EntityRef::Item { key: item.key.clone() };

    let mut changes = ItemChanges { fields, summary, ..ItemChanges::default() };
    if changes.touches_content() || item.assignee.is_some() || reporter_differs {
        changes.clear_assignee = true;
        changes.reporter = ctx.reporter.map(str::to_string);
        changes.add_label = Some(VERIFICATION_LABEL.to_string());
        if changes.touches_content() {
            changes.comment = Some(format!("{UPDATED_COMMENT_PREFIX} {}", ctx.today.format("%Y-%m-%d")));
        }
        return Some(SyncOperation::new(
            OperationKind::Update,
            target,
            OperationPayload::UpdateItem(changes),
        ));
    }

    (!item.has_label(VERIFICATION_LABEL)).then(|| {
        SyncOperation::new(
            OperationKind::LabelAdd,
            target,
            OperationPayload::AddLabel { label: VERIFICATION_LABEL.to_string() },
        )
    })
}

fn create_for(record: &ExternalRecord, ctx: &ServiceDiffContext<'_>) -> SyncOperation {
    let fields = ctx
        .fields
        .desired(record)
        .into_iter()
        .filter(|(_, value)| normalize_value(Some(value_of(value))).is_some())
        .map(|(field, value)| (field.to_string(), value))
        .collect();
    let summary = derive_retired_label(&default_summary(record), record.status().is_retired());
    let draft = ItemDraft {
        project_key: ctx.jira.project_key.clone(),
        issue_type: ctx.jira.issue_type.clone(),
        summary,
        external_id_field: ctx.fields.external_id.clone(),
        external_id: record.sys_id.clone(),
        fields,
        labels: vec![VERIFICATION_LABEL.to_string()],
        reporter: ctx.reporter.map(str::to_string),
        description: normalize_value(record.short_description.as_deref()),
        comment: Some(format!("{CREATED_COMMENT_PREFIX} {}", ctx.today.format("%Y-%m-%d"))),
    };
    SyncOperation::new(
        OperationKind::Create,
        EntityRef::NewItem { external_id: record.sys_id.clone() },
        OperationPayload::CreateItem(draft),
    )
}

/// Compute the operations converging the tracked items onto the export.
///
/// Obsolete-label removals are computed from the identifier sets captured
/// before any change and are kept apart from the upserts so they run last.
pub fn diff_services(
    targets: &[&ExternalRecord],
    index: &ItemIndex,
    ctx: &ServiceDiffContext<'_>,
) -> ServicePlan {
    let mut plan = ServicePlan::default();
    let mut seen_ids = BTreeSet::new();
    let mut matched_keys = BTreeSet::new();

    for record in targets {
        if !seen_ids.insert(record.sys_id.as_str()) {
            plan.skipped.push(SkippedRecord {
                sys_id: record.sys_id.clone(),
                reason: "duplicate sys_id in export".into(),
            });
            continue;
        }
        if record.display_name().trim().is_empty() {
            plan.skipped.push(SkippedRecord {
                sys_id: record.sys_id.clone(),
                reason: "record has no name".into(),
            });
            continue;
        }

        match index.resolve(&record.sys_id, record.display_name()) {
            Some((item, kind)) => {
                if !matched_keys.insert(item.key.as_str()) {
                    plan.skipped.push(SkippedRecord {
                        sys_id: record.sys_id.clone(),
                        reason: format!("{} already matched another record", item.key),
                    });
                    continue;
                }
                match update_for(item, record, kind, ctx) {
                    Some(op) => plan.upserts.push(op),
                    None => plan.unchanged += 1,
                }
            }
            None => plan.upserts.push(create_for(record, ctx)),
        }
    }

    let mut obsolete: Vec<&TrackedItem> = index
        .identified()
        .filter(|(id, item)| {
            !seen_ids.contains(id)
                && !matched_keys.contains(item.key.as_str())
                && item.has_label(VERIFICATION_LABEL)
        })
        .map(|(_, item)| item)
        .collect();
    obsolete.sort_by(|a, b| a.key.cmp(&b.key));
    obsolete.dedup_by(|a, b| a.key == b.key);
    plan.cleanups = obsolete
        .into_iter()
        .map(|item| {
            SyncOperation::new(
                OperationKind::LabelRemove,
                EntityRef::Item { key: item.key.clone() },
                OperationPayload::RemoveLabel { label: VERIFICATION_LABEL.to_string() },
            )
        })
        .collect();

    plan
}

#[cfg(test)]
mod tests {
    use cmdbsync_domain::parse_export;
    use serde_json::json;

    use super::*;

    fn field_ids() -> ServiceFieldIds {
        ServiceFieldIds {
            external_id: "cf_id".into(),
            domain_id: "cf_dom".into(),
            name: "cf_name".into(),
            short_name: "cf_short".into(),
            status: "cf_status".into(),
            usage: "cf_usage".into(),
            classification: "cf_class".into(),
        }
    }

    fn jira() -> JiraSettings {
        JiraSettings {
            project_key: "AMI".into(),
            issue_type: "Business Service".into(),
            reporter_account_id: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn synced_item(key: &str, sys_id: &str, name: &str) -> TrackedItem {
        let mut item = TrackedItem {
            key: key.into(),
            external_id: Some(sys_id.into()),
            summary: format!("{name} | {sys_id}"),
            ..TrackedItem::default()
        };
        item.labels.insert(VERIFICATION_LABEL.into());
        item.custom_values.insert("cf_name".into(), name.into());
        item.custom_values.insert("cf_status".into(), "Operational (1)".into());
        item.reporter = Some("acc-1".into());
        item
    }

    fn run(records: serde_json::Value, items: Vec<TrackedItem>, reporter: Option<&str>) -> ServicePlan {
        let snapshot = parse_export(records).unwrap();
        let targets: Vec<&ExternalRecord> = snapshot.records.iter().collect();
        let ids = field_ids();
        let jira = jira();
        let ctx = ServiceDiffContext { jira: &jira, fields: &ids, reporter, today: today() };
        diff_services(&targets, &ItemIndex::build(items), &ctx)
    }

    #[test]
    fn retired_record_renames_and_labels_in_one_update() {
        let item = TrackedItem {
            key: "X-1".into(),
            external_id: Some("A1".into()),
            summary: "Payroll | A1".into(),
            ..TrackedItem::default()
        };
        let plan = run(
            json!([{ "sys_id": "A1", "name": "Payroll", "operational_status": "6" }]),
            vec![item],
            None,
        );
        assert_eq!(plan.len(), 1);
        let op = &plan.upserts[0];
        assert_eq!(op.kind, OperationKind::Update);
        let OperationPayload::UpdateItem(changes) = &op.payload else { panic!("not an update") };
        assert_eq!(changes.summary.as_deref(), Some("Retired-Payroll | A1"));
        assert_eq!(changes.add_label.as_deref(), Some(VERIFICATION_LABEL));
        assert!(changes.clear_assignee);
        assert!(changes.comment.as_deref().is_some_and(|c| c.ends_with("2026-03-01")));
        assert_eq!(changes.fields.get("cf_status"), Some(&FieldValue::Select("Retired (6)".into())));
    }

    #[test]
    fn name_fallback_updates_instead_of_creating() {
        let item = TrackedItem {
            key: "X-9".into(),
            external_id: None,
            summary: "Retired - Billing | OLD".into(),
            ..TrackedItem::default()
        };
        let plan = run(json!([{ "sys_id": "B2", "name": "billing" }]), vec![item], None);
        assert_eq!(plan.upserts.len(), 1);
        assert_eq!(plan.upserts[0].kind, OperationKind::Update);
        let OperationPayload::UpdateItem(changes) = &plan.upserts[0].payload else {
            panic!("not an update")
        };
        assert_eq!(changes.fields.get("cf_id"), Some(&FieldValue::Text("B2".into())));
        assert_eq!(changes.summary.as_deref(), Some("Billing | OLD"));
    }

    #[test]
    fn synced_item_yields_nothing() {
        let plan = run(
            json!([{ "sys_id": "A1", "name": "Payroll", "operational_status": "1" }]),
            vec![synced_item("X-1", "A1", "Payroll")],
            Some("acc-1"),
        );
        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, 1);
    }

    #[test]
    fn missing_label_alone_is_a_label_add() {
        let mut item = synced_item("X-1", "A1", "Payroll");
        item.labels.clear();
        let plan = run(
            json!([{ "sys_id": "A1", "name": "Payroll", "operational_status": "1" }]),
            vec![item],
            Some("acc-1"),
        );
        assert_eq!(plan.upserts.len(), 1);
        assert_eq!(plan.upserts[0].kind, OperationKind::LabelAdd);
    }

    #[test]
    fn assignee_or_reporter_drift_forces_update_without_comment() {
        let mut item = synced_item("X-1", "A1", "Payroll");
        item.assignee = Some("someone".into());
        let plan = run(
            json!([{ "sys_id": "A1", "name": "Payroll", "operational_status": "1" }]),
            vec![item],
            Some("acc-1"),
        );
        let OperationPayload::UpdateItem(changes) = &plan.upserts[0].payload else {
            panic!("not an update")
        };
        assert!(changes.clear_assignee);
        assert_eq!(changes.reporter.as_deref(), Some("acc-1"));
        assert!(changes.comment.is_none());
    }

    #[test]
    fn blank_values_never_clear_fields() {
        let mut item = synced_item("X-1", "A1", "Payroll");
        item.custom_values.insert("cf_usage".into(), "Internal".into());
        let plan = run(
            json!([{ "sys_id": "A1", "name": " Payroll ", "operational_status": "1", "used_for": "  " }]),
            vec![item],
            Some("acc-1"),
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn unmapped_status_is_not_written() {
        let plan = run(
            json!([{ "sys_id": "A1", "name": "Payroll", "operational_status": "99" }]),
            vec![synced_item("X-1", "A1", "Payroll")],
            Some("acc-1"),
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn new_record_creates_with_all_values() {
        let plan = run(
            json!([{
                "sys_id": "C3", "name": "Ledger", "operational_status": "6",
                "u_business_domain": "D1", "short_description": "Books", "used_for": "Production"
            }]),
            vec![],
            Some("acc-1"),
        );
        let OperationPayload::CreateItem(draft) = &plan.upserts[0].payload else {
            panic!("not a create")
        };
        assert_eq!(draft.summary, "Retired-Ledger | C3");
        assert_eq!(draft.fields.get("cf_dom"), Some(&FieldValue::Text("D1".into())));
        assert_eq!(draft.fields.get("cf_usage"), Some(&FieldValue::Select("Production".into())));
        assert!(!draft.fields.contains_key("cf_short"));
        assert_eq!(draft.description.as_deref(), Some("Books"));
        assert_eq!(draft.reporter.as_deref(), Some("acc-1"));
    }

    #[test]
    fn obsolete_and_created_sets_are_disjoint() {
        let gone = synced_item("X-2", "GONE", "Gone");
        let mut unlabeled = synced_item("X-3", "OLD", "Old");
        unlabeled.labels.clear();
        let plan = run(
            json!([{ "sys_id": "NEW", "name": "Fresh" }]),
            vec![gone, unlabeled],
            Some("acc-1"),
        );
        assert_eq!(plan.cleanups.len(), 1);
        assert_eq!(plan.cleanups[0].target, EntityRef::Item { key: "X-2".into() });
        assert_eq!(plan.upserts[0].kind, OperationKind::Create);
        let created: BTreeSet<_> = plan.upserts.iter().map(|op| op.target.to_string()).collect();
        let removed: BTreeSet<_> = plan.cleanups.iter().map(|op| op.target.to_string()).collect();
        assert!(created.is_disjoint(&removed));
    }

    #[test]
    fn duplicate_records_are_skipped() {
        let plan = run(
            json!([{ "sys_id": "A1", "name": "Payroll" }, { "sys_id": "A1", "name": "Payroll" }]),
            vec![],
            None,
        );
        assert_eq!(plan.upserts.len(), 1);
        assert_eq!(plan.skipped.len(), 1);
    }
}
