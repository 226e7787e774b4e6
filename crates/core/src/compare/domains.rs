//! Domain backfill diff and table completion

use std::collections::{BTreeMap, BTreeSet};

use cmdbsync_domain::{
    DomainEntry, DomainLifecycle, DomainMapping, DomainQualifier, DomainRow, EntityRef,
    ExportSnapshot, ExternalRecord, OperationKind, OperationPayload, SyncOperation, TrackedItem,
};

use crate::target::DomainPartition;

/// Candidates grouped by the domain identifier they reference.
pub fn group_candidates<'a>(
    items: &'a [TrackedItem],
    domain_id_field: &str,
) -> BTreeMap<String, Vec<&'a TrackedItem>> {
    let mut groups: BTreeMap<String, Vec<&TrackedItem>> = BTreeMap::new();
    for item in items {
        if let Some(id) = item.value(domain_id_field).map(str::trim).filter(|id| !id.is_empty()) {
            groups.entry(id.to_string()).or_default().push(item);
        }
    }
    groups
}

/// Where the display name of a referenced domain comes from.
#[derive(Debug, Clone, Copy)]
pub enum DomainResolution<'a> {
    /// Known to the mapping table.
    Mapped(&'a DomainEntry),
    /// Missing from the table but present, with a name, in the export.
    Export(&'a ExternalRecord),
    Unknown,
}

pub fn resolve_domain<'a>(
    domain_id: &str,
    mapping: &'a DomainMapping,
    export: &'a ExportSnapshot,
) -> DomainResolution<'a> {
    if let Some(entry) = mapping.get(domain_id) {
        return DomainResolution::Mapped(entry);
    }
    export
        .find(domain_id)
        .filter(|record| !record.display_name().trim().is_empty())
        .map_or(DomainResolution::Unknown, DomainResolution::Export)
}

/// One free-text field set per candidate item.
pub fn field_fill_ops(items: &[&TrackedItem], domain_field: &str, name: &str) -> Vec<SyncOperation> {
    items
        .iter()
        .map(|item| {
            SyncOperation::new(
                OperationKind::Update,
                EntityRef::Item { key: item.key.clone() },
                OperationPayload::SetField { field: domain_field.to_string(), value: name.to_string() },
            )
        })
        .collect()
}

pub fn append_row_op(row: DomainRow) -> SyncOperation {
    SyncOperation::new(
        OperationKind::Create,
        EntityRef::DomainRow { sys_id: row.sys_id.clone() },
        OperationPayload::AppendDomainRow(row),
    )
}

/// Row the table lacks, with the lifecycle that selected its qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAddition {
    pub row: DomainRow,
    pub lifecycle: DomainLifecycle,
}

/// Export domains the table does not list yet.
///
/// Planned and active domains get the planned qualifier (no tracked item
/// references an active one yet), retired domains the retired qualifier.
/// Ids in `handled` were dealt with while filling candidates.
pub fn missing_rows(
    partition: &DomainPartition<'_>,
    mapping: &DomainMapping,
    handled: &BTreeSet<String>,
) -> Vec<TableAddition> {
    partition
        .classified()
        .filter(|(record, _)| !mapping.contains(&record.sys_id) && !handled.contains(&record.sys_id))
        .filter_map(|(record, lifecycle)| {
            let name = record.display_name().trim();
            if name.is_empty() {
                return None;
            }
            let qualifier = match lifecycle {
                DomainLifecycle::Retired => DomainQualifier::Retired,
                _ => DomainQualifier::Planned,
            };
            Some(TableAddition {
                row: DomainRow::for_domain(record.sys_id.clone(), name, Some(qualifier)),
                lifecycle,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use cmdbsync_domain::{parse_export, EntrySource};
    use serde_json::json;

    use super::*;
    use crate::target::partition_domains;

    fn item(key: &str, domain: Option<&str>) -> TrackedItem {
        let mut item = TrackedItem { key: key.into(), ..TrackedItem::default() };
        if let Some(domain) = domain {
            item.custom_values.insert("cf_dom".into(), domain.into());
        }
        item
    }

    fn mapping() -> DomainMapping {
        let mut mapping = DomainMapping::new();
        mapping.insert_document(DomainEntry {
            sys_id: "D1".into(),
            name: "Finance".into(),
            qualifier: None,
            source: EntrySource::Document,
        });
        mapping
    }

    #[test]
    fn groups_candidates_by_domain() {
        let items = vec![item("X-1", Some("D1")), item("X-2", Some(" D1 ")), item("X-3", None)];
        let groups = group_candidates(&items, "cf_dom");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["D1"].len(), 2);
    }

    #[test]
    fn resolution_prefers_the_table() {
        let export = parse_export(json!([
            { "sys_id": "D1", "name": "Finance (export)" },
            { "sys_id": "D2", "name": "HR" },
            { "sys_id": "D3" }
        ]))
        .unwrap();
        let mapping = mapping();
        assert!(matches!(resolve_domain("D1", &mapping, &export), DomainResolution::Mapped(e) if e.name == "Finance"));
        assert!(matches!(resolve_domain("D2", &mapping, &export), DomainResolution::Export(r) if r.sys_id == "D2"));
        assert!(matches!(resolve_domain("D3", &mapping, &export), DomainResolution::Unknown));
        assert!(matches!(resolve_domain("D9", &mapping, &export), DomainResolution::Unknown));
    }

    #[test]
    fn missing_rows_pick_qualifiers_by_lifecycle() {
        let export = parse_export(json!([
            { "sys_id": "D1", "name": "Finance", "operational_status": "1" },
            { "sys_id": "D2", "name": "HR", "operational_status": "20" },
            { "sys_id": "D3", "name": "Legacy", "operational_status": "6" },
            { "sys_id": "D4", "name": "Ops", "operational_status": "1" },
            { "sys_id": "D5", "name": "Odd", "operational_status": "3" },
            { "sys_id": "D6", "name": "All" }
        ]))
        .unwrap();
        let partition = partition_domains(&export);
        let handled: BTreeSet<String> = ["D4".to_string()].into();
        let rows = missing_rows(&partition, &mapping(), &handled);
        let summary: Vec<_> =
            rows.iter().map(|a| (a.row.sys_id.as_str(), a.row.qualifier, a.lifecycle)).collect();
        assert_eq!(
            summary,
            vec![
                ("D2", Some(DomainQualifier::Planned), DomainLifecycle::Planned),
                ("D3", Some(DomainQualifier::Retired), DomainLifecycle::Retired),
            ]
        );
    }

    #[test]
    fn field_fill_sets_free_text() {
        let items = vec![item("X-1", Some("D1"))];
        let refs: Vec<&TrackedItem> = items.iter().collect();
        let ops = field_fill_ops(&refs, "cf_name", "Finance");
        assert_eq!(
            ops[0].payload,
            OperationPayload::SetField { field: "cf_name".into(), value: "Finance".into() }
        );
    }
}
