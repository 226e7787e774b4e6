//! Domain mapping table kept in the documentation page

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DOMAIN_ROW_SCHEDULE, PENDING_AUTOMATION_NOTE, PLANNED_AUTOMATION_NOTE};

/// Lifecycle marker embedded in a table display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainQualifier {
    Planned,
    Retired,
}

impl DomainQualifier {
    /// Suffix appended to the quoted display name.
    pub const fn marker(self) -> &'static str {
        match self {
            Self::Planned => " (planned)",
            Self::Retired => " (retired)",
        }
    }
}

/// Where a mapping entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntrySource {
    /// Read from the rendered table.
    Document,
    /// Appended by this process during the current run.
    Automation,
}

/// One domain known to the mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainEntry {
    pub sys_id: String,
    /// Clean display name, qualifier marker removed.
    pub name: String,
    pub qualifier: Option<DomainQualifier>,
    pub source: EntrySource,
}

impl DomainEntry {
    pub const fn is_planned(&self) -> bool {
        matches!(self.qualifier, Some(DomainQualifier::Planned))
    }
}

/// Domain identifier to display name lookup.
///
/// Table rows and automation additions share one namespace keyed by
/// `sys_id`. A row read from the document always wins; an automation entry
/// is only recorded for an identifier the table does not know yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainMapping {
    entries: BTreeMap<String, DomainEntry>,
}

impl DomainMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row read from the document, replacing automation entries.
    /// A second document row for the same id is ignored.
    pub fn insert_document(&mut self, entry: DomainEntry) -> bool {
        let entry = DomainEntry { source: EntrySource::Document, ..entry };
        match self.entries.get(&entry.sys_id) {
            Some(existing) if existing.source == EntrySource::Document => false,
            _ => {
                self.entries.insert(entry.sys_id.clone(), entry);
                true
            }
        }
    }

    /// Record an entry appended during this run. Returns `false` when the id
    /// is already known.
    pub fn record_automation(&mut self, entry: DomainEntry) -> bool {
        if self.entries.contains_key(&entry.sys_id) {
            return false;
        }
        let entry = DomainEntry { source: EntrySource::Automation, ..entry };
        self.entries.insert(entry.sys_id.clone(), entry);
        true
    }

    pub fn get(&self, sys_id: &str) -> Option<&DomainEntry> {
        self.entries.get(sys_id)
    }

    pub fn contains(&self, sys_id: &str) -> bool {
        self.entries.contains_key(sys_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainEntry> {
        self.entries.values()
    }
}

/// A cell of a domain table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableCell {
    /// Domain identifier.
    Identifier(String),
    /// Quoted display name with an optional lifecycle marker.
    QuotedName { name: String, qualifier: Option<DomainQualifier> },
    /// Free text.
    Text(String),
}

impl TableCell {
    /// Text shown in the cell, before markup escaping.
    pub fn display_text(&self) -> String {
        match self {
            Self::Identifier(id) => id.clone(),
            Self::QuotedName { name, qualifier } => {
                format!("\"{name}\"{}", qualifier.map(DomainQualifier::marker).unwrap_or_default())
            }
            Self::Text(text) => text.clone(),
        }
    }
}

/// Typed row appended to the domain table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRow {
    pub sys_id: String,
    pub name: String,
    pub qualifier: Option<DomainQualifier>,
    pub cells: Vec<TableCell>,
}

impl DomainRow {
    /// Standard four-cell row: identifier, quoted name, schedule, automation
    /// note.
    pub fn for_domain(
        sys_id: impl Into<String>,
        name: impl Into<String>,
        qualifier: Option<DomainQualifier>,
    ) -> Self {
        let sys_id = sys_id.into();
        let name = name.into();
        let note = if qualifier.is_some() { PLANNED_AUTOMATION_NOTE } else { PENDING_AUTOMATION_NOTE };
        let cells = vec![
            TableCell::Identifier(sys_id.clone()),
            TableCell::QuotedName { name: name.clone(), qualifier },
            TableCell::Text(DOMAIN_ROW_SCHEDULE.to_string()),
            TableCell::Text(note.to_string()),
        ];
        Self { sys_id, name, qualifier, cells }
    }

    /// Page version message recorded with the edit.
    pub fn version_message(&self) -> String {
        let suffix = match self.qualifier {
            Some(DomainQualifier::Planned) => " (planned - no Jira issues yet)",
            Some(DomainQualifier::Retired) => " (retired)",
            None => "",
        };
        format!("Added Business Domain: {}{suffix} (sys_id: {})", self.name, self.sys_id)
    }

    /// Mapping entry this row stands for once appended.
    pub fn to_entry(&self) -> DomainEntry {
        DomainEntry {
            sys_id: self.sys_id.clone(),
            name: self.name.clone(),
            qualifier: self.qualifier,
            source: EntrySource::Automation,
        }
    }
}
