//! Operational status enumeration

use serde::{Deserialize, Serialize};

/// Closed enumeration over export status codes.
///
/// Codes outside the table resolve to [`OperationalStatus::Unmapped`] with the
/// original code kept, never to a default variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationalStatus {
    Operational,
    NonOperational,
    RepairInProgress,
    DrStandby,
    Ready,
    Retired,
    Planned,
    Unmapped(String),
}

impl OperationalStatus {
    /// Map a raw status code. Absent codes become `Unmapped("")`.
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(str::trim).unwrap_or_default() {
            "1" => Self::Operational,
            "2" => Self::NonOperational,
            "3" => Self::RepairInProgress,
            "4" => Self::DrStandby,
            "5" => Self::Ready,
            "6" => Self::Retired,
            "20" => Self::Planned,
            other => Self::Unmapped(other.to_string()),
        }
    }

    /// Numeric code as written in the export.
    pub fn code(&self) -> &str {
        match self {
            Self::Operational => "1",
            Self::NonOperational => "2",
            Self::RepairInProgress => "3",
            Self::DrStandby => "4",
            Self::Ready => "5",
            Self::Retired => "6",
            Self::Planned => "20",
            Self::Unmapped(code) => code,
        }
    }

    /// Select-field label stored on tracked items, e.g. `Retired (6)`.
    ///
    /// `None` for unmapped codes: such a status never overwrites the field.
    pub fn field_label(&self) -> Option<String> {
        let name = match self {
            Self::Operational => "Operational",
            Self::NonOperational => "Non-Operational",
            Self::RepairInProgress => "Repair in Progress",
            Self::DrStandby => "DR Standby",
            Self::Ready => "Ready",
            Self::Retired => "Retired",
            Self::Planned => "Planned",
            Self::Unmapped(_) => return None,
        };
        Some(format!("{name} ({})", self.code()))
    }

    pub const fn is_retired(&self) -> bool {
        matches!(self, Self::Retired)
    }

    pub const fn is_planned(&self) -> bool {
        matches!(self, Self::Planned)
    }

    /// True when a code was present but is not in the table.
    pub fn is_unknown_code(&self) -> bool {
        matches!(self, Self::Unmapped(code) if !code.is_empty())
    }
}

/// Partition used by the domain table maintenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainLifecycle {
    /// Status 1, empty or absent.
    Active,
    /// Status 20.
    Planned,
    /// Status 6.
    Retired,
    /// Any other status; such domains are left alone.
    Other,
}

impl From<&OperationalStatus> for DomainLifecycle {
    fn from(status: &OperationalStatus) -> Self {
        match status {
            OperationalStatus::Operational => Self::Active,
            OperationalStatus::Unmapped(code) if code.is_empty() => Self::Active,
            OperationalStatus::Planned => Self::Planned,
            OperationalStatus::Retired => Self::Retired,
            _ => Self::Other,
        }
    }
}
