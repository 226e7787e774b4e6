//! Configuration structures
//!
//! Settings come from a JSON or TOML file; credentials and the run mode come
//! from the environment. Loading lives in the infra crate.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DOMAIN_CACHE_TTL_SECS, DEFAULT_DOMAIN_NAME_FIELD, DEFAULT_EXCLUDED_ISSUE_KEYS,
    DEFAULT_LABEL_REMOVAL_DELAY_MS, DEFAULT_MAX_RETRIES, DEFAULT_MAX_WORKERS,
    DEFAULT_OPTION_ID_FIELD, DEFAULT_REQUEST_DELAY_MS, DEFAULT_RETRY_BASE_DELAY_SECS,
};
use crate::errors::{Result, SyncError};
use crate::impl_domain_status_conversions;

/// Logical custom field names used as keys of [`CustomFieldMap`].
pub mod fields {
    pub const BUSINESS_SERVICE_ID: &str = "business_service_id";
    pub const BUSINESS_DOMAIN_ID: &str = "business_domain_id";
    pub const BUSINESS_DOMAIN: &str = "business_domain";
    pub const BUSINESS_SERVICE_NAME: &str = "business_service_name";
    pub const BUSINESS_SERVICE_SHORT_NAME: &str = "business_service_short_name";
    pub const BUSINESS_SERVICE_STATUS: &str = "business_service_status";
    pub const BUSINESS_SERVICE_USAGE: &str = "business_service_usage";
    pub const BUSINESS_SERVICE_CLASSIFICATION: &str = "business_service_classification";
    pub const BUSINESS_SERVICE_OPTION_ID: &str = "business_service_option_id";

    /// Names that must be mapped in every configuration.
    pub const REQUIRED: [&str; 7] = [
        BUSINESS_SERVICE_ID,
        BUSINESS_DOMAIN_ID,
        BUSINESS_SERVICE_NAME,
        BUSINESS_SERVICE_SHORT_NAME,
        BUSINESS_SERVICE_STATUS,
        BUSINESS_SERVICE_USAGE,
        BUSINESS_SERVICE_CLASSIFICATION,
    ];
}

/// Issue tracker project settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraSettings {
    pub project_key: String,
    pub issue_type: String,
    /// Mandatory reporter: an account id, or an email resolved at run time.
    #[serde(default)]
    pub reporter_account_id: Option<String>,
}

/// Logical field name to platform field id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomFieldMap(BTreeMap<String, String>);

impl CustomFieldMap {
    pub fn new(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// Field id for a logical name, with the built-in fallbacks for the
    /// option-id and domain-name fields.
    pub fn get(&self, logical: &str) -> Option<&str> {
        self.0.get(logical).map(String::as_str).or(match logical {
            fields::BUSINESS_SERVICE_OPTION_ID => Some(DEFAULT_OPTION_ID_FIELD),
            fields::BUSINESS_DOMAIN => Some(DEFAULT_DOMAIN_NAME_FIELD),
            _ => None,
        })
    }

    /// Field id for a logical name that must be configured.
    pub fn require(&self, logical: &str) -> Result<&str> {
        self.get(logical).ok_or_else(|| {
            SyncError::Config(format!("custom_fields.{logical} is not configured"))
        })
    }
}

/// Documentation page holding the domain table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfluenceSettings {
    pub page_id: String,
    pub table_id: String,
    #[serde(default)]
    pub auto_update_table: bool,
}

/// Cascading select field and its context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeFieldSettings {
    pub bus_domain_and_service: String,
    pub context_id: String,
}

/// Rate budget tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub request_delay_ms: u64,
    /// Total attempts for a rate-limited write.
    pub max_retries: u32,
    pub retry_base_delay_secs: u64,
    /// Parsed and logged; passes run sequentially.
    pub max_workers: usize,
    pub label_removal_delay_ms: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_secs: DEFAULT_RETRY_BASE_DELAY_SECS,
            max_workers: DEFAULT_MAX_WORKERS,
            label_removal_delay_ms: DEFAULT_LABEL_REMOVAL_DELAY_MS,
        }
    }
}

/// Export files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub services_file: PathBuf,
    pub domains_file: PathBuf,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            services_file: PathBuf::from("cmdb_ci_service.json"),
            domains_file: PathBuf::from("u_cmdb_ci_business_domain.json"),
        }
    }
}

/// Report, ledger and log locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub csv_report: PathBuf,
    pub error_ledger: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            csv_report: PathBuf::from("sync_report.csv"),
            error_ledger: PathBuf::from("sync_errors.jsonl"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

fn default_excluded_keys() -> Vec<String> {
    DEFAULT_EXCLUDED_ISSUE_KEYS.iter().map(|k| (*k).to_string()).collect()
}

const fn default_cache_ttl() -> u64 {
    DEFAULT_DOMAIN_CACHE_TTL_SECS
}

/// Settings file contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    pub jira: JiraSettings,
    pub custom_fields: CustomFieldMap,
    #[serde(default)]
    pub confluence: Option<ConfluenceSettings>,
    pub dropdown_cascading_field: CascadeFieldSettings,
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub inputs: InputSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default = "default_excluded_keys")]
    pub excluded_issue_keys: Vec<String>,
    #[serde(default = "default_cache_ttl")]
    pub domain_cache_ttl_secs: u64,
}

impl SyncSettings {
    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.jira.project_key.trim().is_empty() {
            return Err(SyncError::Config("jira.project_key is empty".into()));
        }
        if self.jira.issue_type.trim().is_empty() {
            return Err(SyncError::Config("jira.issue_type is empty".into()));
        }
        for logical in fields::REQUIRED {
            self.custom_fields.require(logical)?;
        }
        if self.rate_limit.max_retries == 0 {
            return Err(SyncError::Config("rate_limit.max_retries must be at least 1".into()));
        }
        Ok(())
    }

    /// Domain table settings, required by the domain phase.
    pub fn confluence(&self) -> Result<&ConfluenceSettings> {
        self.confluence
            .as_ref()
            .ok_or_else(|| SyncError::Config("confluence section is not configured".into()))
    }
}

/// Basic-auth credentials shared by both REST surfaces.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Simulate or apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunMode {
    Simulate,
    Apply,
}

impl_domain_status_conversions!(RunMode {
    Simulate => "simulate",
    Apply => "apply",
});

impl RunMode {
    pub const fn is_simulate(self) -> bool {
        matches!(self, Self::Simulate)
    }

    /// Mode column of the cascade change report.
    pub const fn report_label(self) -> &'static str {
        match self {
            Self::Simulate => "diagnostic",
            Self::Apply => "apply",
        }
    }
}

/// Fully loaded configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub settings: SyncSettings,
    pub credentials: Credentials,
    pub mode: RunMode,
}
