//! Application constants
//!
//! Centralized location for the domain-level constants used by the
//! reconciliation passes.

// Labels and markers
pub const VERIFICATION_LABEL: &str = "business-service-verified";
pub const EXCLUDED_NAME: &str = "All";
pub const SUMMARY_SEPARATOR: &str = " | ";
pub const RETIRED_PREFIX: &str = "Retired-";
pub const RETIRED_PREFIX_SPACED: &str = "Retired - ";
pub const MAX_SUMMARY_CHARS: usize = 255;

// Fixture issues that never take part in a sync
pub const DEFAULT_EXCLUDED_ISSUE_KEYS: [&str; 3] = ["AMI-4925", "AMI-4926", "AMI-4927"];

// Rate budget
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_SECS: u64 = 10;
pub const DEFAULT_MAX_WORKERS: usize = 5;
pub const DEFAULT_LABEL_REMOVAL_DELAY_MS: u64 = 100;

// Paging
pub const SEARCH_PAGE_SIZE: u32 = 100;
pub const OPTION_PAGE_SIZE: u32 = 100;

// Domain mapping cache
pub const DEFAULT_DOMAIN_CACHE_TTL_SECS: u64 = 300;

// Custom field fallbacks
pub const DEFAULT_OPTION_ID_FIELD: &str = "customfield_12822";
pub const DEFAULT_DOMAIN_NAME_FIELD: &str = "customfield_10591";

// Comment templates
pub const UPDATED_COMMENT_PREFIX: &str = "Business service info updated on";
pub const CREATED_COMMENT_PREFIX: &str = "Business service info created on";

// Domain table rows
pub const DOMAIN_ROW_SCHEDULE: &str = "Monthly on day 1 at 6:00 AM";
pub const PLANNED_AUTOMATION_NOTE: &str = "⏸️ Planned (no automation needed yet)";
pub const PENDING_AUTOMATION_NOTE: &str = "⚠️ TODO: Create automation rule";

// Status label used by the option-id backfill query
pub const RETIRED_STATUS_LABEL: &str = "Retired (6)";
