//! Reconciliation services
//!
//! One service per sub-problem. Each loads the current remote state through
//! the reader, builds the target, diffs, and hands the operations to the
//! shared [`OperationApplier`](crate::applier::OperationApplier).

pub mod cascade;
pub mod domains;
pub mod option_ids;
pub mod services;

pub use cascade::CascadeReconciler;
pub use domains::DomainReconciler;
pub use option_ids::OptionIdReconciler;
pub use services::ServiceReconciler;

use cmdbsync_domain::constants::{OPTION_PAGE_SIZE, RETIRED_STATUS_LABEL};
use cmdbsync_domain::{CurrentTree, JiraSettings, Result, TrackedItem};
use tracing::warn;

use crate::reader::{fetch_all, PageCursor};
use crate::tracker_ports::{IssueTracker, ItemQuery, OptionStore};

fn project_clause(jira: &JiraSettings) -> String {
    format!("project = {} AND issuetype = \"{}\"", jira.project_key, jira.issue_type)
}

fn excluded_clause(excluded_keys: &[String]) -> String {
    if excluded_keys.is_empty() {
        String::new()
    } else {
        format!(" AND key NOT IN ({})", excluded_keys.join(", "))
    }
}

/// Every service item except the fixture keys.
pub fn service_population_jql(jira: &JiraSettings, excluded_keys: &[String]) -> String {
    format!("{}{}", project_clause(jira), excluded_clause(excluded_keys))
}

/// Items that reference a domain but do not name it yet.
pub fn domain_backfill_jql(
    jira: &JiraSettings,
    domain_id_field: &str,
    domain_field: &str,
    excluded_keys: &[String],
) -> String {
    format!(
        "{} AND \"{domain_id_field}\" IS NOT EMPTY AND \"{domain_field}\" IS EMPTY{}",
        project_clause(jira),
        excluded_clause(excluded_keys)
    )
}

/// Service items that are not retired.
pub fn option_id_backfill_jql(jira: &JiraSettings, status_field: &str) -> String {
    format!(
        "{} AND (\"{status_field}\" != \"{RETIRED_STATUS_LABEL}\" OR \"{status_field}\" IS EMPTY)",
        project_clause(jira)
    )
}

/// Every item matching the query. An interrupted listing is an error.
pub(crate) async fn load_items(
    tracker: &dyn IssueTracker,
    label: &str,
    query: &ItemQuery,
) -> Result<Vec<TrackedItem>> {
    fetch_all(label, PageCursor::first_token(), |cursor| async move {
        tracker.search_page(query, &cursor).await
    })
    .await
    .into_complete()
}

/// The full option tree of the cascading field.
pub(crate) async fn load_option_tree(options: &dyn OptionStore) -> Result<CurrentTree> {
    let listing = fetch_all("cascade options", PageCursor::first_offset(OPTION_PAGE_SIZE), |cursor| async move {
        options.list_page(&cursor).await
    })
    .await
    .into_complete()?;

    let tree = CurrentTree::from_options(listing);
    for orphan in &tree.orphans {
        warn!(option_id = %orphan.id, value = %orphan.value, "child option references an unknown parent");
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jira() -> JiraSettings {
        JiraSettings {
            project_key: "AMI".into(),
            issue_type: "Business Service".into(),
            reporter_account_id: None,
        }
    }

    #[test]
    fn population_query_excludes_fixture_keys() {
        let keys = vec!["AMI-1".to_string(), "AMI-2".to_string()];
        assert_eq!(
            service_population_jql(&jira(), &keys),
            "project = AMI AND issuetype = \"Business Service\" AND key NOT IN (AMI-1, AMI-2)"
        );
        assert_eq!(
            service_population_jql(&jira(), &[]),
            "project = AMI AND issuetype = \"Business Service\""
        );
    }

    #[test]
    fn backfill_queries_name_their_fields() {
        let jql = domain_backfill_jql(&jira(), "cf_id", "cf_name", &["AMI-9".to_string()]);
        assert!(jql.contains("\"cf_id\" IS NOT EMPTY AND \"cf_name\" IS EMPTY AND key NOT IN (AMI-9)"));

        let jql = option_id_backfill_jql(&jira(), "cf_status");
        assert!(jql.ends_with("(\"cf_status\" != \"Retired (6)\" OR \"cf_status\" IS EMPTY)"));
    }
}
