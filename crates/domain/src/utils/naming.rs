//! Name normalization rules
//!
//! Every name comparison in the reconciliation passes goes through these
//! helpers: matching is case-insensitive and whitespace-trimmed, nothing
//! fuzzier.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{MAX_SUMMARY_CHARS, RETIRED_PREFIX, RETIRED_PREFIX_SPACED, SUMMARY_SEPARATOR};
use crate::types::DomainQualifier;

#[allow(clippy::unwrap_used)]
static QUALIFIER_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\((planned|retired)\)").unwrap());

/// Lowercased, trimmed key used for every name lookup.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Trim a raw field value; blank values become `None`.
pub fn normalize_value(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Cut a string to at most `max` characters without splitting a code point.
pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Remove every leading `Retired-` / `Retired - ` prefix.
pub fn strip_retired_prefixes(label: &str) -> &str {
    let mut base = label;
    loop {
        if let Some(rest) = base.strip_prefix(RETIRED_PREFIX_SPACED) {
            base = rest.trim();
        } else if let Some(rest) = base.strip_prefix(RETIRED_PREFIX) {
            base = rest.trim();
        } else {
            return base;
        }
    }
}

/// Expected summary for an item given its current summary and whether the
/// service is retired.
///
/// The base label is recovered first, so feeding the output back in returns
/// the same string.
pub fn derive_retired_label(current: &str, retired: bool) -> String {
    let base = strip_retired_prefixes(current.trim()).trim();
    let label = if retired {
        truncate_chars(&format!("{RETIRED_PREFIX}{base}"), MAX_SUMMARY_CHARS)
    } else {
        truncate_chars(base, MAX_SUMMARY_CHARS)
    };
    label.trim_end().to_owned()
}

/// Key for the by-name index: the part of the summary before ` | `, without
/// retirement prefixes, lowercased.
pub fn name_index_key(summary: &str) -> Option<String> {
    let head = summary.split(SUMMARY_SEPARATOR).next().unwrap_or_default();
    let key = normalize_name(strip_retired_prefixes(head.trim()));
    (!key.is_empty()).then_some(key)
}

/// Clean a display name read from the domain table and report the
/// planned/retired marker it carried.
pub fn clean_domain_display(raw: &str) -> (String, Option<DomainQualifier>) {
    let unescaped = raw.trim().trim_matches('"').replace("\\/", "/");

    let qualifier = QUALIFIER_MARKER.captures(&unescaped).and_then(|caps| {
        match caps.get(1).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
            Some("planned") => Some(DomainQualifier::Planned),
            Some("retired") => Some(DomainQualifier::Retired),
            _ => None,
        }
    });

    let stripped = QUALIFIER_MARKER.replace_all(&unescaped, "");
    let cleaned = stripped.replace("\"\"", "\"").trim().trim_matches('"').trim().to_string();
    (cleaned, qualifier)
}
