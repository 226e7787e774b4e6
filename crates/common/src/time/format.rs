//! Human-readable duration formatting
//!
//! Phase summaries report elapsed time with tenth-of-a-second precision.

use std::time::Duration;

/// Format a duration for run summaries
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "foundation")]
/// # {
/// use std::time::Duration;
///
/// use cmdbsync_common::time::format::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(5_260)), "5.3s");
/// assert_eq!(format_duration(Duration::from_secs(65)), "1m 5.0s");
/// assert_eq!(format_duration(Duration::from_secs(3665)), "1h 1m 5.0s");
/// # }
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs_f64();
    if total < 60.0 {
        return format!("{total:.1}s");
    }

    let whole = duration.as_secs();
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let seconds = total - (hours * 3600 + minutes * 60) as f64;

    if hours == 0 {
        format!("{minutes}m {seconds:.1}s")
    } else {
        format!("{hours}h {minutes}m {seconds:.1}s")
    }
}
