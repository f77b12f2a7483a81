//! UTC timestamp formatting helpers
//!
//! All subscriber-visible timestamps use ISO-8601 with millisecond precision
//! and a `Z` suffix, e.g. `2024-03-01T12:00:00.250Z`.

use chrono::{DateTime, Utc};

/// Format a UTC timestamp as ISO-8601 with millisecond precision.
pub fn format_timestamp_ms(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Current UTC time in the subscriber-visible timestamp format.
pub fn utc_now_iso() -> String {
    format_timestamp_ms(Utc::now())
}
