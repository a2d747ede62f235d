//! Wire timestamp formatting

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp the way it is emitted on the wire:
/// RFC 3339, UTC, whole seconds, `Z` offset (`2024-01-01T00:00:00Z`).
pub fn format_wire_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a device-reported timestamp. Any RFC 3339 offset is accepted and
/// normalized to UTC.
pub fn parse_wire_time(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|at| at.with_timezone(&Utc))
}
