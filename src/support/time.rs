//! Timestamp helpers shared by every outbound payload

use chrono::{DateTime, SecondsFormat, Utc};

/// Current time in UTC.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// RFC 3339 with millisecond precision, e.g. `2024-01-01T12:00:00.000Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `format_timestamp(now())`
pub fn timestamp() -> String {
    format_timestamp(now())
}
