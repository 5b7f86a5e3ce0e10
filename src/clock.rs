use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed-width RFC 3339 UTC with millisecond precision, so stored timestamps
/// order correctly as plain strings.
pub fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
