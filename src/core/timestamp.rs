//! Timestamp rendering for human-readable sinks
//!
//! Structured sinks carry `{seconds, nanos}`; this module only serves text lines.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Timestamp layout of a formatted log line
///
/// # Examples
///
/// ```
/// use rust_sink_logging::TimestampFormat;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
/// assert_eq!(TimestampFormat::Iso8601.format(&at), "2025-01-08T10:30:45.000Z");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// Local time, `2025.01.08 10:30:45.123`
    #[default]
    Local,

    /// UTC, `2025-01-08T10:30:45.123Z`
    Iso8601,

    /// Milliseconds since the Unix epoch
    UnixMillis,

    /// strftime pattern rendered in local time
    Custom(String),
}

const LOCAL_PATTERN: &str = "%Y.%m.%d %H:%M:%S%.3f";

impl TimestampFormat {
    #[must_use]
    pub fn format(&self, timestamp: &DateTime<Utc>) -> String {
        let mut out = String::with_capacity(32);
        self.write_to(&mut out, timestamp);
        out
    }

    /// Append the rendered timestamp to `out`.
    pub fn write_to(&self, out: &mut String, timestamp: &DateTime<Utc>) {
        let _ = match self {
            TimestampFormat::Local => {
                write!(out, "{}", timestamp.with_timezone(&Local).format(LOCAL_PATTERN))
            }
            TimestampFormat::Iso8601 => {
                write!(out, "{}", timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"))
            }
            TimestampFormat::UnixMillis => write!(out, "{}", timestamp.timestamp_millis()),
            TimestampFormat::Custom(pattern) => {
                write!(out, "{}", timestamp.with_timezone(&Local).format(pattern))
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn fixed_datetime() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45)
            .single()
            .expect("valid datetime")
            + chrono::Duration::milliseconds(123)
    }

    #[test]
    fn test_iso8601_format() {
        assert_eq!(
            TimestampFormat::Iso8601.format(&fixed_datetime()),
            "2025-01-08T10:30:45.123Z"
        );
    }

    #[test]
    fn test_local_format_matches_local_clock() {
        let at = fixed_datetime();
        let expected = at.with_timezone(&Local).format("%Y.%m.%d %H:%M:%S%.3f").to_string();
        let result = TimestampFormat::Local.format(&at);
        assert_eq!(result, expected);
        assert!(result.ends_with(".123"));
    }

    #[test]
    fn test_unix_millis_format() {
        let result = TimestampFormat::UnixMillis.format(&fixed_datetime());
        assert_eq!(result, "1736332245123");
    }

    #[test]
    fn test_custom_format_uses_local_date() {
        let at = fixed_datetime();
        let local_date: NaiveDate = at.with_timezone(&Local).date_naive();
        let result = TimestampFormat::Custom("%Y-%m-%d".to_string()).format(&at);
        assert_eq!(result, local_date.format("%Y-%m-%d").to_string());
    }

    #[test]
    fn test_write_to_appends() {
        let mut out = String::from("at ");
        TimestampFormat::UnixMillis.write_to(&mut out, &fixed_datetime());
        assert_eq!(out, "at 1736332245123");
    }

    #[test]
    fn test_serialization_round_trip() {
        let json = serde_json::to_string(&TimestampFormat::Custom("%H".into())).unwrap();
        let back: TimestampFormat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TimestampFormat::Custom("%H".into()));
    }
}
