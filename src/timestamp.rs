//! Construction timestamps.

use std::{
    fmt,
    sync::atomic::{AtomicI64, Ordering},
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

static LAST_MILLIS: AtomicI64 = AtomicI64::new(i64::MIN);

/// A UTC instant with millisecond precision.
///
/// Displays as ISO-8601, e.g. `2024-05-01T09:30:00.125Z`. Instants taken with
/// [`Timestamp::now`] never go backwards within a process, even if the system
/// clock does.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current instant, clamped to be no earlier than any
    /// previously returned one.
    pub fn now() -> Self {
        let now = Utc::now();
        let millis = now.timestamp_millis();
        let latest = LAST_MILLIS.fetch_max(millis, Ordering::AcqRel).max(millis);
        Self(DateTime::from_timestamp_millis(latest).unwrap_or(now))
    }

    /// Returns the instant as a [`chrono`] date-time.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_8601_format() {
        let datetime = DateTime::parse_from_rfc3339("2024-05-01T09:30:00.125+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            Timestamp::from(datetime).to_string(),
            "2024-05-01T09:30:00.125Z"
        );
    }

    #[test]
    fn test_now_round_trips_through_rfc3339() {
        let now = Timestamp::now();
        let parsed = DateTime::parse_from_rfc3339(&now.to_string()).unwrap();
        assert_eq!(parsed.with_timezone(&Utc), now.as_datetime());
    }

    #[test]
    fn test_now_is_non_decreasing() {
        let mut previous = Timestamp::now();
        for _ in 0..1000 {
            let next = Timestamp::now();
            assert!(next >= previous);
            previous = next;
        }
    }

    #[test]
    fn test_serializes_as_string() {
        let datetime = DateTime::from_timestamp_millis(0).unwrap();
        let json = serde_json::to_string(&Timestamp::from(datetime)).unwrap();
        assert_eq!(json, r#""1970-01-01T00:00:00.000Z""#);
    }
}
