//! Timestamp utilities
//!
//! All stored timestamps are RFC 3339 strings in UTC with microsecond precision.

use crate::{Error, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Get current UTC timestamp, truncated to the stored precision
pub fn now() -> DateTime<Utc> {
    truncate(Utc::now())
}

/// Next modification stamp for a row last touched at `previous`
///
/// Always strictly later than `previous`, even when the wall clock has not
/// moved (or moved backwards) since the previous touch.
pub fn advance(previous: DateTime<Utc>) -> DateTime<Utc> {
    let current = now();
    if current > previous {
        current
    } else {
        truncate(previous) + Duration::microseconds(1)
    }
}

/// Format a timestamp for storage
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp
pub fn from_db(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp '{}': {}", value, e)))
}

fn truncate(ts: DateTime<Utc>) -> DateTime<Utc> {
    let micros = ts.timestamp_micros();
    DateTime::from_timestamp_micros(micros).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_advance_is_strictly_later() {
        let future = now() + Duration::seconds(60);
        let next = advance(future);
        assert!(next > future);
        assert_eq!(next - future, Duration::microseconds(1));
    }

    #[test]
    fn test_advance_uses_clock_when_ahead() {
        let past = now() - Duration::seconds(60);
        let next = advance(past);
        assert!(next - past >= Duration::seconds(59));
    }

    #[test]
    fn test_db_round_trip_keeps_micros() {
        let ts = now();
        let parsed = from_db(&to_db(&ts)).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_from_db_rejects_garbage() {
        assert!(from_db("yesterday").is_err());
    }
}
