//! Timestamps as they appear in stored records.
//!
//! Stored results may carry epoch milliseconds, a seconds/nanoseconds pair,
//! or an RFC 3339 date. All shapes normalize through [`Timestamp::to_datetime`].

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Milliseconds since the Unix epoch.
    Millis(i64),
    /// Seconds since the Unix epoch plus a nanosecond remainder.
    SecondsNanos { seconds: i64, nanoseconds: u32 },
    /// A native date-time.
    Native(DateTime<Utc>),
}

impl Timestamp {
    pub fn now() -> Self {
        Timestamp::Native(Utc::now())
    }

    /// Normalize to a canonical UTC instant.
    ///
    /// Out-of-range values clamp to the Unix epoch.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        match *self {
            Timestamp::Millis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .unwrap_or(DateTime::UNIX_EPOCH),
            Timestamp::SecondsNanos {
                seconds,
                nanoseconds,
            } => DateTime::from_timestamp(seconds, nanoseconds).unwrap_or(DateTime::UNIX_EPOCH),
            Timestamp::Native(dt) => dt,
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Timestamp::Native(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_shapes_normalize_to_same_instant() {
        let native = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let millis = Timestamp::Millis(native.timestamp_millis());
        let pair = Timestamp::SecondsNanos {
            seconds: native.timestamp(),
            nanoseconds: 0,
        };
        assert_eq!(millis.to_datetime(), native);
        assert_eq!(pair.to_datetime(), native);
        assert_eq!(Timestamp::Native(native).to_datetime(), native);
    }

    #[test]
    fn deserializes_each_shape() {
        let millis: Timestamp = serde_json::from_str("1700000000000").unwrap();
        assert!(matches!(millis, Timestamp::Millis(1_700_000_000_000)));

        let pair: Timestamp =
            serde_json::from_str(r#"{"seconds": 1700000000, "nanoseconds": 5}"#).unwrap();
        assert!(matches!(pair, Timestamp::SecondsNanos { .. }));

        let native: Timestamp = serde_json::from_str(r#""2025-01-01T00:00:00Z""#).unwrap();
        assert!(matches!(native, Timestamp::Native(_)));
    }

    #[test]
    fn mixed_shapes_compare_after_normalizing() {
        let earlier = Timestamp::Millis(1_000);
        let later = Timestamp::SecondsNanos {
            seconds: 2,
            nanoseconds: 0,
        };
        assert!(earlier.to_datetime() < later.to_datetime());
    }
}
