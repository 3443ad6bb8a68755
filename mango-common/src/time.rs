//! Timestamp conversion for record dates

use chrono::{DateTime, TimeZone, Utc};

/// Convert a unix timestamp in seconds to UTC, clamping out-of-range values to the epoch
pub fn from_unix_seconds(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
