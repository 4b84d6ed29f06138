//! Timestamp helpers.

use chrono::{DateTime, Utc};

/// Nanoseconds since the UNIX epoch.
pub type UnixNanos = u64;

const NANOS_PER_MILLI: u64 = 1_000_000;

/// Returns the current wall clock time in nanoseconds.
#[must_use]
pub fn now_nanos() -> UnixNanos {
    Utc::now()
        .timestamp_nanos_opt()
        .map_or(0, |n| u64::try_from(n).unwrap_or(0))
}

/// Converts venue milliseconds to nanoseconds.
#[inline]
#[must_use]
pub const fn millis_to_nanos(millis: u64) -> UnixNanos {
    millis.saturating_mul(NANOS_PER_MILLI)
}

/// Converts a UTC timestamp to epoch milliseconds as used on the wire.
#[inline]
#[must_use]
pub fn datetime_to_millis(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}
