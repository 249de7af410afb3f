//! Session timer formatting

use chrono::{DateTime, Utc};

pub const ZERO_ELAPSED: &str = "00:00";

/// Zero-padded `mm:ss`. Minutes keep counting past 59.
pub fn format_elapsed(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Elapsed time between `start` and `now`; clock skew clamps to zero
pub fn elapsed_between(start: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_elapsed((now - start).num_seconds())
}
