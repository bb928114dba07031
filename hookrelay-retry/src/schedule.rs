//! The seven-tier retry schedule and the store key formats.
//!
//! Tiers are indexed 2 through 8. The schedule is keyed by the attempt
//! counter *after* increment: the attempt that just failed decides how long
//! the event waits before the next one. Values outside the table fall back
//! to the first row.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// How long a parked event's hash survives after its last write.
pub const RECORD_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// `(tier index, interval label)` for each tier in drain order.
const TIERS: [(i32, &str); 7] = [
    (2, "4m"),
    (3, "10m"),
    (4, "10m"),
    (5, "1h"),
    (6, "2h"),
    (7, "6h"),
    (8, "15h"),
];

/// Wait interval and label for the attempt counter after increment.
pub fn backoff(attempts: i32) -> (Duration, &'static str) {
    match attempts {
        1 => (Duration::from_secs(4 * 60), "4m"),
        2 | 3 => (Duration::from_secs(10 * 60), "10m"),
        4 => (Duration::from_secs(60 * 60), "1h"),
        5 => (Duration::from_secs(2 * 60 * 60), "2h"),
        6 => (Duration::from_secs(6 * 60 * 60), "6h"),
        7 => (Duration::from_secs(15 * 60 * 60), "15h"),
        _ => (Duration::from_secs(4 * 60), "4m"),
    }
}

/// The next attempt's deadline (Unix seconds) and interval label.
pub fn next_time(attempts: i32) -> (i64, &'static str) {
    let (wait, label) = backoff(attempts);
    (unix_now() + wait.as_secs() as i64, label)
}

/// The list key of one retry tier.
pub fn list_key(topic: &str, tier: i32, label: &str) -> String {
    format!("{topic}-list-attempts-{tier}-{label}")
}

/// The hash key of one parked event.
pub fn hash_key(topic: &str, offset: i64) -> String {
    format!("{topic}-hash-offset-{offset}")
}

/// All seven tier list keys, lowest tier first.
pub fn tier_lists(topic: &str) -> Vec<String> {
    TIERS
        .iter()
        .map(|(tier, label)| list_key(topic, *tier, label))
        .collect()
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
