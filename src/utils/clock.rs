//! Wall-clock timestamps for data points
//!
//! Points are keyed by wall-clock microseconds. When the clock has not moved
//! past the last timestamp issued for a dataset, the next one is bumped by a
//! single microsecond so keys stay unique and strictly increasing.

use chrono::Utc;

const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Current wall-clock time in microseconds since the Unix epoch
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

/// Next timestamp for a dataset whose last issued timestamp is `last`
pub fn next_after(last: Option<i64>, now: i64) -> i64 {
    match last {
        Some(last) if now <= last => last + 1,
        _ => now,
    }
}

/// Microseconds to the float seconds exposed to clients
pub fn micros_to_secs(micros: i64) -> f64 {
    micros as f64 / MICROS_PER_SECOND
}

/// Float seconds back to microseconds (exact for values produced by `micros_to_secs`)
pub fn secs_to_micros(secs: f64) -> i64 {
    (secs * MICROS_PER_SECOND).round() as i64
}
