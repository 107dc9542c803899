//! Compact human-readable durations for chat listings.

use chrono::TimeDelta;

use crate::time::duration::{DAY_SECS, HOUR_SECS, MINUTE_SECS};

/// Formats a number of seconds as `<N>d <N>h <N>m <N>s`.
///
/// Zero components are omitted, so an exact hour is `"1h"` and zero seconds
/// is the empty string.
///
/// # Examples
///
/// ```
/// # use tazdingo::time::format_duration;
/// assert_eq!(format_duration(90_061), "1d 1h 1m 1s");
/// assert_eq!(format_duration(3_600), "1h");
/// ```
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / DAY_SECS;
    let hours = seconds % DAY_SECS / HOUR_SECS;
    let minutes = seconds % HOUR_SECS / MINUTE_SECS;
    let secs = seconds % MINUTE_SECS;

    [(days, 'd'), (hours, 'h'), (minutes, 'm'), (secs, 's')]
        .iter()
        .filter(|(value, _)| *value != 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect::<Vec<String>>()
        .join(" ")
}

/// Formats a remaining time, clamping negative deltas to zero.
///
/// Sub-second precision is dropped.
pub fn format_remaining(remaining: TimeDelta) -> String {
    format_duration(u64::try_from(remaining.num_seconds()).unwrap_or(0))
}
