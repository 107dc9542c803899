//! Free-text duration parsing.
//!
//! Users type shield durations the way they would say them in chat: `1d 2h`,
//! `30 minutes`, `2H`, or just `10`. This module turns that text into a number
//! of seconds.
//!
//! # Grammar
//!
//! Two grammars are tried in order:
//!
//! 1. **Complex**: up to four `<int><unit>` fields, always in the order days,
//!    hours, minutes, seconds. Units are case-insensitive:
//!    - days: `d`, `day`, `days`
//!    - hours: `h`, `hour`, `hours`
//!    - minutes: `m`, `min`, `mins`, `minute`, `minutes`
//!    - seconds: `s`, `sec`, `secs`, `second`, `seconds`
//!
//!    Whitespace is allowed around numbers, between fields and around the
//!    whole expression. The entire string must match and at least one field
//!    must be present.
//! 2. **Simple**: the whole string is a bare integer, read as a number of
//!    **hours**.
//!
//! Fields out of order (`1h 1d`) are rejected rather than reordered.

use std::sync::LazyLock;

use log::debug;
use regex::{Captures, Regex};

/// Seconds in a day.
pub const DAY_SECS: u64 = 86_400;
/// Seconds in an hour.
pub const HOUR_SECS: u64 = 3_600;
/// Seconds in a minute.
pub const MINUTE_SECS: u64 = 60;

static COMPLEX_DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?P<days>\d+)\s*(?:days|day|d))?\s*(?:(?P<hours>\d+)\s*(?:hours|hour|h))?\s*(?:(?P<minutes>\d+)\s*(?:minutes|minute|mins|min|m))?\s*(?:(?P<seconds>\d+)\s*(?:seconds|second|secs|sec|s))?\s*$",
    )
    .expect("complex duration regex is valid")
});

static SIMPLE_DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<hours>\d+)$").expect("simple duration regex is valid"));

/// Parses a free-text duration into a number of seconds.
///
/// Returns `None` when the text matches neither grammar, when it is empty,
/// or when the total does not fit in a `u64`. A parsed zero (`"0h"`) is a
/// valid `Some(0)`.
///
/// # Examples
///
/// ```
/// # use tazdingo::time::parse_duration;
/// assert_eq!(parse_duration("1d 2h"), Some(93_600));
/// assert_eq!(parse_duration("10"), Some(36_000));
/// assert_eq!(parse_duration("1s 1h"), None);
/// ```
pub fn parse_duration(text: &str) -> Option<u64> {
    if text.is_empty() {
        return None;
    }

    if let Some(captures) = COMPLEX_DURATION_RE.captures(text)
        && let Some(seconds) = complex_total(&captures)
    {
        debug!("parsed duration '{}' as {} seconds", text, seconds);
        return Some(seconds);
    }

    let captures = SIMPLE_DURATION_RE.captures(text)?;
    let seconds = field(&captures, "hours")?.checked_mul(HOUR_SECS)?;
    debug!("parsed bare duration '{}' as {} seconds", text, seconds);

    Some(seconds)
}

/// Sums the fields of a complex match.
///
/// Returns `None` if no field was captured (whitespace-only input matches the
/// regex with every group empty) or on overflow.
fn complex_total(captures: &Captures) -> Option<u64> {
    let fields = [
        ("days", DAY_SECS),
        ("hours", HOUR_SECS),
        ("minutes", MINUTE_SECS),
        ("seconds", 1),
    ];

    if fields.iter().all(|(name, _)| captures.name(name).is_none()) {
        return None;
    }

    fields.iter().try_fold(0u64, |total, (name, unit)| {
        let value = match captures.name(name) {
            Some(_) => field(captures, name)?,
            None => 0,
        };
        total.checked_add(value.checked_mul(*unit)?)
    })
}

fn field(captures: &Captures, name: &str) -> Option<u64> {
    captures.name(name)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_days() {
        let inputs = ["1d", "2D", "10day", "11days", "1 d", "2 D", "10 day", "11 days"];
        let expected = [86400, 172800, 864000, 950400, 86400, 172800, 864000, 950400];
        for (input, seconds) in inputs.iter().zip(expected) {
            assert_eq!(parse_duration(input), Some(seconds), "input {input:?}");
        }
    }

    #[test]
    fn test_parse_hours() {
        let inputs = ["1h", "2H", "10hour", "11hours", "1 h", "2 H", "10 hour", "11 hours"];
        let expected = [3600, 7200, 36000, 39600, 3600, 7200, 36000, 39600];
        for (input, seconds) in inputs.iter().zip(expected) {
            assert_eq!(parse_duration(input), Some(seconds), "input {input:?}");
        }
    }

    #[test]
    fn test_parse_minutes() {
        let inputs = ["1m", "2M", "10mins", "11minutes", "1 m", "2 M", "10 min", "11 minute"];
        let expected = [60, 120, 600, 660, 60, 120, 600, 660];
        for (input, seconds) in inputs.iter().zip(expected) {
            assert_eq!(parse_duration(input), Some(seconds), "input {input:?}");
        }
    }

    #[test]
    fn test_parse_seconds() {
        let inputs = ["1s", "2S", "10secs", "11seconds", "1 s", "2 S", "10 sec", "11 second"];
        let expected = [1, 2, 10, 11, 1, 2, 10, 11];
        for (input, seconds) in inputs.iter().zip(expected) {
            assert_eq!(parse_duration(input), Some(seconds), "input {input:?}");
        }
    }

    #[test]
    fn test_parse_complex() {
        assert_eq!(parse_duration("1d 1h"), Some(90000));
        assert_eq!(parse_duration("1h 1s"), Some(3601));
        assert_eq!(parse_duration("1h1s"), Some(3601));
        assert_eq!(parse_duration("1d 2h 3m 4s"), Some(93784));
        assert_eq!(parse_duration("  2 Days 30 MINS  "), Some(174600));
    }

    #[test]
    fn test_parse_simple_is_hours() {
        assert_eq!(parse_duration("1"), Some(3600));
        assert_eq!(parse_duration("10"), Some(36000));
        assert_eq!(parse_duration("0"), Some(0));
    }

    #[test]
    fn test_parse_invalid() {
        for input in ["", "   ", "asd", "1d 1", "1x", "1s 1h", "1h 1d", "h", "-1h", "1.5h"] {
            assert_eq!(parse_duration(input), None, "input {input:?}");
        }
    }

    #[test]
    fn test_parse_overflow_is_none() {
        assert_eq!(parse_duration("99999999999999999999d"), None);
        assert_eq!(parse_duration("18446744073709551615d"), None);
        assert_eq!(parse_duration("18446744073709551615"), None);
    }
}
