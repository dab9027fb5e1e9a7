//! Duration parsing and formatting
//!
//! Durations are typed as `<days>d<hours>h<minutes>m`, each unit optional
//! but in that order (`1d`, `2h30m`, `1d2h30m`).

use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?$").unwrap());

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Longest phase accepted: one year
pub const MAX_DURATION: Duration = Duration::from_millis(365 * MS_PER_DAY);

/// Duration parse failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    #[error("`{0}` does not match the duration format")]
    Malformed(String),

    #[error("duration must be greater than zero")]
    Zero,

    #[error("duration is too large (at most 365d)")]
    Overflow,
}

/// Parse a human duration such as `1d2h30m`.
///
/// Anything longer than [`MAX_DURATION`] is rejected as an overflow.
/// An input with every unit absent (including the empty string) parses to
/// zero, which is rejected: a phase can never be zero-length.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let input = input.trim();
    let caps = DURATION_RE
        .captures(input)
        .ok_or_else(|| DurationError::Malformed(input.to_string()))?;

    let mut total: u64 = 0;
    for (group, unit_ms) in [(1, MS_PER_DAY), (2, MS_PER_HOUR), (3, MS_PER_MINUTE)] {
        let Some(m) = caps.get(group) else {
            continue;
        };
        let value: u64 = m.as_str().parse().map_err(|_| DurationError::Overflow)?;
        let ms = value.checked_mul(unit_ms).ok_or(DurationError::Overflow)?;
        total = total.checked_add(ms).ok_or(DurationError::Overflow)?;
    }

    if total == 0 {
        return Err(DurationError::Zero);
    }
    let duration = Duration::from_millis(total);
    if duration > MAX_DURATION {
        return Err(DurationError::Overflow);
    }
    Ok(duration)
}

/// Format a remaining-time value as `{h}h {m}m {s}s`, dropping the hours
/// when less than an hour is left.
pub fn format_remaining(ms: u64) -> String {
    let hours = ms / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;
    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else {
        format!("{}m {}s", minutes, seconds)
    }
}

/// Compact form for announcements (`1d 2h 30m`). Zero units are omitted.
pub fn format_duration(duration: Duration) -> String {
    let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    let parts = [
        (ms / MS_PER_DAY, "d"),
        ((ms % MS_PER_DAY) / MS_PER_HOUR, "h"),
        ((ms % MS_PER_HOUR) / MS_PER_MINUTE, "m"),
        ((ms % MS_PER_MINUTE) / MS_PER_SECOND, "s"),
    ];
    let text: Vec<String> = parts
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{}{}", value, unit))
        .collect();
    if text.is_empty() {
        "0s".to_string()
    } else {
        text.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(input: &str) -> u128 {
        parse_duration(input).unwrap().as_millis()
    }

    #[test]
    fn test_parse_full() {
        assert_eq!(ms("1d2h30m"), 95_400_000);
    }

    #[test]
    fn test_parse_single_units() {
        assert_eq!(ms("45m"), 2_700_000);
        assert_eq!(ms("2h"), 7_200_000);
        assert_eq!(ms("1d"), 86_400_000);
        assert_eq!(ms("1d30m"), 88_200_000);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(ms("  10m "), 600_000);
    }

    #[test]
    fn test_parse_empty_is_zero() {
        assert_eq!(parse_duration(""), Err(DurationError::Zero));
        assert_eq!(parse_duration("0m"), Err(DurationError::Zero));
        assert_eq!(parse_duration("0d0h0m"), Err(DurationError::Zero));
    }

    #[test]
    fn test_parse_rejects_wrong_order() {
        assert!(matches!(
            parse_duration("30m1d"),
            Err(DurationError::Malformed(_))
        ));
        assert!(matches!(
            parse_duration("1h1d"),
            Err(DurationError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["abc", "10", "1.5h", "-5m", "10s", "1h 30m", "1H", "1d1d"] {
            assert!(
                matches!(parse_duration(bad), Err(DurationError::Malformed(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_overflow() {
        assert_eq!(
            parse_duration("99999999999999999999d"),
            Err(DurationError::Overflow)
        );
        assert_eq!(
            parse_duration("999999999999999999d"),
            Err(DurationError::Overflow)
        );
        assert_eq!(
            parse_duration("30000000000d"),
            Err(DurationError::Overflow)
        );
    }

    #[test]
    fn test_parse_upper_bound() {
        assert_eq!(parse_duration("365d").unwrap(), MAX_DURATION);
        assert_eq!(parse_duration("365d1m"), Err(DurationError::Overflow));
        assert_eq!(parse_duration("8761h"), Err(DurationError::Overflow));
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(0), "0m 0s");
        assert_eq!(format_remaining(59_999), "0m 59s");
        assert_eq!(format_remaining(90_000), "1m 30s");
        assert_eq!(format_remaining(3_600_000), "1h 0m 0s");
        assert_eq!(format_remaining(95_400_000), "26h 30m 0s");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(95_400_000)), "1d 2h 30m");
        assert_eq!(format_duration(Duration::from_secs(45 * 60)), "45m");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }
}
