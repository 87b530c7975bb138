//! Timestamp formatting for the media tool's seek and duration arguments.
//!
//! Pure functions for turning fractional seconds into the colon-delimited,
//! millisecond-precision strings passed to `ffmpeg -ss` / `-t`, and back.
//!
//! # Shapes
//!
//! ```text
//! 0.0      -> 0.000
//! 90.5     -> 1:30.500
//! 2018.368 -> 33:38.368
//! 5618.368 -> 1:33:38.368
//! ```
//!
//! Leading components are dropped when zero, so the field width is not fixed.

use thiserror::Error;

const MILLIS_PER_SECOND: u64 = 1000;
const SECONDS_PER_MINUTE: u64 = 60;
const MINUTES_PER_HOUR: u64 = 60;

/// Largest accepted value, in seconds (roughly 31,700 years). Millisecond
/// counts up to this stay exact in an `f64`.
pub const MAX_SECONDS: f64 = 1e12;

/// Errors from timestamp formatting and parsing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimecodeError {
    /// Value is not a number of seconds in `0..=MAX_SECONDS`.
    #[error("Invalid duration '{0}': expected a number of seconds from 0 to 1e12")]
    InvalidDuration(String),
}

/// Result type for timecode operations.
pub type TimecodeResult<T> = Result<T, TimecodeError>;

/// Parse a raw user-supplied value (e.g. a CLI flag) as seconds.
///
/// Accepts anything `f64` parses, after trimming whitespace, as long as the
/// result is finite, non-negative and at most [`MAX_SECONDS`].
pub fn parse_seconds(raw: &str) -> TimecodeResult<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| TimecodeError::InvalidDuration(raw.to_string()))?;
    check_seconds(value)?;
    Ok(value)
}

/// Format seconds as `[H:]MM:SS.mmm`, rounded to the nearest millisecond.
///
/// Hours appear only when non-zero; minutes appear when minutes or hours are
/// non-zero. Seconds and the three-digit fraction are always present.
pub fn format_seconds(seconds: f64) -> TimecodeResult<String> {
    check_seconds(seconds)?;

    let total_ms = (seconds * MILLIS_PER_SECOND as f64).round() as u64;

    let millis = total_ms % MILLIS_PER_SECOND;
    let total_secs = total_ms / MILLIS_PER_SECOND;
    let secs = total_secs % SECONDS_PER_MINUTE;
    let total_mins = total_secs / SECONDS_PER_MINUTE;
    let mins = total_mins % MINUTES_PER_HOUR;
    let hours = total_mins / MINUTES_PER_HOUR;

    let formatted = if hours > 0 {
        format!("{}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
    } else if mins > 0 {
        format!("{}:{:02}.{:03}", mins, secs, millis)
    } else {
        format!("{}.{:03}", secs, millis)
    };

    Ok(formatted)
}

/// Parse a raw seconds string and format it in one go.
pub fn format_str(raw: &str) -> TimecodeResult<String> {
    format_seconds(parse_seconds(raw)?)
}

/// Parse a timestamp produced by [`format_seconds`] back into seconds.
///
/// Accepts `S[.fff]`, `M:S[.fff]` and `H:M:S[.fff]`.
pub fn parse_timestamp(timestamp: &str) -> TimecodeResult<f64> {
    let invalid = || TimecodeError::InvalidDuration(timestamp.to_string());

    let parts: Vec<&str> = timestamp.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(invalid());
    }

    let (whole_units, seconds_part) = parts.split_at(parts.len() - 1);

    let mut total = 0.0;
    for unit in whole_units {
        let value: u64 = unit.parse().map_err(|_| invalid())?;
        total = total * 60.0 + value as f64;
    }

    let seconds: f64 = seconds_part[0].parse().map_err(|_| invalid())?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(invalid());
    }

    Ok(total * 60.0 + seconds)
}

fn check_seconds(value: f64) -> TimecodeResult<()> {
    if !value.is_finite() || !(0.0..=MAX_SECONDS).contains(&value) {
        return Err(TimecodeError::InvalidDuration(value.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_formats_as_zero_timestamp() {
        assert_eq!(format_seconds(0.0).unwrap(), "0.000");
        assert_eq!(parse_timestamp("0.000").unwrap(), 0.0);
    }

    #[test]
    fn ninety_and_a_half_seconds() {
        let formatted = format_seconds(90.5).unwrap();
        assert_eq!(formatted, "1:30.500");
        assert!((parse_timestamp(&formatted).unwrap() - 90.5).abs() < 1e-9);
    }

    #[test]
    fn hours_only_when_non_zero() {
        assert_eq!(format_seconds(2018.368).unwrap(), "33:38.368");
        assert_eq!(format_seconds(5618.368).unwrap(), "1:33:38.368");
        assert_eq!(format_seconds(3600.0).unwrap(), "1:00:00.000");
    }

    #[test]
    fn rounds_to_nearest_millisecond() {
        // 2018.368 * 1000 is 2018367.9999... in binary floating point
        assert_eq!(format_seconds(2018.368).unwrap(), "33:38.368");
        assert_eq!(format_seconds(1.0004).unwrap(), "1.000");
        assert_eq!(format_seconds(1.0006).unwrap(), "1.001");
    }

    #[test]
    fn rejects_negative_and_non_finite() {
        assert!(matches!(
            format_seconds(-1.0),
            Err(TimecodeError::InvalidDuration(_))
        ));
        assert!(format_seconds(f64::NAN).is_err());
        assert!(format_seconds(f64::INFINITY).is_err());
    }

    #[test]
    fn values_past_ceiling_are_rejected() {
        assert!(format_seconds(MAX_SECONDS).is_ok());
        assert!(matches!(
            format_seconds(1e20),
            Err(TimecodeError::InvalidDuration(_))
        ));
        assert!(parse_seconds("1e20").is_err());
        assert_eq!(
            format_seconds(MAX_SECONDS).unwrap(),
            "277777777:46:40.000"
        );
    }

    #[test]
    fn parse_seconds_validates_raw_input() {
        assert_eq!(parse_seconds(" 60 ").unwrap(), 60.0);
        assert_eq!(parse_seconds("12.5").unwrap(), 12.5);
        assert!(matches!(
            parse_seconds("sixty"),
            Err(TimecodeError::InvalidDuration(v)) if v == "sixty"
        ));
        assert!(parse_seconds("inf").is_err());
        assert!(parse_seconds("-5").is_err());
        assert!(parse_seconds("").is_err());
    }

    #[test]
    fn format_str_parses_then_formats() {
        assert_eq!(format_str("60").unwrap(), "1:00.000");
        assert!(format_str("abc").is_err());
    }

    #[test]
    fn round_trips_through_inverse_parse() {
        for seconds in [0.0, 0.001, 9.999, 59.5, 61.25, 3599.999, 7322.042] {
            let formatted = format_seconds(seconds).unwrap();
            let parsed = parse_timestamp(&formatted).unwrap();
            assert!(
                (parsed - seconds).abs() < 1e-6,
                "{} -> {} -> {}",
                seconds,
                formatted,
                parsed
            );
        }
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("1:2:3:4").is_err());
        assert!(parse_timestamp("a:30.000").is_err());
        assert!(parse_timestamp("1:-3").is_err());
    }
}
