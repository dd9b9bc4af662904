//! Delay literal parsing.
//!
//! `500ms`, `1.5s` and bare `2` (seconds) are accepted.  A blank value means
//! no delay at all.

use std::time::Duration;

use thiserror::Error;

/// A delay value that is not a non-negative number after its unit suffix is
/// removed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration {text:?}")]
pub struct DurationParseError {
    pub text: String,
}

/// Parse a delay literal into a [`Duration`].
pub fn parse_duration(text: &str) -> Result<Duration, DurationParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Duration::ZERO);
    }

    let lower = trimmed.to_ascii_lowercase();
    // `ms` must be tried before `s`.
    let (number, scale) = if let Some(n) = lower.strip_suffix("ms") {
        (n, 1e-3)
    } else if let Some(n) = lower.strip_suffix('s') {
        (n, 1.0)
    } else {
        (lower.as_str(), 1.0)
    };

    let err = || DurationParseError { text: text.to_owned() };
    let value: f64 = number.trim().parse().map_err(|_| err())?;
    Duration::try_from_secs_f64(value * scale).map_err(|_| err())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milliseconds() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
    }

    #[test]
    fn seconds_suffix() {
        assert_eq!(parse_duration("1s"), Ok(Duration::from_secs(1)));
    }

    #[test]
    fn bare_number_is_seconds() {
        assert_eq!(parse_duration("2"), Ok(Duration::from_secs(2)));
        assert_eq!(parse_duration("0.25"), Ok(Duration::from_millis(250)));
    }

    #[test]
    fn blank_is_zero() {
        assert_eq!(parse_duration(""), Ok(Duration::ZERO));
        assert_eq!(parse_duration("   "), Ok(Duration::ZERO));
    }

    #[test]
    fn suffix_case_and_spacing() {
        assert_eq!(parse_duration("250 MS"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration(" 3 S "), Ok(Duration::from_secs(3)));
    }

    #[test]
    fn garbage_is_error() {
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("ms").is_err());
        assert!(parse_duration("1.2.3s").is_err());
    }

    #[test]
    fn negative_and_non_finite_rejected() {
        assert!(parse_duration("-1").is_err());
        assert!(parse_duration("inf").is_err());
        assert!(parse_duration("NaN").is_err());
    }

    #[test]
    fn error_keeps_original_text() {
        let err = parse_duration(" 5 parsecs").unwrap_err();
        assert_eq!(err.text, " 5 parsecs");
    }
}
