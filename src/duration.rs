//! Retry delay parsing and formatting.
//!
//! Delays are accepted as "250ms", "2s", "1m" or a bare number of
//! milliseconds, and always stored as a bare number of milliseconds.

use crate::error::Error;
use std::time::Duration;

/// Parses a human-readable duration string into a `Duration`.
///
/// # Errors
///
/// Returns an error if the format is invalid or the value is out of range.
///
/// # Examples
///
/// ```
/// use rest_cli::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
/// assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_duration("100").unwrap(), Duration::from_millis(100));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, Error> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::InvalidArgument("delay cannot be empty".to_string()));
    }

    let (number, scale) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(m) = s.strip_suffix('m') {
        (m, 60_000)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1000)
    } else {
        (s, 1)
    };

    let value: u64 = number.trim().parse().map_err(|_| {
        Error::InvalidArgument(format!(
            "invalid delay '{s}', use a form like '250ms', '2s' or '1m'"
        ))
    })?;
    let millis = value
        .checked_mul(scale)
        .ok_or_else(|| Error::InvalidArgument(format!("delay '{s}' is too large")))?;
    Ok(Duration::from_millis(millis))
}

/// Stored form of a delay: whole milliseconds.
#[must_use]
pub fn format_millis(duration: Duration) -> String {
    duration.as_millis().to_string()
}
