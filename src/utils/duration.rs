use chrono::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DurationError {
    #[error("Empty duration")]
    Empty,

    #[error("Invalid duration '{input}': {reason}")]
    InvalidFormat { input: String, reason: String },

    #[error("Duration '{0}' is out of range")]
    OutOfRange(String),
}

/// Parse a human duration such as `90s`, `30m`, `1h`, `2d`, `1w` or `1h 30m`.
///
/// A bare number is read as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DurationError::Empty);
    }

    let out_of_range = || DurationError::OutOfRange(trimmed.to_string());

    let std_duration = if trimmed.chars().all(|c| c.is_ascii_digit()) {
        let secs: u64 = trimmed.parse().map_err(|_| out_of_range())?;
        std::time::Duration::from_secs(secs)
    } else {
        // humantime units are case sensitive ("M" is months)
        humantime::parse_duration(&trimmed.to_ascii_lowercase()).map_err(|e| match e {
            humantime::DurationError::NumberOverflow => out_of_range(),
            other => DurationError::InvalidFormat {
                input: trimmed.to_string(),
                reason: other.to_string(),
            },
        })?
    };

    Duration::from_std(std_duration).map_err(|_| out_of_range())
}

/// Render a duration to whole seconds, e.g. `1h 30m`.
pub fn format_duration(duration: Duration) -> String {
    let secs = u64::try_from(duration.num_seconds()).unwrap_or(0);
    humantime::format_duration(std::time::Duration::from_secs(secs)).to_string()
}
