use chrono::{Datelike, Days, Local, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Returned when a display date does not split into `DD/MM/YYYY`.
///
/// The unparsed input is kept so callers that want the lenient behavior can
/// pass it through unchanged with [`DateParseError::into_passthrough`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateParseError {
    #[error("expected DD/MM/YYYY, got {0:?}")]
    Unsplittable(String),
}

impl DateParseError {
    /// Gives back the input that failed to parse.
    pub fn into_passthrough(self) -> String {
        match self {
            Self::Unsplittable(input) => input,
        }
    }
}

/// Converts `DD/MM/YYYY` to `YYYY-MM-DD`, left-padding day and month to two
/// digits. Parts are not checked to be numeric.
///
/// ```rust
/// use review::dates::to_storage_format;
///
/// assert_eq!(to_storage_format("5/3/2024").unwrap(), "2024-03-05");
/// assert!(to_storage_format("2024-03-05").is_err());
/// ```
pub fn to_storage_format(display: &str) -> Result<String, DateParseError> {
    let parts: Vec<&str> = display.split('/').collect();
    let [day, month, year] = parts.as_slice() else {
        return Err(DateParseError::Unsplittable(display.to_string()));
    };
    Ok(format!("{year}-{month:0>2}-{day:0>2}"))
}

/// Same as [`to_storage_format`] but returns the input unchanged when it is
/// not a `DD/MM/YYYY` date.
pub fn to_storage_format_lenient(display: &str) -> String {
    to_storage_format(display).unwrap_or_else(DateParseError::into_passthrough)
}

/// Formats `now` minus seven calendar days as `YYYY-MM-DD H:M:S`.
///
/// Hours, minutes and seconds are NOT zero padded: the queue backend parses
/// them as written, e.g. `2024-05-01 9:5:3`. Returns `None` when `now` is
/// within a week of the earliest representable date.
pub fn seven_days_ago(now: NaiveDateTime) -> Option<String> {
    let then = now.checked_sub_days(Days::new(7))?;
    Some(format!(
        "{}-{:02}-{:02} {}:{}:{}",
        then.year(),
        then.month(),
        then.day(),
        then.hour(),
        then.minute(),
        then.second()
    ))
}

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock of the machine, or of a fixed IANA timezone when configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    timezone: Option<Tz>,
}

impl SystemClock {
    pub fn new(timezone: Option<Tz>) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        match self.timezone {
            Some(tz) => Utc::now().with_timezone(&tz).naive_local(),
            None => Local::now().naive_local(),
        }
    }
}
