//! UTC offsets.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MalformedValueError;

const MIN_OFFSET_MINUTES: i32 = -12 * 60;
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

fn strict_pattern() -> Option<&'static Regex> {
    static STRICT: OnceLock<Option<Regex>> = OnceLock::new();
    STRICT
        .get_or_init(|| {
            Regex::new(r"^(?i)(?:(GMT|UTC)\s*)?(?:([+\-−±])?\s*(\d{1,2})(?:[:.]?(\d{2}))?)?$").ok()
        })
        .as_ref()
}

fn embedded_pattern() -> Option<&'static Regex> {
    static EMBEDDED: OnceLock<Option<Regex>> = OnceLock::new();
    EMBEDDED
        .get_or_init(|| {
            Regex::new(r"(?i)(?:GMT|UTC)\s*[+\-−±]\s*\d{1,2}(?::?\d{2})?|^\s*[+\-−±]?\s*\d{1,2}(?::\d{2})?\s*$").ok()
        })
        .as_ref()
}

/// A signed offset from UTC, stored in whole minutes.
///
/// # Examples
///
/// ```
/// use reality::TZOffset;
///
/// let offset = TZOffset::parse("GMT-3").unwrap();
/// assert_eq!(offset.hours(), -3.0);
/// assert_eq!(offset, TZOffset::parse("UTC−03:00").unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TZOffset {
    minutes: i32,
}

impl TZOffset {
    /// UTC itself.
    pub const UTC: Self = Self { minutes: 0 };

    /// Creates an offset from minutes east of UTC.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedValueError`] outside the `-12:00..=+14:00` range.
    pub fn from_minutes(minutes: i32) -> Result<Self, MalformedValueError> {
        if !(MIN_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes) {
            return Err(MalformedValueError::new(
                "utc offset",
                format!("{minutes} minutes"),
                "offset must be within -12:00..=+14:00",
            ));
        }
        Ok(Self { minutes })
    }

    /// Creates an offset from (possibly fractional) hours.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedValueError`] if the hours are not finite, not a whole
    /// number of minutes, or out of range.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_hours(hours: f64) -> Result<Self, MalformedValueError> {
        let minutes = hours * 60.0;
        if !minutes.is_finite() || (minutes - minutes.round()).abs() > 1e-6 {
            return Err(MalformedValueError::new(
                "utc offset",
                hours.to_string(),
                "offset must be a whole number of minutes",
            ));
        }
        if minutes.abs() > f64::from(MAX_OFFSET_MINUTES.max(-MIN_OFFSET_MINUTES)) {
            return Err(MalformedValueError::new(
                "utc offset",
                hours.to_string(),
                "offset must be within -12:00..=+14:00",
            ));
        }
        Self::from_minutes(minutes.round() as i32)
    }

    /// Parses `GMT±H`, `UTC±HH:MM`, a bare `±H`, or just `GMT`/`UTC`.
    ///
    /// Both ASCII `-` and the typographic minus `−` are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedValueError`] if the text is not an offset.
    pub fn parse(input: &str) -> Result<Self, MalformedValueError> {
        let malformed = |reason: &str| MalformedValueError::new("utc offset", input, reason);
        let trimmed = input.trim();
        let caps = strict_pattern()
            .and_then(|re| re.captures(trimmed))
            .ok_or_else(|| malformed("expected GMT±H or UTC±HH:MM"))?;

        let Some(hours) = caps.get(3) else {
            return if caps.get(1).is_some() {
                Ok(Self::UTC)
            } else {
                Err(malformed("expected GMT±H or UTC±HH:MM"))
            };
        };

        let hours: i32 = hours.as_str().parse().map_err(|_| malformed("hours are not a number"))?;
        let minutes: i32 = caps
            .get(4)
            .map_or(Ok(0), |m| m.as_str().parse())
            .map_err(|_| malformed("minutes are not a number"))?;
        if minutes >= 60 {
            return Err(malformed("minutes must be below 60"));
        }

        let sign = match caps.get(2).map(|m| m.as_str()) {
            Some("-" | "−") => -1,
            _ => 1,
        };
        Self::from_minutes(sign * (hours * 60 + minutes)).map_err(|e| MalformedValueError {
            input: input.to_string(),
            ..e
        })
    }

    /// Finds and parses the first offset mentioned in free text, such as
    /// `"ART (UTC−3)"`. Returns `None` when the text mentions no offset.
    #[must_use]
    pub fn extract(text: &str) -> Option<Result<Self, MalformedValueError>> {
        let found = embedded_pattern()?.find(text)?;
        Some(Self::parse(found.as_str()))
    }

    /// Minutes east of UTC.
    #[must_use]
    pub const fn minutes(&self) -> i32 {
        self.minutes
    }

    /// Hours east of UTC; fractional for offsets like `+05:30`.
    #[must_use]
    pub fn hours(&self) -> f64 {
        f64::from(self.minutes) / 60.0
    }

    /// Returns the equivalent chrono offset.
    #[must_use]
    pub fn to_fixed_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Converts a UTC instant into local time at this offset.
    #[must_use]
    pub fn convert(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.to_fixed_offset())
    }

    /// Current local time at this offset.
    #[must_use]
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.convert(Utc::now())
    }
}

impl fmt::Display for TZOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minutes < 0 { '-' } else { '+' };
        let abs = self.minutes.abs();
        if abs % 60 == 0 {
            write!(f, "GMT{sign}{}", abs / 60)
        } else {
            write!(f, "GMT{sign}{}:{:02}", abs / 60, abs % 60)
        }
    }
}

impl From<TZOffset> for FixedOffset {
    fn from(offset: TZOffset) -> Self {
        offset.to_fixed_offset()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_parse_gmt_forms() {
        assert_eq!(TZOffset::parse("GMT-3").unwrap().minutes(), -180);
        assert_eq!(TZOffset::parse("gmt+10").unwrap().minutes(), 600);
        assert_eq!(TZOffset::parse("UTC+05:30").unwrap().minutes(), 330);
        assert_eq!(TZOffset::parse("UTC+0545").unwrap().minutes(), 345);
        assert_eq!(TZOffset::parse("UTC").unwrap(), TZOffset::UTC);
    }

    #[test]
    fn test_parse_unicode_minus_and_bare_numbers() {
        assert_eq!(TZOffset::parse("UTC−03:00").unwrap().minutes(), -180);
        assert_eq!(TZOffset::parse("−3").unwrap().minutes(), -180);
        assert_eq!(TZOffset::parse("+9").unwrap().minutes(), 540);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(TZOffset::parse("").is_err());
        assert!(TZOffset::parse("Argentina Time").is_err());
        assert!(TZOffset::parse("GMT+3:75").is_err());
        assert!(TZOffset::parse("GMT+15").is_err());
    }

    #[test]
    fn test_extract_from_free_text() {
        let offset = TZOffset::extract("ART (UTC−3)").unwrap().unwrap();
        assert_eq!(offset.hours(), -3.0);
        assert!(TZOffset::extract("no offset here").is_none());
        assert_eq!(TZOffset::extract("−3").unwrap().unwrap().minutes(), -180);
    }

    #[test]
    fn test_from_hours() {
        assert_eq!(TZOffset::from_hours(5.5).unwrap().minutes(), 330);
        assert!(TZOffset::from_hours(0.123).is_err());
        assert!(TZOffset::from_hours(f64::INFINITY).is_err());
        assert!(TZOffset::from_hours(-13.0).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(TZOffset::parse("GMT-3").unwrap().to_string(), "GMT-3");
        assert_eq!(TZOffset::parse("UTC+05:30").unwrap().to_string(), "GMT+5:30");
        assert_eq!(TZOffset::UTC.to_string(), "GMT+0");
    }

    #[test]
    fn test_convert_to_local_time() {
        let offset = TZOffset::parse("GMT-3").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let local = offset.convert(at);
        assert_eq!(local.format("%H:%M").to_string(), "09:00");
        assert_eq!(local.offset().local_minus_utc(), -3 * 3600);
    }
}
