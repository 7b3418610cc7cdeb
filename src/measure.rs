//! Magnitudes with units.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MalformedValueError;
use crate::parse;

const DOLLAR: &str = "$";

/// A magnitude paired with a unit string.
///
/// Units are compared literally: there is no conversion between units, so a
/// measure in `km²` never equals one in `m²`, whatever the magnitudes.
///
/// # Examples
///
/// ```
/// use reality::Measure;
///
/// let area = Measure::new(2_780_400.0, "km²");
/// assert_eq!(area, Measure::new(2_780_400.0, "km²"));
/// assert_ne!(area, Measure::new(2_780_400_000_000.0, "m²"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measure {
    /// Numeric magnitude.
    pub magnitude: f64,
    /// Unit label, e.g. `km²`, `person`, `$`.
    pub unit: String,
}

impl Measure {
    /// Creates a measure.
    #[must_use]
    pub fn new(magnitude: f64, unit: impl Into<String>) -> Self {
        Self {
            magnitude,
            unit: unit.into(),
        }
    }

    /// Parses `"<number> <unit>"`, e.g. `"2,780,400 km²"` or `"3.5 million person"`.
    ///
    /// A currency prefix stands for the unit when nothing follows the number:
    /// `"$964 billion"` and `"US$1 million"` are measures in `$`.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedValueError`] if there is no leading number, no unit,
    /// or the magnitude is not finite.
    pub fn parse(input: &str) -> Result<Self, MalformedValueError> {
        let reading = parse::leading_number(input)
            .ok_or_else(|| MalformedValueError::new("measure", input, "expected a leading number"))?;

        let unit = match (reading.rest, reading.currency) {
            ("", Some(_)) => DOLLAR,
            ("", None) => return Err(MalformedValueError::new("measure", input, "missing unit")),
            (_, Some(_)) => {
                return Err(MalformedValueError::new(
                    "measure",
                    input,
                    "currency prefix and unit suffix both given",
                ))
            }
            (rest, None) => rest,
        };
        Self::checked(reading.value, unit).map_err(|e| MalformedValueError { input: input.to_string(), ..e })
    }

    /// Creates a measure, rejecting non-finite magnitudes and empty units.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedValueError`] on NaN/infinite magnitudes or a blank unit.
    pub fn checked(magnitude: f64, unit: impl Into<String>) -> Result<Self, MalformedValueError> {
        let unit = unit.into();
        if !magnitude.is_finite() {
            return Err(MalformedValueError::new(
                "measure",
                format!("{magnitude} {unit}"),
                "magnitude must be finite",
            ));
        }
        if unit.trim().is_empty() {
            return Err(MalformedValueError::new("measure", magnitude.to_string(), "missing unit"));
        }
        Ok(Self::new(magnitude, unit.trim()))
    }

    /// Returns true if both measures share a unit (and so can be compared).
    #[must_use]
    pub fn same_unit(&self, other: &Self) -> bool {
        self.unit == other.unit
    }
}

impl PartialEq for Measure {
    fn eq(&self, other: &Self) -> bool {
        self.unit == other.unit && self.magnitude == other.magnitude
    }
}

impl PartialOrd for Measure {
    /// Measures in different units are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.same_unit(other) {
            self.magnitude.partial_cmp(&other.magnitude)
        } else {
            None
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}
