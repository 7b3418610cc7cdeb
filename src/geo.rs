//! Geographic coordinates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MalformedValueError;

/// Compass hemisphere of a degree/minute/second component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hemisphere {
    /// North; positive latitude.
    N,
    /// South; negative latitude.
    S,
    /// East; positive longitude.
    E,
    /// West; negative longitude.
    W,
}

impl Hemisphere {
    /// Parses `N`/`S`/`E`/`W` (case-insensitive).
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'N' => Some(Self::N),
            'S' => Some(Self::S),
            'E' => Some(Self::E),
            'W' => Some(Self::W),
            _ => None,
        }
    }

    /// Parses a hemisphere letter.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedValueError`] for anything but `N`/`S`/`E`/`W`.
    pub fn parse(c: char) -> Result<Self, MalformedValueError> {
        Self::from_char(c)
            .ok_or_else(|| MalformedValueError::new("coordinate", c.to_string(), format!("unknown hemisphere {c:?}")))
    }

    const fn sign(self) -> f64 {
        match self {
            Self::N | Self::E => 1.0,
            Self::S | Self::W => -1.0,
        }
    }

    const fn is_latitude(self) -> bool {
        matches!(self, Self::N | Self::S)
    }
}

/// One coordinate component in degrees, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dms {
    /// Whole or fractional degrees, non-negative.
    pub degrees: f64,
    /// Below 60.
    pub minutes: f64,
    /// Below 60.
    pub seconds: f64,
    /// `None` when the raw data carried no hemisphere (positive).
    pub hemisphere: Option<Hemisphere>,
}

impl Dms {
    /// Creates a component from all parts.
    #[must_use]
    pub const fn new(degrees: f64, minutes: f64, seconds: f64, hemisphere: Option<Hemisphere>) -> Self {
        Self {
            degrees,
            minutes,
            seconds,
            hemisphere,
        }
    }

    fn decimal(&self, axis: &'static str) -> Result<f64, MalformedValueError> {
        let render = || format!("{}°{}′{}″{:?}", self.degrees, self.minutes, self.seconds, self.hemisphere);
        if ![self.degrees, self.minutes, self.seconds].iter().all(|v| v.is_finite() && *v >= 0.0) {
            return Err(MalformedValueError::new(
                "coordinate",
                render(),
                "components must be finite and non-negative",
            ));
        }
        if self.minutes >= 60.0 || self.seconds >= 60.0 {
            return Err(MalformedValueError::new("coordinate", render(), "minutes and seconds must be below 60"));
        }
        if let Some(h) = self.hemisphere {
            if h.is_latitude() != (axis == "latitude") {
                return Err(MalformedValueError::new(
                    "coordinate",
                    render(),
                    format!("hemisphere {h:?} is not valid for {axis}"),
                ));
            }
        }

        let sign = self.hemisphere.map_or(1.0, Hemisphere::sign);
        Ok(sign * (self.degrees + self.minutes / 60.0 + self.seconds / 3600.0))
    }
}

impl TryFrom<(f64, char)> for Dms {
    type Error = MalformedValueError;

    fn try_from((degrees, h): (f64, char)) -> Result<Self, Self::Error> {
        Ok(Self::new(degrees, 0.0, 0.0, Some(Hemisphere::parse(h)?)))
    }
}

impl TryFrom<(f64, f64, char)> for Dms {
    type Error = MalformedValueError;

    fn try_from((degrees, minutes, h): (f64, f64, char)) -> Result<Self, Self::Error> {
        Ok(Self::new(degrees, minutes, 0.0, Some(Hemisphere::parse(h)?)))
    }
}

impl TryFrom<(f64, f64, f64, char)> for Dms {
    type Error = MalformedValueError;

    fn try_from((degrees, minutes, seconds, h): (f64, f64, f64, char)) -> Result<Self, Self::Error> {
        Ok(Self::new(degrees, minutes, seconds, Some(Hemisphere::parse(h)?)))
    }
}

/// A point on the globe in signed decimal degrees.
///
/// # Examples
///
/// ```
/// use reality::GeoCoord;
///
/// let coord = GeoCoord::from_dms((34.0, 'S'), (64.0, 'W')).unwrap();
/// assert_eq!(coord.latitude, -34.0);
/// assert_eq!(coord.longitude, -64.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoord {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoord {
    /// Creates a coordinate from decimal degrees.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedValueError`] if either value is non-finite or out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, MalformedValueError> {
        let input = || format!("{latitude}, {longitude}");
        if !latitude.is_finite() || latitude.abs() > 90.0 {
            return Err(MalformedValueError::new("coordinate", input(), "latitude must be within ±90°"));
        }
        if !longitude.is_finite() || longitude.abs() > 180.0 {
            return Err(MalformedValueError::new("coordinate", input(), "longitude must be within ±180°"));
        }
        Ok(Self { latitude, longitude })
    }

    /// Creates a coordinate from degree/minute/second components.
    ///
    /// `S` and `W` hemispheres negate the component.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedValueError`] on an unknown hemisphere letter, a
    /// hemisphere that does not match its axis, out-of-range minutes/seconds,
    /// or an out-of-range result.
    pub fn from_dms<L, G>(latitude: L, longitude: G) -> Result<Self, MalformedValueError>
    where
        L: TryInto<Dms>,
        G: TryInto<Dms>,
        MalformedValueError: From<L::Error> + From<G::Error>,
    {
        let lat = latitude.try_into()?.decimal("latitude")?;
        let lng = longitude.try_into()?.decimal("longitude")?;
        Self::new(lat, lng)
    }

    /// Splits this coordinate back into degree/minute/second components.
    #[must_use]
    pub fn to_dms(&self) -> (Dms, Dms) {
        fn split(value: f64, positive: Hemisphere, negative: Hemisphere) -> Dms {
            let abs = value.abs();
            let degrees = abs.trunc();
            let minutes = ((abs - degrees) * 60.0).trunc();
            let seconds = (abs - degrees - minutes / 60.0) * 3600.0;
            let hemisphere = if value < 0.0 { negative } else { positive };
            Dms::new(degrees, minutes, seconds, Some(hemisphere))
        }
        (
            split(self.latitude, Hemisphere::N, Hemisphere::S),
            split(self.longitude, Hemisphere::E, Hemisphere::W),
        )
    }
}

impl fmt::Display for GeoCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dms_degrees_only() {
        let coord = GeoCoord::from_dms((34.0, 'S'), (64.0, 'W')).unwrap();
        assert!((coord.latitude + 34.0).abs() < 1e-9);
        assert!((coord.longitude + 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_dms_full_components() {
        let coord = GeoCoord::from_dms((34.0, 35.0, 58.0, 'S'), (58.0, 22.0, 54.0, 'W')).unwrap();
        assert!((coord.latitude + 34.599_444).abs() < 1e-5);
        assert!((coord.longitude + 58.381_667).abs() < 1e-5);
    }

    #[test]
    fn test_from_dms_rejects_swapped_hemispheres() {
        let err = GeoCoord::from_dms((34.0, 'W'), (64.0, 'S')).unwrap_err();
        assert_eq!(err.kind, "coordinate");
        assert!(err.reason.contains("not valid for latitude"));
    }

    #[test]
    fn test_from_dms_rejects_bad_minutes() {
        assert!(GeoCoord::from_dms((34.0, 75.0, 'N'), (64.0, 'E')).is_err());
    }

    #[test]
    fn test_from_dms_rejects_unknown_hemisphere() {
        let err = GeoCoord::from_dms((34.0, 'X'), (64.0, 'W')).unwrap_err();
        assert!(err.reason.contains("unknown hemisphere"));
        assert!(Dms::try_from((34.0, 'q')).is_err());
    }

    #[test]
    fn test_from_dms_accepts_parsed_components() {
        let lat = Dms::new(34.0, 30.0, 0.0, Some(Hemisphere::S));
        let lng = Dms::try_from((64.0, 'w')).unwrap();
        assert_eq!(lng.hemisphere, Some(Hemisphere::W));

        let coord = GeoCoord::from_dms(lat, lng).unwrap();
        assert!((coord.latitude + 34.5).abs() < 1e-9);
        assert!((coord.longitude + 64.0).abs() < 1e-9);

        let unsigned = GeoCoord::from_dms(Dms::new(10.0, 0.0, 0.0, None), Dms::new(20.0, 0.0, 0.0, None)).unwrap();
        assert_eq!(unsigned, GeoCoord::new(10.0, 20.0).unwrap());
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(GeoCoord::new(91.0, 0.0).is_err());
        assert!(GeoCoord::new(0.0, -180.5).is_err());
        assert!(GeoCoord::new(f64::NAN, 0.0).is_err());
        assert!(GeoCoord::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_to_dms() {
        let coord = GeoCoord::new(-34.5, 58.25).unwrap();
        let (lat, lng) = coord.to_dms();
        assert_eq!(lat.hemisphere, Some(Hemisphere::S));
        assert!((lat.degrees - 34.0).abs() < 1e-9);
        assert!((lat.minutes - 30.0).abs() < 1e-9);
        assert_eq!(lng.hemisphere, Some(Hemisphere::E));
        assert!((lng.minutes - 15.0).abs() < 1e-9);
    }
}
