//! Survey point definitions.

use serde::{Deserialize, Serialize};

use crate::{Result, SurveyError};

/// Valid latitude range in degrees.
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in degrees.
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// A single geolocated sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurveyPoint {
    pub lat: f64,
    pub lon: f64,
    /// Metres; negative below datum.
    pub elevation: f64,
}

impl SurveyPoint {
    /// Create a validated point.
    pub fn new(lat: f64, lon: f64, elevation: f64) -> Result<Self> {
        if !LATITUDE_RANGE.contains(&lat) {
            return Err(SurveyError::Validation(format!(
                "latitude {lat} outside [-90, 90]"
            )));
        }
        if !LONGITUDE_RANGE.contains(&lon) {
            return Err(SurveyError::Validation(format!(
                "longitude {lon} outside [-180, 180]"
            )));
        }
        if !elevation.is_finite() {
            return Err(SurveyError::Validation(format!(
                "elevation {elevation} is not a finite number"
            )));
        }
        Ok(Self {
            lat,
            lon,
            elevation,
        })
    }

    /// Parse the `lat,lon,elevation` field-entry form.
    pub fn parse_triple(input: &str) -> Result<Self> {
        let parts: Vec<&str> = input.split(',').map(str::trim).collect();
        let [lat, lon, elevation] = parts.as_slice() else {
            return Err(SurveyError::Validation(format!(
                "expected 'lat,lon,elevation', got {input:?}"
            )));
        };
        let number = |field: &str, raw: &str| -> Result<f64> {
            raw.parse::<f64>().map_err(|_| {
                SurveyError::Validation(format!("{field} {raw:?} is not a number"))
            })
        };
        Self::new(
            number("latitude", *lat)?,
            number("longitude", *lon)?,
            number("elevation", *elevation)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_bounds_inclusive() {
        assert!(SurveyPoint::new(90.0, 180.0, 0.0).is_ok());
        assert!(SurveyPoint::new(-90.0, -180.0, -420.0).is_ok());
    }

    #[test]
    fn test_point_rejects_out_of_range() {
        assert!(matches!(
            SurveyPoint::new(90.5, 0.0, 0.0),
            Err(SurveyError::Validation(_))
        ));
        assert!(matches!(
            SurveyPoint::new(0.0, -180.1, 0.0),
            Err(SurveyError::Validation(_))
        ));
        assert!(SurveyPoint::new(f64::NAN, 0.0, 0.0).is_err());
        assert!(SurveyPoint::new(0.0, 0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_parse_triple() {
        let point = SurveyPoint::parse_triple("34.05, -118.25, 89.5").unwrap();
        assert_eq!(point.lat, 34.05);
        assert_eq!(point.lon, -118.25);
        assert_eq!(point.elevation, 89.5);

        assert!(SurveyPoint::parse_triple("34.05,-118.25").is_err());
        assert!(SurveyPoint::parse_triple("north,-118.25,3").is_err());
    }
}
