use crate::domain::shared::{errors::DomainError, geo::GeoPoint};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Earth's mean radius in miles, used to turn a search distance into radians.
pub const EARTH_RADIUS_MILES: f64 = 3963.2;
/// Earth's mean radius in kilometers.
pub const EARTH_RADIUS_KILOMETERS: f64 = 6378.1;

/// Meters to miles.
pub const METERS_TO_MILES: f64 = 0.000621371;
/// Meters to kilometers.
pub const METERS_TO_KILOMETERS: f64 = 0.001;

pub const MISSING_CENTER_MESSAGE: &str =
    "Please specify latitude and longitude in the format lat,lng.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Miles,
    Kilometers,
}

impl DistanceUnit {
    /// `mi` selects miles; every other token means kilometers.
    pub fn from_token(token: &str) -> Self {
        if token == "mi" {
            Self::Miles
        } else {
            Self::Kilometers
        }
    }

    pub fn earth_radius(self) -> f64 {
        match self {
            Self::Miles => EARTH_RADIUS_MILES,
            Self::Kilometers => EARTH_RADIUS_KILOMETERS,
        }
    }

    /// Radius in radians for a spherical `$centerSphere` query.
    pub fn radius_radians(self, distance: f64) -> f64 {
        distance / self.earth_radius()
    }

    /// Factor applied to distances the store reports in meters.
    pub fn distance_multiplier(self) -> f64 {
        match self {
            Self::Miles => METERS_TO_MILES,
            Self::Kilometers => METERS_TO_KILOMETERS,
        }
    }
}

/// Parses a `"lat,lng"` path segment into a point.
///
/// Both components must be present and numeric and within range.
pub fn parse_center(latlng: &str) -> Result<GeoPoint, DomainError> {
    let missing = || DomainError::ValidationError(MISSING_CENTER_MESSAGE.into());

    let mut parts = latlng.split(',').map(str::trim);
    let lat = parts.next().filter(|s| !s.is_empty()).ok_or_else(missing)?;
    let lng = parts.next().filter(|s| !s.is_empty()).ok_or_else(missing)?;
    if parts.next().is_some() {
        return Err(missing());
    }

    let lat: f64 = lat.parse().map_err(|_| missing())?;
    let lng: f64 = lng.parse().map_err(|_| missing())?;

    let point = GeoPoint::new(lng, lat);
    if !point.is_valid() {
        return Err(DomainError::ValidationError(format!(
            "Coordinates out of range: lat {lat}, lng {lng}"
        )));
    }
    Ok(point)
}

pub fn parse_distance(raw: &str) -> Result<f64, DomainError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| {
            DomainError::ValidationError(format!(
                "Distance must be a non-negative number, got '{raw}'"
            ))
        })
}

/// Calendar year used by the monthly plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanYear(i32);

impl PlanYear {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::ValidationError(format!("Invalid year: '{raw}'"));
        let raw = raw.trim();
        if raw.len() != 4 || !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = raw.parse().map_err(|_| invalid())?;
        if year < 1000 {
            return Err(invalid());
        }
        Ok(Self(year))
    }

    pub fn value(self) -> i32 {
        self.0
    }

    /// Jan 1 00:00:00.000 UTC.
    pub fn start(self) -> DateTime<Utc> {
        let day = NaiveDate::from_ymd_opt(self.0, 1, 1)
            .and_then(|d| d.and_hms_milli_opt(0, 0, 0, 0))
            .unwrap_or_default();
        Utc.from_utc_datetime(&day)
    }

    /// Dec 31 23:59:59.999 UTC, so the whole last day is inside the year.
    pub fn end(self) -> DateTime<Utc> {
        let day = NaiveDate::from_ymd_opt(self.0, 12, 31)
            .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
            .unwrap_or_default();
        Utc.from_utc_datetime(&day)
    }
}
