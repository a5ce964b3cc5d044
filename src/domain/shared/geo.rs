use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Mean Earth radius used for spherical distances, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_378_100.0;

/// A point on the sphere in decimal degrees.
///
/// Stored documents keep GeoJSON ordering (`[lng, lat]`); this type keeps the two
/// components named so call sites cannot swap them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn is_valid(&self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lng)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Reads a GeoJSON point (`{"type": "Point", "coordinates": [lng, lat]}`).
    pub fn from_geojson(value: &serde_json::Value) -> Option<Self> {
        let coords = value.get("coordinates")?.as_array()?;
        let lng = coords.first()?.as_f64()?;
        let lat = coords.get(1)?.as_f64()?;
        Some(Self { lng, lat })
    }

    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::json!({ "type": "Point", "coordinates": [self.lng, self.lat] })
    }

    /// Great-circle angle between two points, in radians (haversine).
    pub fn angular_distance(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * a.sqrt().min(1.0).asin()
    }

    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        self.angular_distance(other) * EARTH_RADIUS_METERS
    }
}
