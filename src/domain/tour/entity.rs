use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::{Validate, ValidationError};

/// Collection holding tour documents.
///
/// Tours are stored schemaless and read back as plain JSON; only the write
/// payloads below are typed and validated.
pub const TOURS_COLLECTION: &str = "tours";

/// Collection holding review documents; each review points at its tour via `tour`.
pub const REVIEWS_COLLECTION: &str = "reviews";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

/// GeoJSON point with optional human-readable context.
///
/// Coordinates follow GeoJSON ordering: `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, TS)]
#[ts(export)]
pub struct Location {
    #[serde(default = "point_type")]
    #[validate(custom(function = "validate_point_type"))]
    pub r#type: String,

    #[validate(custom(function = "validate_coordinates"))]
    pub coordinates: Vec<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Payload accepted when creating a tour.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_new_tour_discount"))]
#[ts(export)]
pub struct NewTour {
    #[validate(length(min = 10, max = 40, message = "A tour name must have between 10 and 40 characters"))]
    pub name: String,

    #[validate(range(min = 1))]
    pub duration: u32,

    #[validate(range(min = 1))]
    pub max_group_size: u32,

    pub difficulty: Difficulty,

    #[serde(default = "default_ratings_average")]
    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1 and 5"))]
    pub ratings_average: f64,

    #[serde(default)]
    pub ratings_quantity: u32,

    #[validate(range(min = 0.0))]
    pub price: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_discount: Option<f64>,

    #[validate(length(min = 1, message = "A tour must have a summary"))]
    pub summary: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_cover: Option<String>,

    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub start_dates: Vec<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub start_location: Option<Location>,
}

/// Partial update payload; only the fields present are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_patch_discount"))]
#[ts(export)]
pub struct TourPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 10, max = 40, message = "A tour name must have between 10 and 40 characters"))]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub duration: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub max_group_size: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1 and 5"))]
    pub ratings_average: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings_quantity: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_discount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub summary: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_cover: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_dates: Option<Vec<DateTime<Utc>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub start_location: Option<Location>,
}

fn default_ratings_average() -> f64 {
    4.5
}

fn point_type() -> String {
    "Point".to_string()
}

fn validate_point_type(kind: &str) -> Result<(), ValidationError> {
    if kind == "Point" {
        Ok(())
    } else {
        Err(ValidationError::new("location_type").with_message("Location type must be 'Point'".into()))
    }
}

fn validate_coordinates(coordinates: &[f64]) -> Result<(), ValidationError> {
    match coordinates {
        [lng, lat]
            if lng.is_finite()
                && lat.is_finite()
                && (-180.0..=180.0).contains(lng)
                && (-90.0..=90.0).contains(lat) =>
        {
            Ok(())
        }
        _ => Err(ValidationError::new("coordinates")
            .with_message("Coordinates must be [longitude, latitude]".into())),
    }
}

fn discount_below_price(discount: Option<f64>, price: Option<f64>) -> Result<(), ValidationError> {
    match (discount, price) {
        (Some(d), Some(p)) if d >= p => Err(ValidationError::new("price_discount")
            .with_message("Discount price should be below the regular price".into())),
        (Some(d), _) if d < 0.0 => Err(ValidationError::new("price_discount")
            .with_message("Discount price cannot be negative".into())),
        _ => Ok(()),
    }
}

fn validate_new_tour_discount(tour: &NewTour) -> Result<(), ValidationError> {
    discount_below_price(tour.price_discount, Some(tour.price))
}

fn validate_patch_discount(patch: &TourPatch) -> Result<(), ValidationError> {
    discount_below_price(patch.price_discount, patch.price)
}
