use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// A tour annotated with its distance from the requested center, in the requested unit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TourDistance {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub distance: f64,
}

/// Rating and price figures for one difficulty tier.
///
/// Averages and extremes are `None` when no member of the tier carries a
/// numeric value for the field.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TourStats {
    /// Upper-cased difficulty
    #[serde(rename = "_id")]
    pub difficulty: String,
    pub num_tours: u64,
    pub num_ratings: f64,
    #[serde(default, deserialize_with = "number_or_none")]
    pub avg_rating: Option<f64>,
    #[serde(default, deserialize_with = "number_or_none")]
    pub avg_price: Option<f64>,
    #[serde(default, deserialize_with = "number_or_none")]
    pub min_price: Option<f64>,
    #[serde(default, deserialize_with = "number_or_none")]
    pub max_price: Option<f64>,
}

fn number_or_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| v.as_f64()))
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MonthlyPlanRow {
    pub month: u32,
    pub num_tour_stats: u64,
    /// Names in start-date order; unnamed tours show up as `null`
    pub tour_name: Vec<Option<String>>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ToursWithinData {
    /// Matching tour documents as stored
    #[ts(type = "Array<Record<string, unknown>>")]
    pub tours: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ToursWithinResponse {
    pub status: String,
    pub tours: usize,
    pub data: ToursWithinData,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DistancesData {
    pub data: Vec<TourDistance>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DistancesResponse {
    pub status: String,
    pub tours: usize,
    pub data: DistancesData,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatsData {
    pub stats: Vec<TourStats>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StatsResponse {
    pub status: String,
    pub data: StatsData,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MonthlyPlanResponse {
    pub status: String,
    pub no_of_tours: usize,
    pub data: Vec<MonthlyPlanRow>,
}
