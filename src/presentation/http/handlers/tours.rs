use crate::{
    application::tour_insights::dto::{
        DistancesData, DistancesResponse, MonthlyPlanResponse, StatsData, StatsResponse,
        ToursWithinData, ToursWithinResponse,
    },
    presentation::http::{errors::AppError, state::AppState},
};
use axum::{
    Json,
    extract::{Path, State},
};

const SUCCESS: &str = "success";

/// `GET /api/v1/tours/tours-within/{distance}/center/{latlng}/unit/{unit}`
pub async fn get_tours_within(
    State(state): State<AppState>,
    Path((distance, latlng, unit)): Path<(String, String, String)>,
) -> Result<Json<ToursWithinResponse>, AppError> {
    let tours = state
        .tour_insights
        .tours_within(&distance, &latlng, &unit)
        .await?;

    Ok(Json(ToursWithinResponse {
        status: SUCCESS.into(),
        tours: tours.len(),
        data: ToursWithinData { tours },
    }))
}

/// `GET /api/v1/tours/distances/{latlng}/unit/{unit}`
pub async fn get_distances(
    State(state): State<AppState>,
    Path((latlng, unit)): Path<(String, String)>,
) -> Result<Json<DistancesResponse>, AppError> {
    let data = state.tour_insights.distances(&latlng, &unit).await?;

    Ok(Json(DistancesResponse {
        status: SUCCESS.into(),
        tours: data.len(),
        data: DistancesData { data },
    }))
}

pub async fn get_tour_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.tour_insights.stats().await?;
    Ok(Json(StatsResponse {
        status: SUCCESS.into(),
        data: StatsData { stats },
    }))
}

pub async fn get_monthly_plan(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> Result<Json<MonthlyPlanResponse>, AppError> {
    let data = state.tour_insights.monthly_plan(&year).await?;
    Ok(Json(MonthlyPlanResponse {
        status: SUCCESS.into(),
        no_of_tours: data.len(),
        data,
    }))
}
