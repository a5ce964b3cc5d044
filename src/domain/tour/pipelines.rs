//! Query templates for the tour insight endpoints.

use super::geo::PlanYear;
use crate::domain::{
    document::pipeline::{
        Accumulator, Expr, Filter, GeoNear, Group, Pipeline, Projection, Scalar, SortOrder,
    },
    shared::geo::GeoPoint,
};

pub const START_LOCATION_FIELD: &str = "startLocation";
pub const START_DATES_FIELD: &str = "startDates";

/// Tours rated at least this well are included in the statistics.
pub const STATS_MIN_RATING: f64 = 4.5;

/// Tours whose start location lies within `radius` radians of `center`.
pub fn tours_within(center: GeoPoint, radius: f64) -> Filter {
    Filter::within_sphere(START_LOCATION_FIELD, center, radius)
}

/// Every tour with its distance from `center`, scaled by `multiplier`, nearest first.
pub fn distances(center: GeoPoint, multiplier: f64) -> Pipeline {
    Pipeline::near(GeoNear {
        key: START_LOCATION_FIELD.into(),
        near: center,
        distance_field: "distance".into(),
        distance_multiplier: multiplier,
    })
    .project(Projection::Include(vec!["distance".into(), "name".into()]))
}

/// Per-difficulty rating and price figures for well-rated tours, cheapest first.
pub fn stats() -> Pipeline {
    Pipeline::new()
        .matching(Filter::gte("ratingsAverage", Scalar::Number(STATS_MIN_RATING)))
        .group(
            Group::by(Expr::field("difficulty").to_upper())
                .with("numTours", Accumulator::Count)
                .with("numRatings", Accumulator::Sum(Expr::field("ratingsQuantity")))
                .with("avgRating", Accumulator::Avg(Expr::field("ratingsAverage")))
                .with("avgPrice", Accumulator::Avg(Expr::field("price")))
                .with("minPrice", Accumulator::Min(Expr::field("price")))
                .with("maxPrice", Accumulator::Max(Expr::field("price"))),
        )
        .sort(vec![("avgPrice".into(), SortOrder::Asc)])
}

/// One row per month of `year` with the tours starting in it.
pub fn monthly_plan(year: PlanYear) -> Pipeline {
    Pipeline::new()
        .unwind(START_DATES_FIELD)
        .matching(Filter::between(
            START_DATES_FIELD,
            Scalar::Date(year.start()),
            Scalar::Date(year.end()),
        ))
        .group(
            Group::by(Expr::field(START_DATES_FIELD).month())
                .with("numTourStats", Accumulator::Count)
                .with("tourName", Accumulator::Push(Expr::field("name"))),
        )
        .add_fields(vec![("month".into(), Expr::field("_id"))])
        .project(Projection::Exclude(vec!["_id".into()]))
        .sort(vec![("month".into(), SortOrder::Asc)])
}
