use super::{
    handlers::{factory, health, tours, upload},
    middleware::{
        alias::top_five_cheap, logging::logging_middleware, request_id::request_id_middleware,
    },
    state::AppState,
};
use crate::application::resource_factory::resource::TourResource;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch},
};

pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.upload_policy.max_request_bytes();

    let tour_routes = Router::new()
        // Aggregations
        .route(
            "/tours-within/{distance}/center/{latlng}/unit/{unit}",
            get(tours::get_tours_within),
        )
        .route("/distances/{latlng}/unit/{unit}", get(tours::get_distances))
        .route("/tour-stats", get(tours::get_tour_stats))
        .route("/monthly-plan/{year}", get(tours::get_monthly_plan))
        // Aliases
        .route(
            "/top-5-cheap",
            get(factory::get_all::<TourResource>).route_layer(middleware::from_fn(top_five_cheap)),
        )
        // CRUD
        .route(
            "/",
            get(factory::get_all::<TourResource>).post(factory::create_one::<TourResource>),
        )
        .route(
            "/{id}",
            get(factory::get_one::<TourResource>)
                .patch(factory::update_one::<TourResource>)
                .delete(factory::delete_one::<TourResource>),
        )
        // Photos
        .route(
            "/{id}/images",
            patch(upload::upload_tour_images).layer(DefaultBodyLimit::max(upload_limit)),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1/tours", tour_routes)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
