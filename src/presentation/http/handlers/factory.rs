//! Generic CRUD handlers. Each is instantiated per resource in the router,
//! e.g. `get(factory::get_all::<TourResource>)`.

use crate::{
    application::resource_factory::{resource::Resource, service::ResourceService},
    presentation::http::{errors::AppError, state::AppState},
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;

fn service<R: Resource>(state: &AppState) -> ResourceService<R> {
    ResourceService::new(state.store.clone())
}

pub async fn get_all<R: Resource>(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    let docs = service::<R>(&state).get_many(&params).await?;
    Ok(Json(json!({
        "status": "success",
        "results": docs.len(),
        "data": { "data": docs }
    })))
}

pub async fn get_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let doc = service::<R>(&state).get_one(&id).await?;
    Ok(Json(json!({ "status": "success", "data": { "data": doc } })))
}

pub async fn create_one<R: Resource>(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let doc = service::<R>(&state).create(&body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "success", "data": { "data": doc } })),
    ))
}

pub async fn update_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let doc = service::<R>(&state).update(&id, &body).await?;
    Ok(Json(json!({ "status": "success", "data": { "data": doc } })))
}

pub async fn delete_one<R: Resource>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    service::<R>(&state).delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
