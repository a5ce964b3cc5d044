use super::helpers::{
    TOURS, expect_status, get, read_json, send, send_json, spawn_app, tour_id,
};
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};

fn new_tour() -> Value {
    json!({
        "name": "The Wine Taster",
        "duration": 5,
        "maxGroupSize": 8,
        "difficulty": "easy",
        "price": 1997,
        "summary": "Exquisite wines, scenic views, exclusive barrel tastings",
        "startDates": ["2024-05-02T10:00:00Z"],
        "startLocation": { "coordinates": [-122.29286, 38.294065], "address": "Napa, CA 94559, USA" }
    })
}

fn names(body: &Value) -> Vec<String> {
    body["data"]["data"]
        .as_array()
        .expect("document list")
        .iter()
        .map(|t| t["name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn tour_lifecycle() {
    let test = spawn_app().await;

    let res = send_json(&test.app, "POST", TOURS, new_tour()).await;
    let created: Value = read_json(expect_status(res, StatusCode::CREATED).await).await;
    assert_eq!(created["status"], "success");
    let tour = &created["data"]["data"];
    assert_eq!(tour["name"], "The Wine Taster");
    assert_eq!(tour["ratingsAverage"].as_f64(), Some(4.5));
    assert!(tour["createdAt"].is_string());
    let id = tour["_id"].as_str().expect("_id").to_string();

    let res = get(&test.app, &format!("{TOURS}/{id}")).await;
    let fetched: Value = read_json(expect_status(res, StatusCode::OK).await).await;
    assert_eq!(fetched["data"]["data"]["_id"], id.as_str());
    assert_eq!(fetched["data"]["data"]["reviews"], json!([]));

    let res = send_json(&test.app, "PATCH", &format!("{TOURS}/{id}"), json!({ "price": 1497 })).await;
    let updated: Value = read_json(expect_status(res, StatusCode::OK).await).await;
    assert_eq!(updated["data"]["data"]["price"].as_f64(), Some(1497.0));
    assert_eq!(updated["data"]["data"]["name"], "The Wine Taster");

    let res = send(
        &test.app,
        Request::builder()
            .method("DELETE")
            .uri(format!("{TOURS}/{id}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    expect_status(res, StatusCode::NO_CONTENT).await;

    let res = get(&test.app, &format!("{TOURS}/{id}")).await;
    let body: Value = read_json(expect_status(res, StatusCode::NOT_FOUND).await).await;
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "No document found with that ID");
}

#[tokio::test]
async fn get_one_attaches_reviews() {
    let test = spawn_app().await;
    let id = tour_id(&test.app, "The Sea Explorer").await;

    test.store
        .seed(
            "reviews",
            vec![
                json!({ "review": "Loved every minute", "rating": 5, "tour": id }),
                json!({ "review": "Too much sun", "rating": 3, "tour": "someone-else" }),
            ],
        )
        .await
        .unwrap();

    let res = get(&test.app, &format!("{TOURS}/{id}")).await;
    let body: Value = read_json(expect_status(res, StatusCode::OK).await).await;
    let reviews = body["data"]["data"]["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["review"], "Loved every minute");
}

#[tokio::test]
async fn malformed_ids_are_client_errors() {
    let test = spawn_app().await;

    let res = get(&test.app, &format!("{TOURS}/not-an-id")).await;
    let body: Value = read_json(expect_status(res, StatusCode::BAD_REQUEST).await).await;
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Invalid _id: not-an-id");

    let res = send_json(&test.app, "PATCH", &format!("{TOURS}/not-an-id"), json!({ "price": 1 })).await;
    expect_status(res, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let test = spawn_app().await;
    let missing = "0194f123-4567-7abc-8def-0123456789ab";

    let res = send_json(&test.app, "PATCH", &format!("{TOURS}/{missing}"), json!({ "price": 1 })).await;
    expect_status(res, StatusCode::NOT_FOUND).await;

    let res = send(
        &test.app,
        Request::builder()
            .method("DELETE")
            .uri(format!("{TOURS}/{missing}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    expect_status(res, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
async fn invalid_tours_are_rejected() {
    let test = spawn_app().await;

    let mut short_name = new_tour();
    short_name["name"] = json!("Short");
    let res = send_json(&test.app, "POST", TOURS, short_name).await;
    let body: Value = read_json(expect_status(res, StatusCode::BAD_REQUEST).await).await;
    assert_eq!(body["status"], "fail");
    assert_eq!(
        body["message"],
        "Invalid input data. A tour name must have between 10 and 40 characters"
    );

    let mut discounted = new_tour();
    discounted["priceDiscount"] = json!(2500);
    let res = send_json(&test.app, "POST", TOURS, discounted).await;
    expect_status(res, StatusCode::BAD_REQUEST).await;

    let res = send(
        &test.app,
        Request::builder()
            .method("POST")
            .uri(TOURS)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\": "))
            .unwrap(),
    )
    .await;
    let body: Value = read_json(expect_status(res, StatusCode::BAD_REQUEST).await).await;
    assert!(body["message"].as_str().unwrap().starts_with("Invalid input data."));
}

#[tokio::test]
async fn list_filters_by_equality_and_operators() {
    let test = spawn_app().await;

    let res = get(&test.app, &format!("{TOURS}?difficulty=easy&sort=price")).await;
    let body: Value = read_json(expect_status(res, StatusCode::OK).await).await;
    assert_eq!(body["results"], 2);
    assert_eq!(names(&body), vec!["The Forest Hiker", "The City Wanderer"]);

    let res = get(&test.app, &format!("{TOURS}?price%5Blt%5D=1000&sort=-price")).await;
    let body: Value = read_json(expect_status(res, StatusCode::OK).await).await;
    assert_eq!(
        names(&body),
        vec!["The Snow Adventurer", "The Sea Explorer", "The Forest Hiker"]
    );
}

#[tokio::test]
async fn list_limits_fields_and_paginates() {
    let test = spawn_app().await;

    let res = get(&test.app, &format!("{TOURS}?sort=price&fields=name,price&page=2&limit=2")).await;
    let body: Value = read_json(expect_status(res, StatusCode::OK).await).await;

    assert_eq!(body["results"], 2);
    assert_eq!(names(&body), vec!["The Snow Adventurer", "The City Wanderer"]);
    let first = body["data"]["data"][0].as_object().unwrap();
    let mut keys: Vec<&str> = first.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["_id", "name", "price"]);
}

#[tokio::test]
async fn list_rejects_a_bad_page() {
    let test = spawn_app().await;

    let res = get(&test.app, &format!("{TOURS}?page=0")).await;
    let body: Value = read_json(expect_status(res, StatusCode::BAD_REQUEST).await).await;
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn top_five_cheap_alias() {
    let test = spawn_app().await;

    let res = get(&test.app, &format!("{TOURS}/top-5-cheap")).await;
    let body: Value = read_json(expect_status(res, StatusCode::OK).await).await;

    assert_eq!(body["results"], 5);
    assert_eq!(
        names(&body),
        vec![
            "The Forest Hiker",
            "The Sea Explorer",
            "The Snow Adventurer",
            "The City Wanderer",
            "The Park Camper"
        ]
    );
    let first = body["data"]["data"][0].as_object().unwrap();
    assert!(first.contains_key("ratingsAverage"));
    assert!(!first.contains_key("startDates"));
}

#[tokio::test]
async fn top_five_cheap_keeps_caller_filters() {
    let test = spawn_app().await;

    let res = get(&test.app, &format!("{TOURS}/top-5-cheap?difficulty=medium&limit=50")).await;
    let body: Value = read_json(expect_status(res, StatusCode::OK).await).await;
    assert_eq!(names(&body), vec!["The Sea Explorer", "The Park Camper"]);
}

#[tokio::test]
async fn health_reports_the_backend() {
    let test = spawn_app().await;

    let res = get(&test.app, "/health").await;
    let body: Value = read_json(expect_status(res, StatusCode::OK).await).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "up");
    assert_eq!(body["backend"], "memory");
}
