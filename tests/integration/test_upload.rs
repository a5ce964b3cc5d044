use super::helpers::{
    Part, TOURS, expect_status, get, image_part, read_json, spawn_app, tiny_png_bytes, tour_id,
    upload_images,
};
use axum::http::StatusCode;
use serde_json::Value;

fn files_in(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn upload_stores_cover_and_gallery() {
    let test = spawn_app().await;
    let id = tour_id(&test.app, "The Forest Hiker").await;
    let (cover, first, second) = (tiny_png_bytes(), tiny_png_bytes(), tiny_png_bytes());

    let res = upload_images(
        &test.app,
        &id,
        &[
            image_part("imageCover", &cover),
            image_part("images", &first),
            image_part("images", &second),
            Part::Text("maxGroupSize", "12"),
        ],
    )
    .await;
    let body: Value = read_json(expect_status(res, StatusCode::OK).await).await;

    assert_eq!(body["status"], "success");
    let tour = &body["data"]["data"];
    let cover_name = tour["imageCover"].as_str().expect("imageCover");
    assert!(cover_name.starts_with(&format!("tour-{id}-")));
    assert!(cover_name.ends_with("-cover.jpeg"));

    let images: Vec<&str> = tour["images"]
        .as_array()
        .expect("images")
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(images.len(), 2);
    assert!(images[0].ends_with("-1.jpeg"));
    assert!(images[1].ends_with("-2.jpeg"));
    assert_eq!(tour["maxGroupSize"], 12);

    for name in images.iter().chain([&cover_name]) {
        let path = test.upload_dir.join(name);
        let stored = std::fs::read(&path).unwrap_or_else(|_| panic!("{name} was not written"));
        let decoded = image::load_from_memory(&stored).expect("stored photo is an image");
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }

    let res = get(&test.app, &format!("{TOURS}/{id}")).await;
    let body: Value = read_json(expect_status(res, StatusCode::OK).await).await;
    assert_eq!(body["data"]["data"]["imageCover"], cover_name);
}

#[tokio::test]
async fn upload_rejects_non_images() {
    let test = spawn_app().await;
    let id = tour_id(&test.app, "The Sea Explorer").await;

    let res = upload_images(
        &test.app,
        &id,
        &[Part::File {
            name: "images",
            file_name: "brochure.pdf",
            content_type: "application/pdf",
            data: b"%PDF-1.4",
        }],
    )
    .await;
    let body: Value = read_json(expect_status(res, StatusCode::BAD_REQUEST).await).await;

    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "File type should be image");
    assert_eq!(files_in(&test.upload_dir), 0);
}

#[tokio::test]
async fn upload_rejects_a_second_cover() {
    let test = spawn_app().await;
    let id = tour_id(&test.app, "The Sea Explorer").await;
    let png = tiny_png_bytes();

    let res = upload_images(
        &test.app,
        &id,
        &[image_part("imageCover", &png), image_part("imageCover", &png)],
    )
    .await;
    let body: Value = read_json(expect_status(res, StatusCode::BAD_REQUEST).await).await;
    assert!(body["message"].as_str().unwrap().starts_with("Unexpected field"));
}

#[tokio::test]
async fn upload_rejects_a_fourth_gallery_image() {
    let test = spawn_app().await;
    let id = tour_id(&test.app, "The Sea Explorer").await;
    let png = tiny_png_bytes();

    let parts: Vec<Part<'_>> = (0..4).map(|_| image_part("images", &png)).collect();
    let res = upload_images(&test.app, &id, &parts).await;
    expect_status(res, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn upload_rejects_unknown_file_fields() {
    let test = spawn_app().await;
    let id = tour_id(&test.app, "The Sea Explorer").await;
    let png = tiny_png_bytes();

    let res = upload_images(&test.app, &id, &[image_part("avatar", &png)]).await;
    let body: Value = read_json(expect_status(res, StatusCode::BAD_REQUEST).await).await;
    assert_eq!(body["message"], "Unexpected field");
}

#[tokio::test]
async fn upload_rejects_corrupt_image_data() {
    let test = spawn_app().await;
    let id = tour_id(&test.app, "The Sea Explorer").await;

    let res = upload_images(&test.app, &id, &[image_part("imageCover", b"not really a png")]).await;
    let body: Value = read_json(expect_status(res, StatusCode::BAD_REQUEST).await).await;

    assert_eq!(body["status"], "fail");
    assert_eq!(files_in(&test.upload_dir), 0);
}

#[tokio::test]
async fn upload_to_a_missing_tour_writes_nothing() {
    let test = spawn_app().await;
    let png = tiny_png_bytes();

    let res = upload_images(
        &test.app,
        "0194f123-4567-7abc-8def-0123456789ab",
        &[image_part("imageCover", &png)],
    )
    .await;
    expect_status(res, StatusCode::NOT_FOUND).await;
    assert_eq!(files_in(&test.upload_dir), 0);

    let res = upload_images(&test.app, "not-an-id", &[image_part("imageCover", &png)]).await;
    expect_status(res, StatusCode::BAD_REQUEST).await;
}
