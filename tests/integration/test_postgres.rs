//! Runs the tour queries against a real Postgres when `DATABASE_URL` is set.
//! Each test works in its own collection names, so runs can share a database.

use super::helpers::fixture_tours;
use serde_json::{Value, json};
use tours_api::{
    domain::{
        document::store::{DocumentStore, Populate},
        tour::{
            geo::{DistanceUnit, PlanYear, parse_center},
            pipelines,
        },
    },
    infrastructure::{
        database::pool::create_pool, repositories::sqlx_document_store::SqlxDocumentStore,
    },
};
use uuid::Uuid;

struct PgCollections {
    store: SqlxDocumentStore,
    tours: String,
    reviews: String,
}

impl PgCollections {
    async fn cleanup(&self) {
        sqlx::query("DELETE FROM documents WHERE collection = $1 OR collection = $2")
            .bind(&self.tours)
            .bind(&self.reviews)
            .execute(&self.store.pool)
            .await
            .expect("cleanup failed");
    }
}

async fn connect() -> Option<PgCollections> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };

    let db = create_pool(&database_url, 2).await.expect("failed to create pool");
    let mut migrator = sqlx::migrate!("./migrations");
    migrator.set_ignore_missing(true);
    migrator.run(&db).await.expect("migrations failed");

    let run = Uuid::now_v7().simple().to_string();
    Some(PgCollections {
        store: SqlxDocumentStore::new(db),
        tours: format!("tours_{run}"),
        reviews: format!("reviews_{run}"),
    })
}

async fn seed(pg: &PgCollections, tours: Vec<Value>) {
    for tour in tours {
        pg.store.insert(&pg.tours, tour).await.expect("insert failed");
    }
}

fn names(rows: &[Value]) -> Vec<&str> {
    rows.iter().map(|r| r["name"].as_str().unwrap_or_default()).collect()
}

#[tokio::test]
async fn postgres_stats_group_by_difficulty() {
    let Some(pg) = connect().await else { return };
    seed(&pg, fixture_tours()).await;

    let stats = pg.store.aggregate(&pg.tours, &pipelines::stats()).await;
    pg.cleanup().await;
    let stats = stats.expect("stats failed");

    let tiers: Vec<&str> = stats.iter().map(|s| s["_id"].as_str().unwrap()).collect();
    assert_eq!(tiers, vec!["MEDIUM", "EASY", "DIFFICULT"]);

    let easy = &stats[1];
    assert_eq!(easy["numTours"], 2);
    assert_eq!(easy["numRatings"].as_f64(), Some(91.0));
    assert_eq!(easy["avgPrice"].as_f64(), Some(797.0));
    assert_eq!(easy["minPrice"].as_f64(), Some(397.0));
    assert_eq!(easy["maxPrice"].as_f64(), Some(1197.0));
    assert!((easy["avgRating"].as_f64().unwrap() - 4.65).abs() < 1e-9);
}

#[tokio::test]
async fn postgres_stats_leave_unpriced_tiers_null() {
    let Some(pg) = connect().await else { return };
    seed(
        &pg,
        vec![json!({ "name": "The Northern Lights", "difficulty": "easy", "ratingsAverage": 4.9 })],
    )
    .await;

    let stats = pg.store.aggregate(&pg.tours, &pipelines::stats()).await;
    pg.cleanup().await;
    let stats = stats.expect("stats failed");

    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0]["avgRating"].as_f64(), Some(4.9));
    assert_eq!(stats[0]["avgPrice"], Value::Null);
    assert_eq!(stats[0]["minPrice"], Value::Null);
    assert_eq!(stats[0]["maxPrice"], Value::Null);
}

#[tokio::test]
async fn postgres_monthly_plan_for_2024() {
    let Some(pg) = connect().await else { return };
    let mut tours = fixture_tours();
    tours.push(json!({ "name": "The Northern Lights", "startDates": ["2024-03-05"] }));
    seed(&pg, tours).await;

    let year = PlanYear::parse("2024").unwrap();
    let plan = pg.store.aggregate(&pg.tours, &pipelines::monthly_plan(year)).await;
    pg.cleanup().await;
    let plan = plan.expect("monthly plan failed");

    let months: Vec<u64> = plan.iter().map(|r| r["month"].as_u64().unwrap()).collect();
    assert_eq!(months, vec![1, 3, 4, 6, 7]);

    let march = &plan[1];
    assert_eq!(march["numTourStats"], 2);
    assert!(march.get("_id").is_none());

    let mut july: Vec<&str> = plan[4]["tourName"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    july.sort();
    assert_eq!(july, vec!["The Forest Hiker", "The Sea Explorer"]);
}

#[tokio::test]
async fn postgres_distances_and_radius_search() {
    let Some(pg) = connect().await else { return };
    let mut tours = fixture_tours();
    tours.push(json!({
        "name": "The Northern Lights",
        "startDates": ["2024-03-05"],
        "startLocation": { "type": "Point", "coordinates": [-118.25, 34.05] }
    }));
    seed(&pg, tours).await;

    let center = parse_center("34.05,-118.25").unwrap();
    let ranked = pg
        .store
        .aggregate(
            &pg.tours,
            &pipelines::distances(center, DistanceUnit::Kilometers.distance_multiplier()),
        )
        .await;
    let nearby = pg
        .store
        .find(
            &pg.tours,
            &pipelines::tours_within(center, DistanceUnit::Miles.radius_radians(10.0)),
        )
        .await;
    pg.cleanup().await;

    let ranked = ranked.expect("distances failed");
    assert_eq!(
        names(&ranked),
        vec![
            "The Northern Lights",
            "The Snow Adventurer",
            "The Forest Hiker",
            "The Sea Explorer",
            "The City Wanderer"
        ]
    );
    assert!(ranked[0]["distance"].as_f64().unwrap() < 0.001);
    let aspen = ranked[1]["distance"].as_f64().unwrap();
    assert!((1100.0..1250.0).contains(&aspen), "Aspen is {aspen} km away");
    assert!(ranked[1].get("price").is_none());

    let nearby = nearby.expect("radius search failed");
    assert_eq!(names(&nearby), vec!["The Northern Lights"]);
    assert_eq!(nearby[0]["startDates"], json!(["2024-03-05"]));
}

#[tokio::test]
async fn postgres_document_lifecycle() {
    let Some(pg) = connect().await else { return };

    let created = pg
        .store
        .insert(&pg.tours, json!({ "name": "The Wine Taster", "price": 1997 }))
        .await
        .expect("insert failed");
    let id = Uuid::parse_str(created["_id"].as_str().unwrap()).unwrap();
    assert!(created["createdAt"].is_string());

    pg.store
        .insert(&pg.reviews, json!({ "review": "Lovely", "rating": 5, "tour": id.to_string() }))
        .await
        .expect("review insert failed");

    let populate = [Populate::new(&pg.reviews, "tour", "reviews")];
    let fetched = pg.store.find_by_id(&pg.tours, id, &populate).await;
    let updated = pg.store.update(&pg.tours, id, json!({ "price": 1497 })).await;
    let deleted = pg.store.delete(&pg.tours, id).await;
    let gone = pg.store.find_by_id(&pg.tours, id, &[]).await;
    let deleted_again = pg.store.delete(&pg.tours, id).await;
    pg.cleanup().await;

    let fetched = fetched.unwrap().expect("tour should exist");
    assert_eq!(fetched["reviews"].as_array().unwrap().len(), 1);
    assert_eq!(fetched["reviews"][0]["review"], "Lovely");

    let updated = updated.unwrap().expect("tour should exist");
    assert_eq!(updated["price"].as_f64(), Some(1497.0));
    assert_eq!(updated["name"], "The Wine Taster");

    assert!(deleted.unwrap());
    assert!(gone.unwrap().is_none());
    assert!(!deleted_again.unwrap());
}

#[tokio::test]
async fn postgres_store_answers_ping() {
    let Some(pg) = connect().await else { return };
    pg.store.ping().await.expect("ping failed");
}
