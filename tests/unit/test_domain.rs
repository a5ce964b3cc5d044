use std::collections::BTreeMap;
use tours_api::domain::{
    document::pipeline::{Filter, SortOrder, Stage},
    shared::{
        geo::GeoPoint,
        list_query::ListQuery,
        pagination::{DEFAULT_LIMIT, MAX_LIMIT, PaginationRequest},
    },
    tour::{
        geo::{DistanceUnit, PlanYear, parse_center, parse_distance},
        pipelines,
    },
};

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn unit_tokens_default_to_kilometers() {
    assert_eq!(DistanceUnit::from_token("mi"), DistanceUnit::Miles);
    assert_eq!(DistanceUnit::from_token("km"), DistanceUnit::Kilometers);
    assert_eq!(DistanceUnit::from_token("MI"), DistanceUnit::Kilometers);
    assert_eq!(DistanceUnit::from_token("furlongs"), DistanceUnit::Kilometers);
}

#[test]
fn radius_is_distance_over_earth_radius() {
    assert!((DistanceUnit::Miles.radius_radians(3963.2) - 1.0).abs() < 1e-12);
    assert!((DistanceUnit::Kilometers.radius_radians(637.81) - 0.1).abs() < 1e-12);
}

#[test]
fn center_is_lat_then_lng() {
    let center = parse_center("34.05,-118.25").unwrap();
    assert_eq!(center, GeoPoint::new(-118.25, 34.05));
}

#[test]
fn center_needs_both_components() {
    for bad in ["", "34.05", "34.05,", ",-118.25", "a,b", "1,2,3", "91,0"] {
        assert!(parse_center(bad).is_err(), "{bad:?} should be rejected");
    }
}

#[test]
fn distance_must_be_a_non_negative_number() {
    assert_eq!(parse_distance("250").unwrap(), 250.0);
    assert_eq!(parse_distance("0").unwrap(), 0.0);
    assert!(parse_distance("-1").is_err());
    assert!(parse_distance("far").is_err());
}

#[test]
fn plan_year_covers_the_whole_calendar_year() {
    let year = PlanYear::parse("2024").unwrap();
    assert_eq!(year.value(), 2024);
    assert_eq!(year.start().to_rfc3339(), "2024-01-01T00:00:00+00:00");
    assert_eq!(year.end().to_rfc3339(), "2024-12-31T23:59:59.999+00:00");

    assert!(PlanYear::parse("0999").is_err());
    assert!(PlanYear::parse("24").is_err());
    assert!(PlanYear::parse("2024a").is_err());
}

#[test]
fn los_angeles_to_aspen() {
    let la = GeoPoint::new(-118.25, 34.05);
    let aspen = GeoPoint::new(-106.822318, 39.190872);
    let km = la.distance_meters(&aspen) / 1000.0;
    assert!((1100.0..1250.0).contains(&km), "got {km}");
}

#[test]
fn pagination_defaults_are_safe_and_stable() {
    let p = PaginationRequest::default();
    assert_eq!(p.page, 1);
    assert_eq!(p.limit, DEFAULT_LIMIT);
    assert_eq!(p.skip(), 0);
}

#[test]
fn pagination_clamps_the_limit() {
    let p = PaginationRequest::from_raw(Some("3"), Some("100000")).unwrap();
    assert_eq!(p.limit, MAX_LIMIT);
    assert_eq!(p.skip(), 2 * MAX_LIMIT);

    assert!(PaginationRequest::from_raw(Some("0"), None).is_err());
    assert!(PaginationRequest::from_raw(None, Some("ten")).is_err());
}

#[test]
fn list_query_defaults_to_newest_first() {
    let query = ListQuery::from_params(&BTreeMap::new()).unwrap();
    assert_eq!(query.filter, Filter::All);
    assert_eq!(query.sort, vec![("createdAt".to_string(), SortOrder::Desc)]);
    assert!(query.fields.is_none());
}

#[test]
fn list_query_reads_operators_sort_and_fields() {
    let query = ListQuery::from_params(&params(&[
        ("difficulty", "easy"),
        ("price[lt]", "1500"),
        ("sort", "price,-ratingsAverage"),
        ("fields", "name,price"),
    ]))
    .unwrap();

    assert!(matches!(&query.filter, Filter::And(parts) if parts.len() == 2));
    assert_eq!(
        query.sort,
        vec![
            ("price".to_string(), SortOrder::Asc),
            ("ratingsAverage".to_string(), SortOrder::Desc)
        ]
    );
    assert_eq!(query.fields, Some(vec!["name".to_string(), "price".to_string()]));
}

#[test]
fn list_query_rejects_injected_keys() {
    assert!(ListQuery::from_params(&params(&[("price); DROP TABLE", "1")])).is_err());
    assert!(ListQuery::from_params(&params(&[("fields", "name,doc->>'x'")])).is_err());
}

#[test]
fn monthly_plan_unwinds_before_matching() {
    let pipeline = pipelines::monthly_plan(PlanYear::parse("2021").unwrap());
    assert!(matches!(pipeline.stages()[0], Stage::Unwind(_)));
    assert!(matches!(pipeline.stages()[1], Stage::Match(_)));
    assert!(matches!(pipeline.stages().last(), Some(Stage::Sort(_))));
}
