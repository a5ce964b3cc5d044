use super::dto::{MonthlyPlanRow, TourDistance, TourStats};
use crate::domain::{
    document::store::DocumentStore,
    shared::errors::DomainError,
    tour::{
        entity::TOURS_COLLECTION,
        geo::{DistanceUnit, PlanYear, parse_center, parse_distance},
        pipelines,
    },
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Read-only queries over the tours collection: geo search, distance ranking,
/// rating statistics and the monthly plan.
///
/// Every request parameter is validated before the store is touched, so a bad
/// `latlng`, distance or year never costs a query.
pub struct TourInsightsUseCase {
    store: Arc<dyn DocumentStore>,
}

impl TourInsightsUseCase {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Tours starting within `distance` (in `unit`) of `latlng`, returned as stored.
    #[instrument(skip(self))]
    pub async fn tours_within(
        &self,
        distance: &str,
        latlng: &str,
        unit: &str,
    ) -> Result<Vec<Value>, DomainError> {
        let center = parse_center(latlng)?;
        let distance = parse_distance(distance)?;
        let unit = DistanceUnit::from_token(unit);
        let radius = unit.radius_radians(distance);
        debug!(?unit, radius, "Searching tours within sphere");

        self.store
            .find(TOURS_COLLECTION, &pipelines::tours_within(center, radius))
            .await
    }

    /// Every located tour with its distance from `latlng`, nearest first.
    #[instrument(skip(self))]
    pub async fn distances(
        &self,
        latlng: &str,
        unit: &str,
    ) -> Result<Vec<TourDistance>, DomainError> {
        let center = parse_center(latlng)?;
        let unit = DistanceUnit::from_token(unit);

        let docs = self
            .store
            .aggregate(
                TOURS_COLLECTION,
                &pipelines::distances(center, unit.distance_multiplier()),
            )
            .await?;
        decode_all(docs)
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<Vec<TourStats>, DomainError> {
        let docs = self
            .store
            .aggregate(TOURS_COLLECTION, &pipelines::stats())
            .await?;
        decode_all(docs)
    }

    #[instrument(skip(self))]
    pub async fn monthly_plan(&self, year: &str) -> Result<Vec<MonthlyPlanRow>, DomainError> {
        let year = PlanYear::parse(year)?;
        let docs = self
            .store
            .aggregate(TOURS_COLLECTION, &pipelines::monthly_plan(year))
            .await?;
        debug!("Monthly plan for {} has {} rows", year.value(), docs.len());
        decode_all(docs)
    }
}

fn decode_all<T: DeserializeOwned>(docs: Vec<Value>) -> Result<Vec<T>, DomainError> {
    docs.into_iter()
        .map(|doc| {
            serde_json::from_value(doc).map_err(|e| {
                error!("Stored document does not match the expected shape: {}", e);
                DomainError::InfrastructureError(format!("Malformed document: {e}"))
            })
        })
        .collect()
}
