use super::dto::{TourPhotoUpload, cover_name, gallery_name};
use crate::{
    application::{
        errors::ApplicationError,
        resource_factory::{
            resource::TourResource,
            service::{ResourceService, parse_id},
        },
    },
    domain::tour::entity::TourPatch,
    infrastructure::{imaging::traits::PhotoProcessor, storage::traits::StorageService},
};
use bytes::Bytes;
use chrono::Utc;
use futures_util::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

/// Resizes uploaded tour photos, stores them and records their names on the tour.
pub struct TourPhotosUseCase {
    tours: ResourceService<TourResource>,
    processor: Arc<dyn PhotoProcessor>,
    storage: Arc<dyn StorageService>,
}

impl TourPhotosUseCase {
    pub fn new(
        tours: ResourceService<TourResource>,
        processor: Arc<dyn PhotoProcessor>,
        storage: Arc<dyn StorageService>,
    ) -> Self {
        Self {
            tours,
            processor,
            storage,
        }
    }

    #[instrument(skip(self, upload), fields(
        cover = upload.image_cover.is_some(),
        images = upload.images.len()
    ))]
    pub async fn execute(&self, id: &str, upload: TourPhotoUpload) -> Result<Value, ApplicationError> {
        let tour_id = parse_id(id)?;
        let mut patch: TourPatch = serde_json::from_value(Value::Object(upload.fields))?;
        patch.validate()?;
        self.tours.ensure_exists(tour_id).await?;

        let tour_id_str = tour_id.to_string();
        let stamp = Utc::now().timestamp_millis();
        let extension = self.processor.extension();
        let cover = upload
            .image_cover
            .map(|data| (cover_name(&tour_id_str, stamp, extension), data));
        let gallery: Vec<(String, Bytes)> = upload
            .images
            .into_iter()
            .enumerate()
            .map(|(i, data)| (gallery_name(&tour_id_str, stamp, i + 1, extension), data))
            .collect();

        let mut written: Vec<String> = cover.iter().map(|(name, _)| name.clone()).collect();
        written.extend(gallery.iter().map(|(name, _)| name.clone()));

        let result = async {
            if let Some((name, data)) = cover {
                self.store(&name, data).await?;
                patch.image_cover = Some(name);
            }

            if !gallery.is_empty() {
                let names: Vec<String> = gallery.iter().map(|(name, _)| name.clone()).collect();
                try_join_all(gallery.into_iter().map(|(name, data)| async move {
                    self.store(&name, data).await
                }))
                .await?;
                patch.images = Some(names);
            }

            self.tours
                .apply(tour_id, serde_json::to_value(&patch)?)
                .await
        }
        .await;

        match &result {
            Ok(_) => info!("Stored {} photos for tour {}", written.len(), tour_id),
            Err(_) => self.discard(&written).await,
        }
        result
    }

    async fn store(&self, name: &str, data: Bytes) -> Result<String, ApplicationError> {
        let encoded = self.processor.process(data).await?;
        self.storage
            .upload(name, encoded, self.processor.content_type())
            .await
            .map_err(ApplicationError::Storage)
    }

    async fn discard(&self, names: &[String]) {
        for name in names {
            if let Err(e) = self.storage.delete(name).await {
                warn!("Failed to remove orphaned photo {}: {}", name, e);
            }
        }
    }
}
