use crate::{
    application::{
        resource_factory::service::ResourceService, tour_insights::use_case::TourInsightsUseCase,
        tour_photos::use_case::TourPhotosUseCase,
    },
    config::Config,
    domain::document::store::DocumentStore,
    infrastructure::{imaging::traits::PhotoProcessor, storage::traits::StorageService},
    presentation::http::handlers::upload::UploadPolicy,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub upload_policy: Arc<UploadPolicy>,
    pub config: Config,
    pub tour_insights: Arc<TourInsightsUseCase>,
    pub tour_photos: Arc<TourPhotosUseCase>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn StorageService>,
        photo_processor: Arc<dyn PhotoProcessor>,
    ) -> Self {
        let upload_policy = Arc::new(UploadPolicy::tour_photos(config.max_upload_bytes));
        let tour_insights = Arc::new(TourInsightsUseCase::new(store.clone()));
        let tour_photos = Arc::new(TourPhotosUseCase::new(
            ResourceService::new(store.clone()),
            photo_processor,
            storage,
        ));

        Self {
            store,
            upload_policy,
            config,
            tour_insights,
            tour_photos,
        }
    }
}
