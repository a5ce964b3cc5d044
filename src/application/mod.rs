pub mod errors;
pub mod resource_factory;
pub mod tour_insights;
pub mod tour_photos;
