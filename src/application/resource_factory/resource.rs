use crate::domain::{
    document::store::Populate,
    tour::entity::{NewTour, REVIEWS_COLLECTION, TOURS_COLLECTION, TourPatch},
};
use serde::{Serialize, de::DeserializeOwned};
use validator::Validate;

/// A document type the generic CRUD handlers can serve.
pub trait Resource: Send + Sync + 'static {
    const COLLECTION: &'static str;

    /// Body accepted by `createOne`.
    type Create: DeserializeOwned + Serialize + Validate + Send;

    /// Partial body accepted by `updateOne`; absent fields must not serialize.
    type Update: DeserializeOwned + Serialize + Validate + Send;

    /// Relations attached by `getOne`.
    fn populate() -> Vec<Populate> {
        Vec::new()
    }
}

pub struct TourResource;

impl Resource for TourResource {
    const COLLECTION: &'static str = TOURS_COLLECTION;
    type Create = NewTour;
    type Update = TourPatch;

    fn populate() -> Vec<Populate> {
        vec![Populate::new(REVIEWS_COLLECTION, "tour", "reviews")]
    }
}
