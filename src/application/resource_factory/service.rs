use super::resource::Resource;
use crate::{
    application::errors::ApplicationError,
    domain::{
        document::store::DocumentStore,
        shared::{errors::DomainError, list_query::ListQuery},
    },
};
use serde_json::Value;
use std::{collections::BTreeMap, marker::PhantomData, sync::Arc};
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

pub const NOT_FOUND_MESSAGE: &str = "No document found with that ID";

/// CRUD over one collection, shared by every [`Resource`].
pub struct ResourceService<R: Resource> {
    store: Arc<dyn DocumentStore>,
    _resource: PhantomData<R>,
}

impl<R: Resource> ResourceService<R> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _resource: PhantomData,
        }
    }

    /// Lists documents using `?field[op]=value&sort=..&fields=..&page=..&limit=..`.
    #[instrument(skip(self), fields(collection = R::COLLECTION))]
    pub async fn get_many(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<Vec<Value>, ApplicationError> {
        let query = ListQuery::from_params(params)?;
        let docs = self
            .store
            .aggregate(R::COLLECTION, &query.into_pipeline())
            .await?;
        debug!("Listed {} documents", docs.len());
        Ok(docs)
    }

    #[instrument(skip(self), fields(collection = R::COLLECTION))]
    pub async fn get_one(&self, id: &str) -> Result<Value, ApplicationError> {
        let id = parse_id(id)?;
        self.store
            .find_by_id(R::COLLECTION, id, &R::populate())
            .await?
            .ok_or_else(not_found)
    }

    #[instrument(skip(self, body), fields(collection = R::COLLECTION))]
    pub async fn create(&self, body: &[u8]) -> Result<Value, ApplicationError> {
        let input: R::Create = serde_json::from_slice(body)?;
        input.validate()?;

        let doc = self
            .store
            .insert(R::COLLECTION, serde_json::to_value(&input)?)
            .await?;
        info!("Created document {}", doc["_id"]);
        Ok(doc)
    }

    #[instrument(skip(self, body), fields(collection = R::COLLECTION))]
    pub async fn update(&self, id: &str, body: &[u8]) -> Result<Value, ApplicationError> {
        let id = parse_id(id)?;
        let changes: R::Update = serde_json::from_slice(body)?;
        changes.validate()?;
        self.apply(id, serde_json::to_value(&changes)?).await
    }

    /// Merges already-validated `changes` into the document.
    pub async fn apply(&self, id: Uuid, changes: Value) -> Result<Value, ApplicationError> {
        self.store
            .update(R::COLLECTION, id, changes)
            .await?
            .ok_or_else(not_found)
    }

    #[instrument(skip(self), fields(collection = R::COLLECTION))]
    pub async fn delete(&self, id: &str) -> Result<(), ApplicationError> {
        let id = parse_id(id)?;
        if self.store.delete(R::COLLECTION, id).await? {
            info!("Deleted document {}", id);
            Ok(())
        } else {
            Err(not_found())
        }
    }

    /// Fails with 404 unless a document with `id` exists.
    pub async fn ensure_exists(&self, id: Uuid) -> Result<(), ApplicationError> {
        self.store
            .find_by_id(R::COLLECTION, id, &[])
            .await?
            .map(|_| ())
            .ok_or_else(not_found)
    }
}

pub fn parse_id(raw: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| DomainError::ValidationError(format!("Invalid _id: {raw}")))
}

fn not_found() -> ApplicationError {
    DomainError::NotFound(NOT_FOUND_MESSAGE.into()).into()
}
