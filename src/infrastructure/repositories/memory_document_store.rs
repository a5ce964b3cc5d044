use super::pipeline_eval::{self, get_path};
use crate::domain::{
    document::{
        pipeline::{Filter, Pipeline},
        store::{DocumentStore, ID_FIELD, Populate, prepare_new_document, sanitize_changes},
    },
    shared::errors::DomainError,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Document store held in process memory.
///
/// Backs local development (`STORE_BACKEND=memory`) and the HTTP tests. Collections
/// keep insertion order, which is the natural order seen by pipelines.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        info!("Initializing InMemoryDocumentStore");
        Self::default()
    }

    /// Inserts every document of `docs` into `collection`, returning how many were stored.
    pub async fn seed(&self, collection: &str, docs: Vec<Value>) -> Result<usize, DomainError> {
        let mut count = 0;
        for doc in docs {
            self.insert(collection, doc).await?;
            count += 1;
        }
        info!(collection, count, "Seeded in-memory collection");
        Ok(count)
    }

    fn id_matches(doc: &Value, id: &str) -> bool {
        doc.get(ID_FIELD).and_then(Value::as_str) == Some(id)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    #[instrument(skip(self, pipeline), fields(stages = pipeline.stages().len()))]
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<Vec<Value>, DomainError> {
        let docs = {
            let guard = self.collections.read().await;
            guard.get(collection).cloned().unwrap_or_default()
        };
        let out = pipeline_eval::run(pipeline, docs);
        debug!("Aggregation returned {} documents", out.len());
        Ok(out)
    }

    #[instrument(skip(self, filter))]
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, DomainError> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| pipeline_eval::matches(filter, d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    #[instrument(skip(self, populate))]
    async fn find_by_id(
        &self,
        collection: &str,
        id: Uuid,
        populate: &[Populate],
    ) -> Result<Option<Value>, DomainError> {
        let guard = self.collections.read().await;
        let id = id.to_string();

        let Some(mut doc) = guard
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| Self::id_matches(d, &id)))
            .cloned()
        else {
            return Ok(None);
        };

        for p in populate {
            let related: Vec<Value> = guard
                .get(&p.from)
                .map(|docs| {
                    docs.iter()
                        .filter(|d| get_path(d, &p.foreign_field).and_then(Value::as_str) == Some(id.as_str()))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            if let Value::Object(map) = &mut doc {
                map.insert(p.as_field.clone(), Value::Array(related));
            }
        }

        Ok(Some(doc))
    }

    #[instrument(skip(self, document))]
    async fn insert(&self, collection: &str, document: Value) -> Result<Value, DomainError> {
        let (id, doc) = prepare_new_document(document)?;
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();

        let id = id.to_string();
        if docs.iter().any(|d| Self::id_matches(d, &id)) {
            return Err(DomainError::ValidationError(format!("Duplicate _id: {id}")));
        }
        docs.push(doc.clone());
        debug!(%id, "Inserted document");
        Ok(doc)
    }

    #[instrument(skip(self, changes))]
    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        changes: Value,
    ) -> Result<Option<Value>, DomainError> {
        let changes = sanitize_changes(changes)?;
        let mut guard = self.collections.write().await;
        let id = id.to_string();

        let Some(doc) = guard
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| Self::id_matches(d, &id)))
        else {
            return Ok(None);
        };
        if let Value::Object(map) = &mut *doc {
            map.extend(changes);
        }
        Ok(Some(doc.clone()))
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, DomainError> {
        let mut guard = self.collections.write().await;
        let id = id.to_string();
        let Some(docs) = guard.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| !Self::id_matches(d, &id));
        Ok(docs.len() < before)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
