use super::pipeline::{Filter, Pipeline};
use crate::domain::shared::errors::DomainError;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

/// Field every stored document carries as its identifier.
pub const ID_FIELD: &str = "_id";

/// Attaches documents from another collection whose `foreign_field` equals the
/// parent's `_id`, under `as_field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Populate {
    pub from: String,
    pub foreign_field: String,
    pub as_field: String,
}

impl Populate {
    pub fn new(from: &str, foreign_field: &str, as_field: &str) -> Self {
        Self {
            from: from.to_string(),
            foreign_field: foreign_field.to_string(),
            as_field: as_field.to_string(),
        }
    }
}

/// Schemaless collection store. Documents are JSON objects keyed by `_id`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn aggregate(&self, collection: &str, pipeline: &Pipeline)
    -> Result<Vec<Value>, DomainError>;
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, DomainError>;
    async fn find_by_id(
        &self,
        collection: &str,
        id: Uuid,
        populate: &[Populate],
    ) -> Result<Option<Value>, DomainError>;
    /// Inserts `document`, assigning `_id` (UUID v7) and `createdAt` when absent.
    async fn insert(&self, collection: &str, document: Value) -> Result<Value, DomainError>;
    /// Shallow-merges `changes` into the stored document and returns the result.
    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        changes: Value,
    ) -> Result<Option<Value>, DomainError>;
    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, DomainError>;
    async fn ping(&self) -> Result<(), DomainError>;
}

/// Fills in `_id` and `createdAt` the way every backend stores new documents.
pub fn prepare_new_document(document: Value) -> Result<(Uuid, Value), DomainError> {
    let Value::Object(mut map) = document else {
        return Err(DomainError::ValidationError(
            "Document must be a JSON object".into(),
        ));
    };

    let id = match map.get(ID_FIELD).and_then(Value::as_str) {
        Some(raw) => Uuid::parse_str(raw)
            .map_err(|_| DomainError::ValidationError(format!("Invalid _id: {raw}")))?,
        None => Uuid::now_v7(),
    };
    map.insert(ID_FIELD.into(), Value::String(id.to_string()));
    map.entry("createdAt").or_insert_with(|| {
        Value::String(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
    });

    Ok((id, Value::Object(map)))
}

/// Rejects patches that are not objects or that try to rewrite `_id`.
pub fn sanitize_changes(changes: Value) -> Result<serde_json::Map<String, Value>, DomainError> {
    let Value::Object(mut map) = changes else {
        return Err(DomainError::ValidationError(
            "Update must be a JSON object".into(),
        ));
    };
    map.remove(ID_FIELD);
    Ok(map)
}
