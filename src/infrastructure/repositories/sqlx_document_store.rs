use super::pipeline_sql::build_pipeline_query;
use crate::domain::{
    document::{
        pipeline::{Filter, Pipeline},
        store::{DocumentStore, Populate, prepare_new_document, sanitize_changes},
    },
    shared::errors::DomainError,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, types::Json};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Document store over a single Postgres `documents` table (one JSONB row per document).
pub struct SqlxDocumentStore {
    pub pool: PgPool,
}

impl SqlxDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        info!("Initializing SqlxDocumentStore with connection pool");
        Self { pool }
    }

    async fn related(
        &self,
        populate: &Populate,
        id: Uuid,
    ) -> Result<Value, DomainError> {
        let path: Vec<String> = populate.foreign_field.split('.').map(str::to_string).collect();
        sqlx::query_scalar::<_, Json<Value>>(
            "SELECT COALESCE(jsonb_agg(doc ORDER BY created_at, id), '[]'::jsonb) \
             FROM documents WHERE collection = $1 AND doc #>> $2::text[] = $3",
        )
        .bind(&populate.from)
        .bind(path)
        .bind(id.to_string())
        .fetch_one(&self.pool)
        .await
        .map(|Json(v)| v)
        .map_err(|e| {
            error!("Failed to populate {} for {}: {}", populate.as_field, id, e);
            DomainError::InfrastructureError(e.to_string())
        })
    }
}

#[async_trait]
impl DocumentStore for SqlxDocumentStore {
    #[instrument(skip(self, pipeline), fields(stages = pipeline.stages().len()))]
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> Result<Vec<Value>, DomainError> {
        debug!("Running pipeline: {}", pipeline.to_json());
        let mut qb = build_pipeline_query(collection, pipeline)?;

        let rows = qb
            .build_query_scalar::<Json<Value>>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Aggregation on {} failed: {}", collection, e);
                DomainError::InfrastructureError(e.to_string())
            })?;

        debug!("Aggregation returned {} documents", rows.len());
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    #[instrument(skip(self, filter))]
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>, DomainError> {
        self.aggregate(collection, &Pipeline::new().matching(filter.clone()))
            .await
    }

    #[instrument(skip(self, populate), fields(document_id = %id))]
    async fn find_by_id(
        &self,
        collection: &str,
        id: Uuid,
        populate: &[Populate],
    ) -> Result<Option<Value>, DomainError> {
        let doc = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT doc FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch {} {}: {}", collection, id, e);
            DomainError::InfrastructureError(e.to_string())
        })?;

        let Some(Json(mut doc)) = doc else {
            debug!("No document {} in {}", id, collection);
            return Ok(None);
        };

        for p in populate {
            let related = self.related(p, id).await?;
            if let Value::Object(map) = &mut doc {
                map.insert(p.as_field.clone(), related);
            }
        }
        Ok(Some(doc))
    }

    #[instrument(skip(self, document))]
    async fn insert(&self, collection: &str, document: Value) -> Result<Value, DomainError> {
        let (id, doc) = prepare_new_document(document)?;

        let Json(stored) = sqlx::query_scalar::<_, Json<Value>>(
            "INSERT INTO documents (collection, id, doc) VALUES ($1, $2, $3) RETURNING doc",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(doc))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DomainError::ValidationError(format!("Duplicate _id: {id}"))
            }
            e => {
                error!("Failed to insert into {}: {}", collection, e);
                DomainError::InfrastructureError(e.to_string())
            }
        })?;

        info!("Inserted document {} into {}", id, collection);
        Ok(stored)
    }

    #[instrument(skip(self, changes), fields(document_id = %id))]
    async fn update(
        &self,
        collection: &str,
        id: Uuid,
        changes: Value,
    ) -> Result<Option<Value>, DomainError> {
        let changes = sanitize_changes(changes)?;

        let updated = sqlx::query_scalar::<_, Json<Value>>(
            "UPDATE documents SET doc = doc || $3, updated_at = NOW() \
             WHERE collection = $1 AND id = $2 RETURNING doc",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(changes)))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to update {} {}: {}", collection, id, e);
            DomainError::InfrastructureError(e.to_string())
        })?;

        Ok(updated.map(|Json(doc)| doc))
    }

    #[instrument(skip(self), fields(document_id = %id))]
    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete {} {}: {}", collection, id, e);
                DomainError::InfrastructureError(e.to_string())
            })?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Deleted document {} from {}", id, collection);
        } else {
            debug!("No document {} in {} to delete", id, collection);
        }
        Ok(deleted)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| DomainError::InfrastructureError(e.to_string()))
    }
}
