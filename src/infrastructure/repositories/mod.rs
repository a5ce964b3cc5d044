pub mod memory_document_store;
pub mod pipeline_eval;
pub mod pipeline_sql;
pub mod sqlx_document_store;
