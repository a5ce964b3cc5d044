use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;
    tracing::info!("Connected to Postgres (max {} connections)", max_connections);
    Ok(pool)
}

/// Applies `./migrations`; the documents table is the only schema the store needs.
pub async fn run_migrations(pool: &PgPool, ignore_missing: bool) -> anyhow::Result<()> {
    let mut migrator = sqlx::migrate!("./migrations");
    migrator.set_ignore_missing(ignore_missing);
    migrator.run(pool).await?;
    Ok(())
}
