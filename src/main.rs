use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use http::{HeaderValue, Method, header};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tours_api::{
    config::{Config, StoreBackend},
    domain::{document::store::DocumentStore, tour::entity::TOURS_COLLECTION},
    infrastructure::{
        database::pool::{create_pool, run_migrations},
        imaging::jpeg_processor::JpegPhotoProcessor,
        repositories::{
            memory_document_store::InMemoryDocumentStore, sqlx_document_store::SqlxDocumentStore,
        },
        storage::local_storage_service::LocalStorageService,
    },
    presentation::http::{routes::create_router, state::AppState},
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Uses RUST_LOG if set, otherwise sensible defaults
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,tours_api=debug,tower_http=debug"))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = Config::from_env()?;
    let store = build_store(&config).await?;

    let storage = Arc::new(LocalStorageService::new(
        &config.upload_dir,
        &config.upload_public_path,
    ));
    let state = AppState::new(
        config.clone(),
        store,
        storage,
        Arc::new(JpegPhotoProcessor::tour_photos()),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    let app = create_router(state)
        .nest_service(&config.upload_public_path, ServeDir::new(&config.upload_dir))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Tours API listening on {} ({} store)", addr, config.store_backend);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres store")?;
            let db = create_pool(url, config.database_max_connections).await?;
            run_migrations(&db, config.ignore_missing_migrations).await?;
            Ok(Arc::new(SqlxDocumentStore::new(db)))
        }
        StoreBackend::Memory => {
            let store = InMemoryDocumentStore::new();
            if let Some(path) = &config.seed_file {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read seed file {path}"))?;
                let docs: Vec<Value> = serde_json::from_str(&raw)
                    .with_context(|| format!("Seed file {path} must hold a JSON array of tours"))?;
                store.seed(TOURS_COLLECTION, docs).await?;
            }
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl+C received, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("SIGTERM received, initiating graceful shutdown");
        }
    }
}
