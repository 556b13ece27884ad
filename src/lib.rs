pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;
use crate::services::{SqliteMetadataStore, StorageService};
use crate::storage::{LocalStorage, PathGuard};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub storage: Arc<StorageService>,
}

impl AppState {
    /// Open the database, run migrations and wire the storage pipeline.
    /// Fails if the encryption key or upload root is unusable.
    pub async fn build(config: Config) -> anyhow::Result<Self> {
        let cipher = config.cipher()?;

        let db = Database::new(&config.database.path).await?;
        db.run_migrations().await?;
        tracing::info!("Database initialized");

        let guard = PathGuard::new(&config.storage.upload_path)?;
        let metadata = Arc::new(SqliteMetadataStore::new(db.clone()));
        let storage = Arc::new(StorageService::new(
            cipher,
            LocalStorage::new(guard),
            metadata,
        ));

        Ok(Self {
            db,
            config: Arc::new(config),
            storage,
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/files",
            get(handlers::file::list_files).post(handlers::file::upload_file),
        )
        .route(
            "/files/:id",
            get(handlers::file::download_file).delete(handlers::file::delete_file),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .nest("/api/v1", public_routes.merge(protected_routes))
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
