//! CropCare Backend Server
//!
//! Records leaf-disease detections uploaded by the mobile app, classifies
//! their severity, derives care advice and rolls recent detections up into
//! regional alerts.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       CROPCARE SERVER                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌────────────┐  ┌─────────────────────────┐  │
//! │  │  HTTP API │  │  Severity  │  │  Regional Alert         │  │
//! │  │  (Axum)   │─▶│  Advisory  │  │  Aggregator (fan-out)   │  │
//! │  └─────┬─────┘  └────────────┘  └────────────┬────────────┘  │
//! │        └──────────────┬──────────────────────┘               │
//! │                       ▼                                      │
//! │       ┌──────────────────────────────┐  ┌────────────────┐   │
//! │       │ DetectionRepository          │  │ Environment    │   │
//! │       │ (PostgreSQL or in-memory)    │  │ Provider       │   │
//! │       └──────────────────────────────┘  └────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod error;
mod handlers;
mod logic;
mod media;
mod middleware;
mod models;
mod providers;
mod repository;

#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, EnvironmentSource, StorageBackend, DEV_JWT_SECRET};
use crate::media::PhotoStore;
use crate::providers::{EnvironmentProvider, HttpEnvironmentProvider, MockEnvironmentProvider};
use crate::repository::{
    DetectionRepository, InMemoryDetectionRepository, InMemoryProfileRepository,
    PgDetectionRepository, PgProfileRepository, ProfileRepository,
};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env();

    tracing::info!("CropCare Server starting ({})...", config.environment);
    if config.is_production() && config.jwt_secret == DEV_JWT_SECRET {
        tracing::warn!("JWT_SECRET is the development default in production");
    }

    let (detections, profiles) = build_repositories(&config).await?;
    let environment = build_environment_provider(&config)?;

    let photos = PhotoStore::new(&config.media_root);
    tracing::info!("Photos stored under {}", photos.root().display());

    let state = AppState {
        detections,
        profiles,
        environment,
        photos,
        config: config.clone(),
    };

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Plain text logs by default, JSON lines when `LOG_FORMAT=json`
fn init_tracing() {
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cropcare_server=debug,tower_http=debug".into()),
        )
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .init();
}

async fn build_repositories(
    config: &Config,
) -> anyhow::Result<(Arc<dyn DetectionRepository>, Arc<dyn ProfileRepository>)> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            tracing::info!(
                "Database: {}",
                config.database_url.split('@').last().unwrap_or("***")
            );

            let pool = db::create_pool(&config.database_url, config.repository_timeout)
                .await
                .context("Failed to create database pool")?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;

            Ok((
                Arc::new(PgDetectionRepository::new(pool.clone(), config.repository_timeout)),
                Arc::new(PgProfileRepository::new(pool, config.repository_timeout)),
            ))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store, records are lost on restart");
            Ok((
                Arc::new(InMemoryDetectionRepository::new()),
                Arc::new(InMemoryProfileRepository::new()),
            ))
        }
    }
}

fn build_environment_provider(config: &Config) -> anyhow::Result<Arc<dyn EnvironmentProvider>> {
    match &config.environment_source {
        EnvironmentSource::Mock => {
            tracing::info!("Weather provider: mock");
            Ok(Arc::new(MockEnvironmentProvider::new()))
        }
        EnvironmentSource::Http { base_url } => {
            tracing::info!("Weather provider: {}", base_url);
            let provider = HttpEnvironmentProvider::new(base_url.clone(), config.environment_timeout)
                .context("Failed to build weather provider client")?;
            Ok(Arc::new(provider))
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub detections: Arc<dyn DetectionRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub environment: Arc<dyn EnvironmentProvider>,
    pub photos: PhotoStore,
    pub config: Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/ping", get(handlers::health::ping))
        // Detections
        .route(
            "/detections",
            get(handlers::detections::list).post(handlers::detections::create),
        )
        .route("/detections/:id", get(handlers::detections::get))
        .route("/detections/:id/advice", post(handlers::detections::refresh_advice))
        // Advisory and alerts
        .route("/tips", get(handlers::tips::get))
        .route("/alerts", get(handlers::alerts::list))
        // Environment passthrough
        .route("/weather", get(handlers::environment::weather))
        .route("/air", get(handlers::environment::air))
        // Profile (bearer token required)
        .route("/me", get(handlers::profile::me))
        .route("/me/update", post(handlers::profile::update));

    Router::new()
        .route("/health", get(handlers::health::check))
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(TimeoutLayer::new(state.config.request_timeout))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
