use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod cache;
mod config;
mod db;
mod decimal;
mod engine;
mod models;
mod utils;

use crate::cache::depth::DepthCache;
use crate::cache::redis_client::{RedisClient, RedisConfig};
use crate::config::AppConfig;
use crate::db::Database;
use crate::engine::MatchingEngine;

pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    pub depth_cache: Arc<DepthCache>,
    pub matching_engine: Arc<MatchingEngine>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spotx_matcher=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;

    tracing::info!("Starting spotx-matcher v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.environment);

    let db = Database::connect(&config.database_url).await?;
    tracing::info!("Database connected");

    let redis = Arc::new(RedisClient::new(RedisConfig {
        url: config.redis_url.clone(),
        ..Default::default()
    }).await?);
    tracing::info!("Depth cache connected to Redis at {}", config.redis_url);

    let depth_cache = Arc::new(DepthCache::new(redis, db.pool.clone()));
    let matching_engine = Arc::new(MatchingEngine::new(db.pool.clone(), depth_cache.clone()));

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        depth_cache,
        matching_engine,
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::routes::create_router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
