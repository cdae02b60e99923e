//! Keygate - A lightweight session and authentication service

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keygate::{
    api::{self, AppState, RequestStats},
    cache::create_cache,
    config::Config,
    db::{self, repositories::SqlxUserRepository},
    services::{session::SessionService, token::TokenCodec},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keygate=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Keygate...");

    // Load and validate configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    config.validate()?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Initialize token cache
    let cache = create_cache(&config.cache).await?;
    tracing::info!("Token cache initialized: {:?}", config.cache.driver);

    // Wire the session service
    let users = SqlxUserRepository::boxed(pool.clone());
    let codec = TokenCodec::new(&config.auth.access_secret)?;
    let sessions = Arc::new(SessionService::new(
        users,
        cache,
        codec,
        config.auth.expire_seconds,
    ));

    let state = AppState {
        sessions,
        request_stats: Arc::new(RequestStats::new()),
    };

    // Build router
    let app = api::build_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
