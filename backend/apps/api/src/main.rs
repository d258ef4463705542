//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `lemon::LemonError`.

mod config;

use anyhow::Context;
use axum::middleware;
use lemon::domain::repository::LemonRepository;
use lemon::presentation::{LemonAppState, lemon_router_with_state};
use lemon::{BootstrapUseCase, InMemoryLemonRepository, LemonServices, PgLemonRepository};
use platform::json_prefix::json_prefix_middleware;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,lemon=info,platform=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let services = LemonServices::builder(config.lemon.clone())
        .smtp(config.smtp.clone())
        .recaptcha_secret_key(config.recaptcha_secret_key.clone())
        .build()
        .context("Failed to configure Lemon services")?;

    match config.database_url.clone() {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;

            tracing::info!("Connected to database");

            sqlx::migrate!("../../../database/migrations")
                .run(&pool)
                .await?;

            tracing::info!("Migrations completed");

            serve(PgLemonRepository::new(pool), services, config).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, users and sessions are kept in memory");
            serve(InMemoryLemonRepository::new(), services, config).await
        }
    }
}

async fn serve<R: LemonRepository>(
    repo: R,
    services: LemonServices,
    config: AppConfig,
) -> anyhow::Result<()> {
    let state = LemonAppState::new(repo, services);

    // First admin and expired session sweep
    let admin = BootstrapUseCase::new(state.repo.clone(), state.services.clone())
        .execute(config.admin)
        .await
        .context("Start-up tasks failed")?;
    if let Some(user_id) = admin {
        tracing::info!(user_id = %user_id, "Initial administrator created");
    }

    let mut app = lemon_router_with_state(state);
    if config.json_prefix {
        app = app.layer(middleware::from_fn(json_prefix_middleware));
    }
    if let Some(cors) = config.cors.layer() {
        app = app.layer(cors);
    }
    let app = app.layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", config.addr);

    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
