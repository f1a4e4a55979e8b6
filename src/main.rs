//! Campaign Keeper - Main Application Entry Point
//!
//! A REST API backend for running tabletop role-playing campaigns: player
//! characters, NPC rosters, session logs, a world map with pins and a dice
//! roller, behind user accounts.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: Session tokens (SHA-256 hashed at rest), Argon2 passwords,
//!   emailed password-reset and magic-link tokens
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod extract;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod test_support;
mod validation;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{services::mail_service::Mailer, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    url::Url::parse(&config.app_base_url)
        .map_err(|e| anyhow::anyhow!("APP_BASE_URL is not a valid URL: {e}"))?;

    let mailer = Mailer::from_config(&config)?;
    if config.mail_hook_url.is_none() {
        tracing::warn!("MAIL_HOOK_URL not set; auth emails will only be logged");
    }

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let addr = format!("0.0.0.0:{}", config.server_port);

    let app = routes::build_router(AppState {
        pool,
        config: Arc::new(config),
        mailer,
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
