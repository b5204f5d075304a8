//! # Contacts API Server
//!
//! Serves the contacts REST API: registration and login, password reset,
//! email confirmation, user profiles with avatars, and per-user contacts.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/contacts JWT_SECRET=... cargo run -p contacts-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines and `RUST_LOG` to override the
//! default filter.

use anyhow::Context;
use contacts_api::{
    app::{build_router, AppState},
    config::Config,
    middleware::rate_limit::RateLimiter,
};
use contacts_shared::{
    db::{migrations, pool},
    redis::{client::sanitize_url, RedisClient, RedisConfig},
    services::{avatar::CloudinaryImageHost, email::SmtpEmailSender},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Contacts API v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("Failed to load configuration")?;

    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to connect to database")?;

    migrations::run_migrations(&db)
        .await
        .context("Failed to run migrations")?;

    let mailer = Arc::new(SmtpEmailSender::new(config.mail.clone())?);
    let images = Arc::new(CloudinaryImageHost::new(config.cloudinary.clone())?);
    let rate_limiter = connect_rate_limiter(config.redis_url.as_deref()).await;

    let addr = config.bind_address();
    let mut state = AppState::new(db.clone(), config, mailer, images)?;
    if let Some(limiter) = rate_limiter {
        state = state.with_rate_limiter(limiter);
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Server stopped");

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "contacts_api=debug,contacts_shared=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Rate limiting is disabled when Redis is not configured or unreachable
async fn connect_rate_limiter(url: Option<&str>) -> Option<RateLimiter> {
    let Some(url) = url else {
        tracing::warn!("REDIS_URL not set, rate limiting disabled");
        return None;
    };

    match RedisClient::new(RedisConfig::new(url)).await {
        Ok(client) => {
            tracing::info!(url = %sanitize_url(url), "Rate limiting enabled");
            Some(RateLimiter::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, rate limiting disabled");
            None
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
