//! Equiplend Server - equipment borrowing and returns
//!
//! REST API server for the borrowing lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use equiplend_server::{
    api,
    config::AppConfig,
    repository::Repository,
    services::{
        email::{EmailService, LogNotifier, Notifier},
        otp::{InMemoryOtpStore, OtpStore},
        redis::RedisService,
        Services,
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("equiplend_server={},tower_http=debug", config.logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Equiplend Server v{}", env!("CARGO_PKG_VERSION"));

    let otp_store: Arc<dyn OtpStore> = if config.redis.enabled {
        let redis = RedisService::new(&config.redis.url)
            .await
            .context("Failed to connect to Redis")?;
        tracing::info!("Connected to Redis");
        Arc::new(redis)
    } else {
        tracing::info!("Redis disabled, keeping verification codes in memory");
        Arc::new(InMemoryOtpStore::new())
    };

    let notifier: Arc<dyn Notifier> = if config.email.enabled {
        Arc::new(EmailService::new(config.email.clone()))
    } else {
        tracing::info!("Email disabled, notifications will only be logged");
        Arc::new(LogNotifier)
    };

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    let services = Services::new(Repository::new(), &config, otp_store, notifier);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = api::create_router(state);

    let addr = SocketAddr::new(
        server_host.parse().context("Invalid host address")?,
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
