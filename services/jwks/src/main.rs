use anyhow::Context;
use jwks_service::crypto::Cipher;
use jwks_service::http::{self, AppState, ServiceOptions};
use jwks_service::shutdown;
use jwks_service::storage::SqliteStorage;
use jwks_service::Config;
use rust_common::init_tracing;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// How often idle rate-limit entries are dropped.
const LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(&config.tracing);

    info!(?config, "Starting JWKS service");

    let storage = Arc::new(
        SqliteStorage::connect(&config.database_url)
            .await
            .context("failed to open database")?,
    );
    let cipher = Cipher::new(&config.encryption_key[..]).context("invalid encryption key")?;
    let state = AppState::new(storage, cipher, ServiceOptions::from(&config));

    state
        .key_manager
        .seed(config.expired_key_lifetime, config.fresh_key_lifetime)
        .await
        .context("failed to seed signing keys")?;

    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(LIMITER_PRUNE_INTERVAL);
        loop {
            ticker.tick().await;
            limiter.prune().await;
        }
    });

    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!(addr = %listener.local_addr()?, "JWKS service listening");

    let server = axum::serve(
        listener,
        http::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown::wait_for_signal())
    .into_future();

    shutdown::run_until_drained(server, shutdown::wait_for_signal(), config.shutdown_timeout)
        .await
        .context("server error")?;

    Ok(())
}
