//! Trust-List server entry point.
//!
//! Loads configuration, opens the storage backend, bootstraps the admin
//! account, then starts the Axum HTTP server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use trustlist_core::credentials::BcryptHasher;
use trustlist_core::gate::GateMode;
use trustlist_core::token::TokenService;
use trustlist_storage::{MemoryBackend, StorageBackend};

use trustlist_server::build_router;
use trustlist_server::config::{ServerConfig, StoreUrl};
use trustlist_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid configuration")?;

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(store = ?config.store, "Trust-List starting");

    let state = build_app_state(&config).await?;
    let app = build_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "Trust-List server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Trust-List server stopped");
    Ok(())
}

/// Open storage and build the shared application state.
async fn build_app_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let storage = open_storage(&config.store).await?;

    let tokens = TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl);
    let mode = if config.trust_unverified_role {
        GateMode::DecodeOnly
    } else {
        GateMode::Verified
    };
    let hasher = Arc::new(BcryptHasher::default());

    let state = AppState::new(storage, tokens, mode, hasher)
        .context("failed to initialize credential verifier")?;

    if let Some(admin) = &config.admin {
        state
            .bootstrap_admin(admin)
            .await
            .context("failed to bootstrap admin account")?;
    }

    let accounts = state
        .users
        .emails()
        .await
        .context("failed to list user accounts")?;
    if accounts.is_empty() {
        warn!("no user accounts exist; set TRUSTLIST_ADMIN_EMAIL and TRUSTLIST_ADMIN_PASSWORD_HASH");
    } else {
        info!(accounts = accounts.len(), "user directory loaded");
    }

    Ok(Arc::new(state))
}

/// Bootstrap the storage backend named by `store`.
async fn open_storage(store: &StoreUrl) -> anyhow::Result<Arc<dyn StorageBackend>> {
    let storage: Arc<dyn StorageBackend> = match store {
        StoreUrl::Memory => {
            info!("using in-memory storage (data will not persist)");
            Arc::new(MemoryBackend::new())
        }
        #[cfg(feature = "rocksdb-backend")]
        StoreUrl::RocksDb { path } => {
            info!(path = %path, "using RocksDB storage");
            Arc::new(
                trustlist_storage::RocksDbBackend::open(path)
                    .context("failed to open RocksDB storage")?,
            )
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        StoreUrl::RocksDb { .. } => {
            anyhow::bail!("RocksDB backend requested but feature 'rocksdb-backend' is not enabled");
        }
        #[cfg(feature = "postgres-backend")]
        StoreUrl::Postgres { url } => {
            info!(url = %"[redacted]", "using PostgreSQL storage");
            Arc::new(
                trustlist_storage::PostgresBackend::connect(url)
                    .await
                    .context("failed to connect to PostgreSQL storage")?,
            )
        }
        #[cfg(not(feature = "postgres-backend"))]
        StoreUrl::Postgres { .. } => {
            anyhow::bail!(
                "PostgreSQL backend requested but feature 'postgres-backend' is not enabled"
            );
        }
    };
    Ok(storage)
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
