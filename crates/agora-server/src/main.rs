//! # agora-server
//!
//! Realtime messaging server for Agora.
//!
//! This binary provides:
//! - **Websocket sessions** at `/ws` exchanging JSON frames
//! - **Fan-out** of new and edited messages to connected participants
//! - **SQLite persistence** of conversations, messages and presence
//! - **REST API** (axum) for health checks and conversation management

use agora_shared::constants::APP_NAME;
use agora_store::Database;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use agora_server::api::{self, AppState};
use agora_server::config::ServerConfig;
use agora_server::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Load .env (if any) and initialize tracing (respects RUST_LOG)
    // -----------------------------------------------------------------------
    let dotenv_loaded = dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,agora_server=debug")),
        )
        .init();

    info!("Starting {} server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv_loaded {
        info!(path = %path.display(), "Loaded environment file");
    }

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    if config.jwt_secret.is_none() {
        warn!("JWT_SECRET is not set; realtime sessions trust the client-supplied userID");
    }

    // -----------------------------------------------------------------------
    // 3. Open the database
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Database::open_at(path)?
        }
        None => Database::new()?,
    };

    let http_addr = config.http_addr;
    let app_state = AppState::new(Store::new(db), config);

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
