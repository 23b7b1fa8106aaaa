//! # carnet-server
//!
//! Web server for the Carnet note-taking application.
//!
//! This binary provides:
//! - **Registration and session login** (argon2id password hashes, opaque
//!   session tokens in an HttpOnly cookie)
//! - **Ownership-scoped notes and folders**: every read and write is filtered
//!   by the acting user, so accounts cannot see or touch each other's data
//! - **Regex search** over a user's own notes
//! - **Admin governance**: user listing, admin-flag toggling and cascading
//!   account deletion, with self-targeting refused
//! - **Server-rendered HTML** views with one-shot flash notices

mod api;
mod auth;
mod config;
mod error;
mod flash;
mod sessions;
mod views;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use carnet_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::sessions::SessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,carnet_server=debug")),
        )
        .init();

    info!("Starting Carnet server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Database (platform data dir unless DB_PATH overrides it)
    let db = match &config.db_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };

    // In-memory session table
    let sessions = SessionStore::new(chrono::Duration::seconds(config.session_ttl_secs));

    let state = AppState {
        db: Arc::new(Mutex::new(db)),
        sessions: sessions.clone(),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic session cleanup (every 5 minutes, evict expired records)
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            sessions.purge_expired().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, config.http_addr) => {
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
