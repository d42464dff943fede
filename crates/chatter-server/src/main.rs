//! # chatter-server
//!
//! The message service behind the chat client.
//!
//! This binary provides:
//! - the ordered `messages` collection, held in memory with server-assigned
//!   ids and send times
//! - versioned full snapshots and a long-poll watch endpoint that the client's
//!   subscription loop sits on
//! - a `/health` endpoint used by the client's connectivity probe

mod api;
mod config;
mod error;
mod store;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::store::MessageStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,chatter_server=debug")),
        )
        .init();

    info!("Starting Chatter message service v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Build state and serve
    // -----------------------------------------------------------------------
    let app_state = AppState {
        store: Arc::new(MessageStore::new(config.max_messages)),
        config: Arc::new(config.clone()),
    };

    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
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
