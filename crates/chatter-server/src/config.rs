//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the service starts with zero configuration
//! for local development.

use std::net::SocketAddr;
use std::time::Duration;

use chatter_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_WATCH_TIMEOUT_SECS};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP API.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// How long a watch request is held open waiting for a change.
    /// Env: `WATCH_TIMEOUT_SECS`
    /// Default: `25`
    pub watch_timeout: Duration,

    /// Oldest messages beyond this count are dropped (0 = unlimited).
    /// Env: `MAX_MESSAGES`
    /// Default: `0`
    pub max_messages: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            watch_timeout: Duration::from_secs(DEFAULT_WATCH_TIMEOUT_SECS),
            max_messages: 0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(val) = lookup("WATCH_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.watch_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid WATCH_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(val) = lookup("MAX_MESSAGES") {
            match val.parse::<usize>() {
                Ok(n) => config.max_messages = n,
                Err(_) => tracing::warn!(value = %val, "Invalid MAX_MESSAGES, using default"),
            }
        }

        config
    }
}
