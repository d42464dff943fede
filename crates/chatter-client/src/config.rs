//! Client configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use chatter_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_PROBE_INTERVAL_SECS};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the message service.
    /// Env: `CHATTER_SERVER_URL`
    /// Default: `http://127.0.0.1:8080`
    pub server_url: String,

    /// Stable id of the local user.
    /// Env: `CHATTER_USER_ID`
    /// Default: a fresh random id per run.
    pub user_id: String,

    /// Display name shown next to messages. Blank falls back to "Chatter".
    /// Env: `CHATTER_NAME`
    pub display_name: Option<String>,

    /// Cache database location.
    /// Env: `CHATTER_DB_PATH`
    /// Default: the platform data directory.
    pub db_path: Option<PathBuf>,

    /// Time between reachability probes.
    /// Env: `CHATTER_PROBE_INTERVAL_SECS`
    /// Default: `5`
    pub probe_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: format!("http://127.0.0.1:{DEFAULT_HTTP_PORT}"),
            user_id: uuid::Uuid::new_v4().simple().to_string(),
            display_name: None,
            db_path: None,
            probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("CHATTER_SERVER_URL") {
            config.server_url = url.trim_end_matches('/').to_string();
        }

        if let Some(id) = lookup("CHATTER_USER_ID").filter(|id| !id.trim().is_empty()) {
            config.user_id = id.trim().to_string();
        }

        config.display_name = lookup("CHATTER_NAME");

        if let Some(path) = lookup("CHATTER_DB_PATH") {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(val) = lookup("CHATTER_PROBE_INTERVAL_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.probe_interval = Duration::from_secs(secs),
                _ => tracing::warn!(
                    value = %val,
                    "Invalid CHATTER_PROBE_INTERVAL_SECS, using default"
                ),
            }
        }

        config
    }
}
