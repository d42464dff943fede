/// Application name
pub const APP_NAME: &str = "Chatter";

/// Display name used when the user did not pick one on the start screen
pub const DEFAULT_DISPLAY_NAME: &str = "Chatter";

/// Fixed durable-cache key holding the serialized message list
pub const MESSAGE_CACHE_KEY: &str = "messages";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// How long the server holds a watch request open before answering with the
/// unchanged snapshot
pub const DEFAULT_WATCH_TIMEOUT_SECS: u64 = 25;

/// Interval between connectivity probes
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;

/// Maximum accepted text payload in bytes (16 KiB)
pub const MAX_TEXT_SIZE: usize = 16 * 1024;
