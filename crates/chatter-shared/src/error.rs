use thiserror::Error;

/// Failures reported by a remote channel adapter.
///
/// The core never retries these; they are handed back to whoever called
/// `send`, or logged by the subscription loop.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote rejected request with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network disabled: remote channel is offline")]
    Offline,

    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Failures reported by a durable cache adapter. Always non-fatal to the
/// engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache storage error: {0}")]
    Storage(String),

    #[error("Cache encode error: {0}")]
    Encode(String),

    #[error("Cache task failed: {0}")]
    TaskFailed(String),
}
