use chatter_shared::ChannelError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The remote write failed; nothing was added to the message list.
    #[error("Send failed: {0}")]
    Channel(#[from] ChannelError),

    /// The engine was torn down (or never started) before the call.
    #[error("Sync engine is closed")]
    Closed,
}
