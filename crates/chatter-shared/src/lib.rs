//! # chatter-shared
//!
//! Data model, wire records, error types and constants shared by every crate
//! in the workspace.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::{CacheError, ChannelError};
pub use protocol::{OutgoingRecord, RemoteRecord, Snapshot};
pub use types::{
    ConnectivityState, Coordinates, Message, MessageBody, MessageId, MessageList,
    OutgoingMessage, Reachability, Sender,
};
