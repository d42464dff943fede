//! # chatter-sync
//!
//! The connectivity-aware message sync engine.
//!
//! [`SyncEngine`] owns the message list shown to the user. It switches between
//! a live remote subscription and the local durable cache as reachability
//! changes, writes every remote snapshot through to the cache, and forwards
//! sends to the remote channel. The three collaborators are injected through
//! the traits in [`adapters`]; [`remote`] and [`sqlite`] bind them to the
//! HTTP channel, health probe and SQLite store.

pub mod adapters;
pub mod engine;
pub mod merge;
pub mod remote;
pub mod sqlite;

mod cache_worker;
mod error;

#[cfg(test)]
mod fakes;

pub use adapters::{
    ConnectivityMonitor, DurableCache, RemoteChannel, SnapshotSink, SubscriptionHandle,
    SubscriptionId,
};
pub use engine::{MessageSender, SyncEngine};
pub use error::SyncError;
pub use sqlite::SqliteCache;
