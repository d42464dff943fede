//! # chatter-store
//!
//! Durable fallback cache for the chat client, backed by SQLite.
//!
//! The store is a plain key/value table. The message list lives under one
//! fixed key as JSON text and is always overwritten whole; nothing here
//! indexes or patches individual messages.

pub mod cache;
pub mod database;
pub mod migrations;

mod error;

pub use database::Database;
pub use error::StoreError;
