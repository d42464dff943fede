//! Turning remote snapshots and cache contents into a [`MessageList`].
//!
//! Both paths replace the list wholesale. Remote data is deduplicated and
//! ordered newest first; cached data is only deduplicated, since it was
//! ordered when it was written.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use chatter_shared::{Message, MessageId, MessageList, RemoteRecord};

/// Map one remote record to a message. A record whose server timestamp has
/// not been assigned yet gets `now`.
pub fn resolve_record(record: RemoteRecord, now: DateTime<Utc>) -> Message {
    let sender = record.sender();
    let body = record.body();
    Message {
        id: MessageId(record.id),
        sender,
        sent_at: record.created_at.unwrap_or(now),
        body,
    }
}

/// Build the list for a remote snapshot.
pub fn from_snapshot(records: Vec<RemoteRecord>, now: DateTime<Utc>) -> MessageList {
    let messages = records
        .into_iter()
        .map(|record| resolve_record(record, now))
        .collect();
    let mut messages = dedupe(messages);
    // Stable: equal timestamps keep the channel's order.
    messages.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
    MessageList::new(messages)
}

/// Build the list for a cache load, trusting the cached order.
pub fn from_cache(messages: Vec<Message>) -> MessageList {
    MessageList::new(dedupe(messages))
}

/// Keep the first occurrence of every id.
fn dedupe(messages: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::with_capacity(messages.len());
    messages
        .into_iter()
        .filter(|m| seen.insert(m.id.clone()))
        .collect()
}
