//! In-memory ordered `messages` collection.
//!
//! The whole collection lives inside a `watch` channel: every successful
//! append bumps the version and wakes every waiting watch request at once.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use chatter_shared::{OutgoingRecord, RemoteRecord, Snapshot};

use crate::error::ServerError;

pub struct MessageStore {
    tx: watch::Sender<Snapshot>,
    max_messages: usize,
}

impl MessageStore {
    /// `max_messages == 0` keeps everything. Every store gets a fresh epoch,
    /// so clients can tell a restarted server from an unchanged one.
    pub fn new(max_messages: usize) -> Self {
        let epoch = Uuid::new_v4().simple().to_string();
        info!(%epoch, "Message store created");
        let (tx, _rx) = watch::channel(Snapshot {
            epoch,
            ..Snapshot::default()
        });
        Self { tx, max_messages }
    }

    /// Current snapshot, newest first.
    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    /// Validate and store one record, assigning the id (unless the client
    /// chose one) and the send time.
    ///
    /// Re-sending a client id that is already stored returns the stored
    /// record without a new version.
    pub fn append(&self, record: OutgoingRecord) -> Result<RemoteRecord, ServerError> {
        record.validate().map_err(ServerError::BadRequest)?;

        let stored = RemoteRecord {
            id: record
                .id
                .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
            user: record.user,
            created_at: Some(Utc::now()),
            payload: record.payload,
        };

        let mut result = stored.clone();
        let max = self.max_messages;
        let appended = self.tx.send_if_modified(|snapshot| {
            if let Some(existing) = snapshot.messages.iter().find(|m| m.id == stored.id) {
                result = existing.clone();
                return false;
            }
            snapshot.messages.insert(0, stored);
            if max > 0 {
                snapshot.messages.truncate(max);
            }
            snapshot.version += 1;
            true
        });

        if appended {
            info!(id = %result.id, "Message appended");
        } else {
            debug!(id = %result.id, "Duplicate append ignored");
        }
        Ok(result)
    }

    /// Wait until the collection is no longer at `(epoch, after)` or `timeout`
    /// elapses, then return the current snapshot. A missing `epoch` only
    /// compares versions.
    pub async fn wait_for_change(
        &self,
        epoch: Option<&str>,
        after: u64,
        timeout: Duration,
    ) -> Result<Snapshot, ServerError> {
        let mut rx = self.tx.subscribe();
        let moved = |s: &Snapshot| s.version != after || epoch.is_some_and(|e| e != s.epoch);
        let changed =
            tokio::time::timeout(timeout, async { rx.wait_for(moved).await.is_ok() }).await;

        match changed {
            Ok(false) => Err(ServerError::Internal("message store closed".into())),
            Ok(true) | Err(_) => Ok(self.snapshot()),
        }
    }
}
