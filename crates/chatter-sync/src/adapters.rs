//! Capability traits for the engine's collaborators.
//!
//! The engine is generic over these so tests can substitute fakes and the
//! binaries can plug in the HTTP channel, probe monitor and SQLite store.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use chatter_shared::{
    CacheError, ChannelError, Message, MessageList, OutgoingRecord, Reachability, RemoteRecord,
};

/// Identifies one subscription for the lifetime of an engine. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

pub(crate) struct SnapshotEvent {
    pub subscription: SubscriptionId,
    pub records: Vec<RemoteRecord>,
}

/// Delivery endpoint handed to [`RemoteChannel::subscribe`].
///
/// Every delivery is tagged with the subscription it belongs to, so the
/// engine can drop anything a closed subscription still manages to send.
#[derive(Clone)]
pub struct SnapshotSink {
    id: SubscriptionId,
    tx: mpsc::UnboundedSender<SnapshotEvent>,
}

impl SnapshotSink {
    pub(crate) fn new(id: SubscriptionId, tx: mpsc::UnboundedSender<SnapshotEvent>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Deliver a full snapshot (newest first). Returns `false` once the
    /// engine has shut down, which tells the channel to stop.
    pub fn deliver(&self, records: Vec<RemoteRecord>) -> bool {
        self.tx
            .send(SnapshotEvent {
                subscription: self.id,
                records,
            })
            .is_ok()
    }
}

/// Owned handle to a live subscription. Closing is idempotent and also
/// happens on drop.
pub struct SubscriptionHandle {
    id: SubscriptionId,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    pub fn new(id: SubscriptionId, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            release: Some(Box::new(release)),
        }
    }

    /// Handle whose release aborts the task feeding the subscription.
    pub fn from_task(id: SubscriptionId, task: JoinHandle<()>) -> Self {
        Self::new(id, move || task.abort())
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.release.is_some()
    }

    pub fn close(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

/// The ordered remote message collection.
pub trait RemoteChannel: Send + Sync + 'static {
    /// Start delivering full snapshots into `sink`, current state first.
    fn subscribe(&self, sink: SnapshotSink) -> Result<SubscriptionHandle, ChannelError>;

    /// Append one record. Failures are returned as-is; no retries.
    fn append(
        &self,
        record: OutgoingRecord,
    ) -> impl Future<Output = Result<(), ChannelError>> + Send;

    /// Called on every online/offline transition.
    fn set_network_enabled(&self, _enabled: bool) {}
}

/// Single-key local persistence for the last observed message list.
pub trait DurableCache: Send + Sync + 'static {
    /// Overwrite the cached list.
    fn save(&self, messages: MessageList) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Read the cached list. Unset or undecodable data is an empty list, not
    /// an error.
    fn load(&self) -> impl Future<Output = Result<Vec<Message>, CacheError>> + Send;
}

/// Source of reachability signals.
pub trait ConnectivityMonitor: Send + 'static {
    /// Begin monitoring. One signal is emitted at startup and one per change.
    fn start(self) -> mpsc::Receiver<Reachability>;
}

impl ConnectivityMonitor for mpsc::Receiver<Reachability> {
    fn start(self) -> mpsc::Receiver<Reachability> {
        self
    }
}
